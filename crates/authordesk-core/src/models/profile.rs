use serde::{Deserialize, Serialize};

use crate::utils::join_name;

/// The operator account behind the current session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: u64,
    #[serde(default)]
    pub phone: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub second_name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Profile {
    pub fn full_name(&self) -> String {
        join_name(&self.name, self.second_name.as_deref(), &self.last_name)
    }

    pub fn status_display(&self) -> &'static str {
        if self.is_active {
            "Active"
        } else {
            "Inactive"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile() {
        let json = r#"{"id":3,"phone":"+79990001122","email":"a@b.com","name":"Ivan","lastName":"Petrov","secondName":"","isActive":true,"updatedAt":"2024-05-01T10:00:00+03:00","createdAt":"2024-01-01T10:00:00+03:00"}"#;
        let profile: Profile = serde_json::from_str(json).expect("profile");

        assert_eq!(profile.email, "a@b.com");
        assert_eq!(profile.full_name(), "Ivan Petrov");
        assert_eq!(profile.status_display(), "Active");
    }
}
