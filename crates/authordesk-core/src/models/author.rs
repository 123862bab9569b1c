use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::FormField;
use crate::utils::join_name;

/// Avatar as returned by the API: either a stored file or a bare URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Avatar {
    Stored {
        #[serde(default)]
        id: u64,
        #[serde(default)]
        name: String,
        url: String,
        #[serde(rename = "createdAt", default)]
        created_at: Option<String>,
    },
    Url(String),
}

impl Avatar {
    pub fn url(&self) -> &str {
        match self {
            Avatar::Stored { url, .. } => url,
            Avatar::Url(url) => url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub second_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Author {
    pub fn full_name(&self) -> String {
        join_name(&self.name, self.second_name.as_deref(), &self.last_name)
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar.as_ref().map(Avatar::url).filter(|u| !u.is_empty())
    }
}

/// An avatar image to upload with an add or edit request
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarUpload {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    /// Read an image from disk, guessing its MIME type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read avatar file {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_string());
        let mime = Self::guess_mime(&file_name).map(str::to_string);
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    fn guess_mime(file_name: &str) -> Option<&'static str> {
        let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            "svg" => Some("image/svg+xml"),
            _ => None,
        }
    }

    fn into_field(self) -> FormField {
        FormField::File {
            name: "avatar".to_string(),
            file_name: self.file_name,
            mime: self.mime,
            bytes: self.bytes,
        }
    }
}

/// What an edit does to the author's avatar
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AvatarChange {
    #[default]
    Keep,
    Replace(AvatarUpload),
    Remove,
}

/// Editable author fields, shared by the add and edit endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorForm {
    pub name: String,
    pub last_name: String,
    pub second_name: String,
    pub email: String,
    pub short_description: String,
    pub description: String,
}

impl AuthorForm {
    /// Prefill an edit form from an existing author
    pub fn from_author(author: &Author) -> Self {
        Self {
            name: author.name.clone(),
            last_name: author.last_name.clone(),
            second_name: author.second_name.clone().unwrap_or_default(),
            email: author.email.clone().unwrap_or_default(),
            short_description: author.short_description.clone().unwrap_or_default(),
            description: author.description.clone().unwrap_or_default(),
        }
    }

    fn text_fields(&self) -> Vec<FormField> {
        vec![
            FormField::text("name", &self.name),
            FormField::text("lastName", &self.last_name),
            FormField::text("secondName", &self.second_name),
            FormField::text("email", &self.email),
            FormField::text("shortDescription", &self.short_description),
            FormField::text("description", &self.description),
        ]
    }

    /// Multipart fields for `/manage/authors/add`
    pub fn add_fields(&self, avatar: Option<AvatarUpload>) -> Vec<FormField> {
        let mut fields = self.text_fields();
        if let Some(avatar) = avatar {
            fields.push(avatar.into_field());
        }
        fields
    }

    /// Multipart fields for `/manage/authors/edit`
    pub fn edit_fields(&self, id: u64, avatar: AvatarChange) -> Vec<FormField> {
        let mut fields = vec![FormField::text("id", id.to_string())];
        fields.extend(self.text_fields());
        match avatar {
            AvatarChange::Keep => {}
            AvatarChange::Remove => fields.push(FormField::text("removeAvatar", "true")),
            AvatarChange::Replace(upload) => fields.push(upload.into_field()),
        }
        fields
    }
}
