//! Command line definitions.

use std::path::PathBuf;

use authordesk_core::models::AuthorForm;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "authordesk", version, about = "Manage authors through the admin API")]
pub struct Cli {
    /// API base URL (overrides AUTHORDESK_BASE_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session tokens
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show whether a session is stored and when its tokens expire
    Status,
    /// Show the logged-in operator's profile
    Profile,
    /// Manage authors
    #[command(subcommand)]
    Authors(AuthorsCommand),
}

#[derive(Subcommand, Debug)]
pub enum AuthorsCommand {
    /// List all authors
    List {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one author
    Show {
        id: u64,
        #[arg(long)]
        json: bool,
    },
    /// Create an author
    Add {
        #[command(flatten)]
        fields: AuthorFields,

        /// Avatar image to upload
        #[arg(long, value_name = "PATH")]
        avatar: Option<PathBuf>,
    },
    /// Edit an author; fields not given keep their current value
    Edit {
        id: u64,

        #[command(flatten)]
        fields: AuthorFields,

        /// Replace the avatar with this image
        #[arg(long, value_name = "PATH", conflicts_with = "remove_avatar")]
        avatar: Option<PathBuf>,

        /// Remove the current avatar
        #[arg(long)]
        remove_avatar: bool,
    },
    /// Delete one or more authors
    Delete {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
}

#[derive(Args, Debug, Default)]
pub struct AuthorFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub second_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub short_description: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

impl AuthorFields {
    /// Overwrite the form fields that were given on the command line
    pub fn apply(self, form: &mut AuthorForm) {
        let overrides = [
            (self.name, &mut form.name),
            (self.last_name, &mut form.last_name),
            (self.second_name, &mut form.second_name),
            (self.email, &mut form.email),
            (self.short_description, &mut form.short_description),
            (self.description, &mut form.description),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_only_overrides_given_fields() {
        let mut form = AuthorForm {
            name: "Fyodor".to_string(),
            last_name: "Dostoevsky".to_string(),
            email: "old@example.com".to_string(),
            ..Default::default()
        };
        let fields = AuthorFields {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };

        fields.apply(&mut form);
        assert_eq!(form.name, "Fyodor");
        assert_eq!(form.email, "new@example.com");
    }

    #[test]
    fn test_parse_edit_command() {
        let cli = Cli::try_parse_from([
            "authordesk",
            "authors",
            "edit",
            "7",
            "--last-name",
            "Gogol",
            "--remove-avatar",
        ])
        .expect("parse");

        match cli.command {
            Command::Authors(AuthorsCommand::Edit {
                id,
                fields,
                avatar,
                remove_avatar,
            }) => {
                assert_eq!(id, 7);
                assert_eq!(fields.last_name.as_deref(), Some("Gogol"));
                assert!(avatar.is_none());
                assert!(remove_avatar);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_avatar_conflicts_with_remove() {
        let result = Cli::try_parse_from([
            "authordesk",
            "authors",
            "edit",
            "7",
            "--avatar",
            "a.png",
            "--remove-avatar",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_requires_ids() {
        assert!(Cli::try_parse_from(["authordesk", "authors", "delete"]).is_err());
        let cli = Cli::try_parse_from(["authordesk", "authors", "delete", "1", "2"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Authors(AuthorsCommand::Delete { ref ids }) if ids == &[1, 2]
        ));
    }
}
