//! Command execution for the authordesk front-end.
//!
//! `App` owns the configuration and the shared `ApiClient`, runs one command,
//! and reports session events (such as a terminated session) afterwards.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use authordesk_core::api::ApiError;
use authordesk_core::auth::{SessionEvent, TokenKind};
use authordesk_core::models::{AuthorForm, AvatarChange, AvatarUpload};
use authordesk_core::{ApiClient, Config, CredentialStore};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::cli::{AuthorFields, AuthorsCommand, Command};
use crate::render;

/// Environment variables consulted by `login`
const EMAIL_ENV: &str = "AUTHORDESK_EMAIL";
const PASSWORD_ENV: &str = "AUTHORDESK_PASSWORD";

pub struct App {
    pub config: Config,
    pub api: ApiClient,
    events: broadcast::Receiver<SessionEvent>,
}

impl App {
    pub fn new(base_url_override: Option<String>) -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let store = match CredentialStore::open_or_reset(&cache_dir) {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    ?cache_dir,
                    error = %e,
                    "Failed to open credential store, session will not persist"
                );
                CredentialStore::in_memory()
            }
        };

        let base_url = base_url_override.unwrap_or_else(|| config.base_url());
        let api = ApiClient::with_timeout(&base_url, Arc::new(store), config.request_timeout())
            .context("Failed to build HTTP client")?;
        let events = api.subscribe();
        debug!(base_url = api.base_url(), "API client ready");

        Ok(Self {
            config,
            api,
            events,
        })
    }

    /// Run one command, then report what happened to the session
    pub async fn run(&mut self, command: Command) -> Result<()> {
        let result = match command {
            Command::Login { email } => self.login_interactive(email).await,
            Command::Logout => self.logout().await,
            Command::Status => self.status().await,
            Command::Profile => self.profile().await,
            Command::Authors(command) => self.authors(command).await,
        };

        if let Err(ref e) = result {
            if let Some(fields) = e.downcast_ref::<ApiError>().and_then(ApiError::field_errors) {
                eprint!("{}", render::field_errors(fields));
            }
        }
        self.report_session_events();
        result
    }

    fn report_session_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            debug!(?event, "Session event");
            if let Some(route) = event.redirect() {
                eprintln!(
                    "Session expired. Please log in again with `authordesk login` ({}).",
                    route
                );
            }
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    async fn login_interactive(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| std::env::var(EMAIL_ENV).ok()) {
            Some(email) => email,
            None => Self::prompt_email(self.config.last_email.as_deref())?,
        };
        if email.is_empty() {
            return Err(anyhow::anyhow!("Email required"));
        }

        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) => password,
            Err(_) => rpassword::prompt_password("Password: ")?,
        };
        if password.is_empty() {
            return Err(anyhow::anyhow!("Password required"));
        }

        match self.api.login(&email, &password).await {
            Ok(credential) => {
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                info!(expires_at = %credential.access_expires_at, "Login successful");
                println!("Login successful.");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                Err(e).context("Login failed")
            }
        }
    }

    fn prompt_email(last_email: Option<&str>) -> Result<String> {
        match last_email {
            Some(last) => print!("Email [{}]: ", last),
            None => print!("Email: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok(match (input.is_empty(), last_email) {
            (true, Some(last)) => last.to_string(),
            _ => input.to_string(),
        })
    }

    async fn logout(&mut self) -> Result<()> {
        self.api.logout().await;
        println!("Logged out.");
        Ok(())
    }

    async fn status(&mut self) -> Result<()> {
        let store = self.api.store();
        let access = store.cookie(TokenKind::Access).await;
        let refresh = store.cookie(TokenKind::Refresh).await;
        print!("{}", render::session(access.as_ref(), refresh.as_ref()));
        println!("  API            {}", self.api.base_url());
        Ok(())
    }

    async fn profile(&mut self) -> Result<()> {
        let profile = self.api.fetch_profile().await?;
        print!("{}", render::profile(&profile));
        Ok(())
    }

    // =========================================================================
    // Authors
    // =========================================================================

    async fn authors(&mut self, command: AuthorsCommand) -> Result<()> {
        match command {
            AuthorsCommand::List { json } => {
                let authors = self.api.fetch_authors().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&authors)?);
                } else {
                    print!("{}", render::author_table(&authors));
                }
            }
            AuthorsCommand::Show { id, json } => {
                let author = self.api.fetch_author(id).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&author)?);
                } else {
                    print!("{}", render::author_detail(&author));
                }
            }
            AuthorsCommand::Add { fields, avatar } => {
                let mut form = AuthorForm::default();
                fields.apply(&mut form);
                let avatar = avatar
                    .map(|path| AvatarUpload::from_path(&path))
                    .transpose()?;
                let author = self.api.add_author(&form, avatar).await?;
                println!("Created author #{} {}", author.id, author.full_name());
            }
            AuthorsCommand::Edit {
                id,
                fields,
                avatar,
                remove_avatar,
            } => self.edit_author(id, fields, avatar, remove_avatar).await?,
            AuthorsCommand::Delete { ids } => {
                if let [id] = ids.as_slice() {
                    self.api.delete_author(*id).await?;
                } else {
                    self.api.delete_authors(&ids).await?;
                }
                println!("Deleted {} author(s).", ids.len());
            }
        }
        Ok(())
    }

    async fn edit_author(
        &mut self,
        id: u64,
        fields: AuthorFields,
        avatar: Option<PathBuf>,
        remove_avatar: bool,
    ) -> Result<()> {
        let current = self
            .api
            .fetch_author(id)
            .await
            .with_context(|| format!("Failed to load author #{}", id))?;

        let mut form = AuthorForm::from_author(&current);
        fields.apply(&mut form);

        let change = match (avatar, remove_avatar) {
            (Some(path), _) => AvatarChange::Replace(AvatarUpload::from_path(&path)?),
            (None, true) => AvatarChange::Remove,
            (None, false) => AvatarChange::Keep,
        };

        let author = self.api.update_author(id, &form, change).await?;
        println!("Updated author #{} {}", author.id, author.full_name());
        Ok(())
    }
}
