use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::Credential;

/// Cookie file name in cache directory
pub const COOKIE_FILE: &str = "cookies.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn cookie_name(&self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        }
    }
}

/// Cookie `SameSite` policy. Tokens are only ever written as `Strict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
        }
    }
}

/// A persisted token with its cookie attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieRecord {
    fn new(kind: TokenKind, value: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            name: kind.cookie_name().to_string(),
            value,
            expires_at,
            secure: true,
            same_site: SameSite::Strict,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl fmt::Display for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Expires={}",
            self.name,
            self.value,
            self.expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
        )?;
        if self.secure {
            f.write_str("; Secure")?;
        }
        write!(f, "; SameSite={}", self.same_site)
    }
}

/// Process-wide token storage.
///
/// Records live in memory and, when a path is configured, are mirrored to a
/// JSON file so the session survives restarts. A record past its expiry is
/// treated as absent, the same way a browser drops an expired cookie.
#[derive(Debug)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    cookies: RwLock<HashMap<TokenKind, CookieRecord>>,
}

impl CredentialStore {
    /// Store that keeps tokens for the lifetime of the process only
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cookies: RwLock::new(HashMap::new()),
        }
    }

    /// Open a file-backed store, loading any records already on disk
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let path = cache_dir.join(COOKIE_FILE);
        let cookies = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read cookie file")?;
            let records: Vec<CookieRecord> = serde_json::from_str(&contents)
                .context("Failed to parse cookie file")?;
            records
                .into_iter()
                .filter(|r| !r.is_expired())
                .filter_map(|r| Self::kind_for(&r.name).map(|kind| (kind, r)))
                .collect()
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), loaded = cookies.len(), "Credential store opened");

        Ok(Self {
            path: Some(path),
            cookies: RwLock::new(cookies),
        })
    }

    /// Open a file-backed store, discarding a cookie file that cannot be
    /// loaded so later logins are persisted again
    pub fn open_or_reset(cache_dir: &Path) -> Result<Self> {
        match Self::open(cache_dir) {
            Ok(store) => Ok(store),
            Err(e) => {
                let path = cache_dir.join(COOKIE_FILE);
                warn!(path = %path.display(), error = %e, "Discarding unreadable cookie file");
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove cookie file {}", path.display()))?;
                Ok(Self {
                    path: Some(path),
                    cookies: RwLock::new(HashMap::new()),
                })
            }
        }
    }

    fn kind_for(name: &str) -> Option<TokenKind> {
        [TokenKind::Access, TokenKind::Refresh]
            .into_iter()
            .find(|k| k.cookie_name() == name)
    }

    /// Get a token if one is stored and its cookie has not expired
    pub async fn get(&self, kind: TokenKind) -> Option<String> {
        self.cookie(kind).await.map(|c| c.value)
    }

    /// Get the full cookie record for a token
    pub async fn cookie(&self, kind: TokenKind) -> Option<CookieRecord> {
        let cookies = self.cookies.read().await;
        cookies.get(&kind).filter(|c| !c.is_expired()).cloned()
    }

    /// Store a token. The in-memory copy is updated even if persisting fails.
    pub async fn set(&self, kind: TokenKind, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut cookies = self.cookies.write().await;
        cookies.insert(kind, CookieRecord::new(kind, token.to_string(), expires_at));
        self.persist(&cookies)
    }

    /// Store both tokens of a credential
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let mut cookies = self.cookies.write().await;
        cookies.insert(
            TokenKind::Access,
            CookieRecord::new(
                TokenKind::Access,
                credential.access_token.clone(),
                credential.access_expires_at,
            ),
        );
        cookies.insert(
            TokenKind::Refresh,
            CookieRecord::new(
                TokenKind::Refresh,
                credential.refresh_token.clone(),
                credential.refresh_expires_at,
            ),
        );
        self.persist(&cookies)
    }

    /// Remove both tokens
    pub async fn clear(&self) -> Result<()> {
        let mut cookies = self.cookies.write().await;
        cookies.clear();
        if let Some(ref path) = self.path {
            if path.exists() {
                std::fs::remove_file(path).context("Failed to remove cookie file")?;
            }
        }
        Ok(())
    }

    fn persist(&self, cookies: &HashMap<TokenKind, CookieRecord>) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut records: Vec<&CookieRecord> = cookies.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        let contents = serde_json::to_string_pretty(&records)?;
        std::fs::write(path, contents).context("Failed to write cookie file")?;
        Ok(())
    }
}
