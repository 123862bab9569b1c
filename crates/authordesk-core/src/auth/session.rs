use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::RefreshFailure;

/// Route the operator is sent to when the session cannot be recovered.
pub const LOGIN_ROUTE: &str = "/login";

/// Token payload returned by both `/auth/token-generate` and `/auth/token-refresh`.
/// Expiries are epoch seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expired_at: i64,
    pub refresh_expired_at: i64,
}

/// Access and refresh tokens with their expiries, as held by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TryFrom<TokenPair> for Credential {
    type Error = String;

    fn try_from(pair: TokenPair) -> Result<Self, Self::Error> {
        let access_expires_at = epoch_to_utc(pair.access_expired_at)
            .ok_or_else(|| format!("access_expired_at out of range: {}", pair.access_expired_at))?;
        let refresh_expires_at = epoch_to_utc(pair.refresh_expired_at).ok_or_else(|| {
            format!("refresh_expired_at out of range: {}", pair.refresh_expired_at)
        })?;

        Ok(Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }
}

fn epoch_to_utc(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

/// Session lifecycle notifications broadcast by the API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    LoggedOut,
    /// The refresh cycle failed and the store was cleared.
    /// Subscribers should send the operator to [`LOGIN_ROUTE`].
    Terminated { reason: RefreshFailure },
}

impl SessionEvent {
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            SessionEvent::Terminated { .. } => Some(LOGIN_ROUTE),
            _ => None,
        }
    }
}
