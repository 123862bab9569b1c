//! Authentication module for managing the operator's session tokens.
//!
//! This module provides:
//! - `CredentialStore`: cookie-style storage for access and refresh tokens
//! - `Credential`, `TokenPair`: token data as stored and as sent by the API
//! - `SessionEvent`: login, refresh, logout and termination notifications
//!
//! Tokens are persisted to `cookies.json` in the cache directory.

pub mod credentials;
pub mod session;

pub use credentials::{CookieRecord, CredentialStore, SameSite, TokenKind};
pub use session::{Credential, SessionEvent, TokenPair, LOGIN_ROUTE};
