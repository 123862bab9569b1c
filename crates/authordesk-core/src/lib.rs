//! Core library for authordesk.
//!
//! Holds the authenticated-session transport (credential store, request
//! pipeline, refresh coordinator), the typed endpoints for the operator
//! profile and the authors resource, and the configuration shared with the
//! terminal front-end.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResult, RefreshFailure};
pub use auth::{CredentialStore, SessionEvent};
pub use config::Config;
