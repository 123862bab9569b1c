//! REST API client module for the authors admin backend.
//!
//! This module provides the `ApiClient` for logging in, reading the operator
//! profile and managing authors. Every data call goes through the client's
//! request pipeline, which attaches the bearer token and recovers from an
//! expired access token through the single-flight `RefreshCoordinator`.

pub mod client;
pub mod error;
pub mod refresh;
pub mod request;

pub use client::{ApiClient, ApiResult};
pub use error::{ApiError, FieldError, RefreshFailure};
pub use refresh::{RefreshCoordinator, Role};
pub use request::{ApiRequest, FormField, RequestBody, TOKEN_GENERATE_PATH, TOKEN_REFRESH_PATH};
