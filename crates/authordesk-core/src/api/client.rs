//! API client for the authors admin REST API.
//!
//! `ApiClient::send` is the request pipeline every data call goes through.
//! Outbound, it attaches the current access token as a bearer credential.
//! Inbound, a first 401 on anything but the refresh endpoint is handed to the
//! `RefreshCoordinator`, and the request is dispatched once more with the
//! refreshed token.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::refresh::{RefreshCoordinator, Role};
use super::request::{
    multipart_form, ApiRequest, FormField, RequestBody, TOKEN_GENERATE_PATH, TOKEN_REFRESH_PATH,
};
use super::{ApiError, RefreshFailure};
use crate::auth::{Credential, CredentialStore, SessionEvent, TokenKind, TokenPair};
use crate::models::{Author, AuthorForm, AvatarChange, AvatarUpload, Profile};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Capacity of the session event channel. Slow subscribers only miss
/// intermediate events; the latest state is always in the store.
const EVENT_CHANNEL_CAPACITY: usize = 16;

const AUTHORS_PATH: &str = "/manage/authors";
const AUTHOR_DETAIL_PATH: &str = "/manage/authors/detail";
const AUTHOR_ADD_PATH: &str = "/manage/authors/add";
const AUTHOR_EDIT_PATH: &str = "/manage/authors/edit";
const AUTHOR_REMOVE_PATH: &str = "/manage/authors/remove";
const PROFILE_PATH: &str = "/profile";

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// API client for the admin backend.
/// Clone is cheap - clones share the connection pool, credential store,
/// refresh coordinator and default token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    events: broadcast::Sender<SessionEvent>,
    /// Token from the last login or refresh, used when the store has none
    default_token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, store: Arc<CredentialStore>) -> Result<Self> {
        Self::with_timeout(base_url, store, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: &str,
        store: Arc<CredentialStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::clone(&store), events.clone()));

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            store,
            coordinator,
            events,
            default_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Subscribe to session events (login, refresh, logout, termination)
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Authentication =====

    /// Exchange email and password for a token pair and store it
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Credential> {
        let fields = vec![
            FormField::text("email", email),
            FormField::text("password", password),
        ];
        let response = self
            .client
            .post(self.url(TOKEN_GENERATE_PATH))
            .header(header::ACCEPT, "application/json")
            .multipart(multipart_form(&fields)?)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        let credential = Self::parse_token_pair(&text).map_err(ApiError::InvalidResponse)?;

        if let Err(e) = self.store.save(&credential).await {
            warn!(error = %e, "Failed to persist login tokens");
        }
        *self.default_token.write().await = Some(credential.access_token.clone());
        let _ = self.events.send(SessionEvent::LoggedIn);
        info!("Login successful");

        Ok(credential)
    }

    /// Forget both tokens
    pub async fn logout(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear credential store");
        }
        *self.default_token.write().await = None;
        let _ = self.events.send(SessionEvent::LoggedOut);
        info!("Logged out");
    }

    /// An access token is present (its validity is only known to the server)
    pub async fn is_authenticated(&self) -> bool {
        self.store.get(TokenKind::Access).await.is_some()
    }

    fn parse_token_pair(text: &str) -> std::result::Result<Credential, String> {
        let pair: TokenPair =
            serde_json::from_str(text).map_err(|e| format!("Failed to parse token response: {}", e))?;
        Credential::try_from(pair)
    }

    /// Call the refresh endpoint directly, outside the pipeline
    async fn request_refresh(&self, refresh_token: String) -> std::result::Result<Credential, RefreshFailure> {
        let fields = vec![FormField::text("refresh_token", refresh_token)];
        let form = multipart_form(&fields).map_err(|e| RefreshFailure::Network(e.to_string()))?;

        let response = self
            .client
            .post(self.url(TOKEN_REFRESH_PATH))
            .header(header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| RefreshFailure::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RefreshFailure::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(RefreshFailure::Rejected {
                status: status.as_u16(),
                body: ApiError::truncate_body(&body),
            });
        }

        Self::parse_token_pair(&body).map_err(RefreshFailure::InvalidResponse)
    }

    // ===== Request Pipeline =====

    /// Send a request with the current bearer token, refreshing the session
    /// once if the server rejects it. Non-2xx responses become errors.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<Response> {
        let response = self.dispatch(&request, None).await?;

        if request.should_refresh_on(response.status()) {
            debug!(path = %request.path, "Access token rejected, refreshing session");
            return self.replay_after_refresh(request).await;
        }

        Self::check_response(response).await
    }

    async fn replay_after_refresh(&self, mut request: ApiRequest) -> ApiResult<Response> {
        request.mark_retry();

        let (role, outcome) = self
            .coordinator
            .refresh_with_role(|refresh_token| self.request_refresh(refresh_token))
            .await;

        let token = match outcome {
            Ok(token) => token,
            Err(failure) => {
                *self.default_token.write().await = None;
                // With nothing to refresh, the triggering request keeps its own 401
                if role == Role::Leader && failure == RefreshFailure::MissingRefreshToken {
                    return Err(ApiError::Unauthorized);
                }
                return Err(failure.into());
            }
        };
        *self.default_token.write().await = Some(token.clone());

        debug!(path = %request.path, "Replaying request with refreshed token");
        let response = self.dispatch(&request, Some(&token)).await?;
        Self::check_response(response).await
    }

    /// Token to attach: the store's access token, else the last known default
    async fn bearer_token(&self) -> Option<String> {
        match self.store.get(TokenKind::Access).await {
            Some(token) => Some(token),
            None => self.default_token.read().await.clone(),
        }
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> ApiResult<Response> {
        let token = match token {
            Some(token) => Some(token.to_string()),
            None => self.bearer_token().await,
        };

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .header(header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Multipart(fields) => builder.multipart(multipart_form(fields)?),
        };

        debug!(
            method = %request.method,
            path = %request.path,
            retry = request.is_retry(),
            authenticated = token.is_some(),
            "Sending request"
        );
        Ok(builder.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> ApiResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    // ===== Data Fetching Methods =====

    /// Fetch the logged-in operator's profile
    pub async fn fetch_profile(&self) -> ApiResult<Profile> {
        self.send_json(ApiRequest::get(PROFILE_PATH)).await
    }

    /// Fetch all authors
    pub async fn fetch_authors(&self) -> ApiResult<Vec<Author>> {
        let authors: Vec<Author> = self.send_json(ApiRequest::get(AUTHORS_PATH)).await?;
        debug!(count = authors.len(), "Fetched authors");
        Ok(authors)
    }

    /// Fetch a single author
    pub async fn fetch_author(&self, id: u64) -> ApiResult<Author> {
        self.send_json(ApiRequest::get(AUTHOR_DETAIL_PATH).query("id", id))
            .await
    }

    /// Create an author
    pub async fn add_author(
        &self,
        form: &AuthorForm,
        avatar: Option<AvatarUpload>,
    ) -> ApiResult<Author> {
        let request = ApiRequest::post(AUTHOR_ADD_PATH).multipart(form.add_fields(avatar));
        self.send_json(request).await
    }

    /// Update an author, optionally replacing or removing the avatar
    pub async fn update_author(
        &self,
        id: u64,
        form: &AuthorForm,
        avatar: AvatarChange,
    ) -> ApiResult<Author> {
        let request = ApiRequest::post(AUTHOR_EDIT_PATH)
            .query("id", id)
            .multipart(form.edit_fields(id, avatar));
        self.send_json(request).await
    }

    /// Delete one author
    pub async fn delete_author(&self, id: u64) -> ApiResult<()> {
        self.send(ApiRequest::delete(AUTHOR_REMOVE_PATH).query("id", id))
            .await?;
        Ok(())
    }

    /// Delete several authors in one call
    pub async fn delete_authors(&self, ids: &[u64]) -> ApiResult<()> {
        if ids.is_empty() {
            debug!("No authors selected for deletion");
            return Ok(());
        }
        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.send(ApiRequest::post(AUTHOR_REMOVE_PATH).query("id", joined))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_pair() {
        let json = r#"{"access_token":"AT1","refresh_token":"RT1","access_expired_at":1900000000,"refresh_expired_at":1900600000}"#;
        let credential = ApiClient::parse_token_pair(json).expect("credential");
        assert_eq!(credential.access_token, "AT1");
        assert_eq!(credential.refresh_expires_at.timestamp(), 1_900_600_000);

        let err = ApiClient::parse_token_pair(r#"{"access_token":"AT1"}"#).unwrap_err();
        assert!(err.starts_with("Failed to parse token response"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:9000/", Arc::new(CredentialStore::in_memory()))
            .expect("client");
        assert_eq!(client.base_url(), "http://localhost:9000");
        assert_eq!(client.url("/profile"), "http://localhost:9000/profile");
    }
}
