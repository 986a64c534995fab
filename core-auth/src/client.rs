//! Authenticated API client.
//!
//! Wraps the host [`HttpClient`] with bearer-token injection and the
//! refresh-on-401 policy:
//!
//! 1. Send with the stored access token (or none).
//! 2. A non-401 response is returned as-is (2xx) or as `AuthError::Api`.
//! 3. A 401 on an exempt path, or on a tokenless request in body-token mode,
//!    fails with `AuthenticationFailed`.
//! 4. Otherwise obtain a new token, either because another request already
//!    rotated it or through the [`RefreshCoordinator`], and replay once.
//! 5. A second 401 fails with `AuthenticationFailed`.

use crate::error::{AuthError, Result};
use crate::refresh::RefreshCoordinator;
use crate::token_store::TokenStore;
use bridge_traits::http::{append_query, HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_runtime::config::{AuthSettings, CoreConfig, RefreshCredentialMode};
use core_runtime::events::EventBus;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A request relative to the API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|source| AuthError::SerializationFailed {
            context: format!("{} {}", self.method, self.path),
            source,
        })?;
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// HTTP client that authenticates requests and recovers from expired
/// access tokens.
pub struct AuthenticatedClient {
    http_client: Arc<dyn HttpClient>,
    token_store: Arc<TokenStore>,
    coordinator: RefreshCoordinator,
    base_url: String,
    settings: AuthSettings,
    timeout: Duration,
}

impl AuthenticatedClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        token_store: Arc<TokenStore>,
        event_bus: EventBus,
        base_url: impl Into<String>,
        settings: AuthSettings,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&http_client),
            Arc::clone(&token_store),
            event_bus,
            format!("{}/auth/refresh", base_url),
            settings.refresh_mode,
            timeout,
        );

        Self {
            http_client,
            token_store,
            coordinator,
            base_url,
            settings,
            timeout,
        }
    }

    pub fn from_config(config: &CoreConfig, token_store: Arc<TokenStore>, event_bus: EventBus) -> Self {
        Self::new(
            Arc::clone(&config.http_client),
            token_store,
            event_bus,
            config.api_base_url.clone(),
            config.auth.clone(),
            config.request_timeout,
        )
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.token_store
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends `request` and returns the successful response.
    ///
    /// # Errors
    ///
    /// - `AuthError::AuthenticationFailed` for a 401 that cannot or may not be
    ///   recovered, including a 401 on the replayed request
    /// - `AuthError::SessionExpired` when the session ended (refresh failed or
    ///   the store was cleared while the request was in flight)
    /// - `AuthError::Api` for any other error status, body verbatim
    /// - `AuthError::Network` when no response was received
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> Result<HttpResponse> {
        let sent_token = self.current_access_token().await?;
        let response = self.send(&request, sent_token.as_deref()).await?;
        if !response.is_unauthorized() {
            return into_result(response);
        }

        if self.settings.is_exempt(&request.path) {
            debug!("401 on exempt path");
            return Err(AuthError::AuthenticationFailed(body_message(&response)));
        }
        if sent_token.is_none() && self.settings.refresh_mode == RefreshCredentialMode::BodyToken {
            debug!("401 without a session, nothing to refresh");
            return Err(AuthError::AuthenticationFailed(body_message(&response)));
        }

        let retry_token = match (sent_token.as_deref(), self.current_access_token().await?) {
            (sent, Some(current)) if sent != Some(current.as_str()) => {
                debug!("Access token rotated while request was in flight");
                current
            }
            (Some(_), None) => {
                return Err(AuthError::SessionExpired("Session has ended".to_string()));
            }
            _ => self.coordinator.refresh().await?,
        };

        let retried = self.send(&request, Some(&retry_token)).await?;
        if retried.is_unauthorized() {
            warn!("Request rejected again after token refresh");
            return Err(AuthError::AuthenticationFailed(body_message(&retried)));
        }
        into_result(retried)
    }

    /// Sends `request` and decodes the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let context = format!("{} {}", request.method, request.path);
        let response = self.execute(request).await?;
        response
            .json()
            .map_err(|e| AuthError::InvalidResponse(format!("{}: {}", context, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let mut request = ApiRequest::get(path);
        request.query.extend_from_slice(query);
        self.send_json(request).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(ApiRequest::put(path).json(body)?).await
    }

    /// POST without a body, e.g. `/subscriptions/:id/cancel`.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(ApiRequest::post(path)).await
    }

    async fn current_access_token(&self) -> Result<Option<String>> {
        Ok(self
            .token_store
            .get_tokens()
            .await?
            .map(|tokens| tokens.access_token))
    }

    async fn send(&self, request: &ApiRequest, token: Option<&str>) -> Result<HttpResponse> {
        let url = append_query(&format!("{}{}", self.base_url, request.path), &request.query)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let mut http_request = HttpRequest::new(request.method, url).timeout(self.timeout);
        if let Some(body) = &request.body {
            http_request = http_request
                .header("Content-Type", "application/json")
                .body(body.clone());
        }
        if let Some(token) = token {
            http_request = http_request.bearer_token(token);
        }

        self.http_client
            .execute(http_request)
            .await
            .map_err(AuthError::from_transport)
    }
}

fn body_message(response: &HttpResponse) -> String {
    match response.text() {
        Ok(text) if !text.is_empty() => text,
        _ => format!("status {}", response.status),
    }
}

fn into_result(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(AuthError::Api {
            status: response.status,
            message: body_message(&response),
        })
    }
}
