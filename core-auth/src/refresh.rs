//! Single-flight access token refresh.
//!
//! Any number of requests may fail with 401 at the same time. The first one
//! starts exactly one `POST /auth/refresh`; the others park on the
//! coordinator and are released together, in arrival order, when that call
//! settles.
//!
//! ```text
//!            first 401                         settle
//!   Idle ─────────────────▶ Refreshing ───────────────────▶ Idle
//!                            │    ▲
//!                  more 401s │    │ enqueue waiter
//!                            └────┘
//! ```
//!
//! The refresh runs on its own task. A caller that stops waiting (its future
//! is dropped) neither cancels the refresh nor leaves other waiters stranded.

use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::{RefreshResponse, RefreshTokenBody, TokenPair};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::RefreshCredentialMode;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, instrument, warn};

/// Outcome delivered to each waiter: the new access token, or the shared
/// failure reason.
type Settlement = std::result::Result<String, String>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<Settlement>>,
}

struct Inner {
    http_client: Arc<dyn HttpClient>,
    token_store: Arc<TokenStore>,
    event_bus: EventBus,
    refresh_url: String,
    mode: RefreshCredentialMode,
    timeout: Duration,
    state: Mutex<RefreshState>,
}

/// Coordinates token refreshes so at most one is outstanding.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// # Arguments
    ///
    /// * `refresh_url` - Absolute URL of `POST /auth/refresh`
    /// * `mode` - Whether the refresh token travels in the body or a cookie
    /// * `timeout` - Timeout applied to the refresh call
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        token_store: Arc<TokenStore>,
        event_bus: EventBus,
        refresh_url: impl Into<String>,
        mode: RefreshCredentialMode,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http_client,
                token_store,
                event_bus,
                refresh_url: refresh_url.into(),
                mode,
                timeout,
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// Obtains a fresh access token, joining the refresh already in flight
    /// if there is one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` carrying the failure reason shared
    /// by every caller of the same refresh. By then the token store has been
    /// cleared and `AuthEvent::SessionExpired` has been emitted once.
    pub async fn refresh(&self) -> Result<String> {
        let (tx, rx) = oneshot::channel();

        let start = {
            let mut state = self.inner.state.lock().await;
            state.waiters.push_back(tx);
            if state.in_flight {
                debug!(waiters = state.waiters.len(), "Joining in-flight refresh");
                false
            } else {
                state.in_flight = true;
                true
            }
        };

        if start {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.run().await });
        }

        match rx.await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(reason)) => Err(AuthError::SessionExpired(reason)),
            Err(_) => Err(AuthError::Internal(
                "refresh task ended without settling".to_string(),
            )),
        }
    }

    /// True while a refresh call is outstanding.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.state.lock().await.in_flight
    }

    /// Number of callers parked on the current refresh.
    pub async fn pending_waiters(&self) -> usize {
        self.inner.state.lock().await.waiters.len()
    }
}

impl Inner {
    #[instrument(skip(self), fields(mode = ?self.mode))]
    async fn run(&self) {
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshing));

        let outcome = self.perform().await;

        if let Err(reason) = &outcome {
            warn!(reason = %reason, "Token refresh failed, ending session");
            if let Err(e) = self.token_store.clear_tokens().await {
                warn!(error = %e, "Failed to clear session after refresh failure");
            }
        }

        let settlement: Settlement = outcome
            .as_ref()
            .map(|tokens| tokens.access_token.clone())
            .map_err(Clone::clone);

        let waiters = {
            let mut state = self.state.lock().await;
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        let released = waiters.len();
        for waiter in waiters {
            // A waiter whose caller went away is simply skipped.
            let _ = waiter.send(settlement.clone());
        }

        match outcome {
            Ok(tokens) => {
                info!(released, "Token refreshed");
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                        refresh_token_rotated: tokens.refresh_token_rotated,
                    }));
            }
            Err(message) => {
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Auth(AuthEvent::SessionExpired { message }));
            }
        }
    }

    async fn perform(&self) -> std::result::Result<RefreshedTokens, String> {
        let stored = self
            .token_store
            .get_tokens()
            .await
            .map_err(|e| e.to_string())?;
        let previous_refresh = stored.and_then(|tokens| tokens.refresh_token);

        let mut request =
            HttpRequest::new(HttpMethod::Post, &self.refresh_url).timeout(self.timeout);

        if self.mode == RefreshCredentialMode::BodyToken {
            let Some(refresh_token) = previous_refresh.clone() else {
                return Err("No refresh token available".to_string());
            };
            request = request
                .json(&RefreshTokenBody {
                    refresh_token: Some(refresh_token),
                })
                .map_err(|e| e.to_string())?;
        }

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| format!("Refresh request failed: {}", e))?;

        if !response.is_success() {
            return Err(format!("Refresh rejected with status {}", response.status));
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| format!("Malformed refresh response: {}", e))?;
        if body.access_token.is_empty() {
            return Err("Refresh response carried no access token".to_string());
        }

        let refresh_token_rotated = body.refresh_token.is_some();
        let tokens = TokenPair {
            access_token: body.access_token,
            refresh_token: body.refresh_token.or(previous_refresh),
        };

        self.token_store
            .set_tokens(&tokens)
            .await
            .map_err(|e| e.to_string())?;

        Ok(RefreshedTokens {
            access_token: tokens.access_token,
            refresh_token_rotated,
        })
    }
}

struct RefreshedTokens {
    access_token: String,
    refresh_token_rotated: bool,
}
