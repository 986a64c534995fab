//! Session lifecycle: startup rehydration, sign-in, sign-up, sign-out and
//! forced logout.
//!
//! The manager owns the observable [`SessionSnapshot`]. Hosts read it
//! synchronously (`current_user`, `is_session_loading`) or watch it through
//! [`SessionManager::subscribe`]. Every operation that should move the user
//! elsewhere returns a [`NavigationIntent`]; nothing here navigates.

use crate::client::{ApiRequest, AuthenticatedClient};
use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::{
    Credentials, LoginResponse, NavigationIntent, RefreshTokenBody, Registration,
    SessionNotice, SessionSnapshot, TokenPair, UserProfile,
};
use crate::validation::{validate_credentials, validate_registration};
use async_trait::async_trait;
use core_runtime::config::AuthSettings;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, EventStream, RecvError, SignOutReason};
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Data that belongs to the signed-in user and must not outlive the session.
///
/// Registered caches are cleared on sign-out and on forced logout.
#[async_trait]
pub trait SessionScopedCache: Send + Sync {
    async fn clear_session_data(&self);

    fn name(&self) -> &str;
}

struct SessionInner {
    client: Arc<AuthenticatedClient>,
    token_store: Arc<TokenStore>,
    event_bus: EventBus,
    settings: AuthSettings,
    state: watch::Sender<SessionSnapshot>,
    caches: RwLock<Vec<Arc<dyn SessionScopedCache>>>,
    rehydrated: Mutex<bool>,
}

/// Owns the current-user state and the session operations.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(client: Arc<AuthenticatedClient>, event_bus: EventBus) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(SessionInner {
                token_store: Arc::clone(client.token_store()),
                settings: client.settings().clone(),
                client,
                event_bus,
                state,
                caches: RwLock::new(Vec::new()),
                rehydrated: Mutex::new(false),
            }),
        }
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().current_user.clone()
    }

    /// True until [`rehydrate`](Self::rehydrate) has finished.
    pub fn is_session_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Change notification for the session snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn client(&self) -> &Arc<AuthenticatedClient> {
        &self.inner.client
    }

    pub async fn register_cache(&self, cache: Arc<dyn SessionScopedCache>) {
        debug!(cache = cache.name(), "Registering session-scoped cache");
        self.inner.caches.write().await.push(cache);
    }

    /// Restores the persisted session at startup.
    ///
    /// A stored token without a readable profile, or any storage read
    /// failure, discards the persisted session. Only the first call does
    /// any work; later calls return the current user.
    #[instrument(skip(self))]
    pub async fn rehydrate(&self) -> Option<UserProfile> {
        let mut rehydrated = self.inner.rehydrated.lock().await;
        if *rehydrated {
            return self.current_user();
        }

        let user = match self.inner.token_store.get_session().await {
            Ok((None, _)) => {
                debug!("No persisted session");
                None
            }
            Ok((Some(_), Some(user))) => {
                info!(user_id = %user.id, role = %user.role, "Session restored");
                Some(user)
            }
            Ok((Some(_), None)) => {
                warn!("Stored token has no readable profile, discarding session");
                self.discard_persisted_session().await;
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session, discarding it");
                self.discard_persisted_session().await;
                None
            }
        };

        *rehydrated = true;
        self.inner.state.send_replace(SessionSnapshot {
            current_user: user.clone(),
            is_loading: false,
        });
        user
    }

    /// Signs in with email and password.
    ///
    /// `intended` is honored only when it is an in-app route other than the
    /// sign-in page; otherwise the default landing page is used.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` before any request is sent
    /// - `AuthError::AuthenticationFailed` for rejected credentials
    /// - `AuthError::InvalidResponse` when the login response is unusable
    #[instrument(skip(self, email, password), fields(email = %redact_if_sensitive("email", email)))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        intended: Option<&str>,
    ) -> Result<NavigationIntent> {
        validate_credentials(email, password)?;

        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .inner
            .client
            .post_json("/auth/login", &credentials)
            .await?;
        if response.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "Login response carried no access token".to_string(),
            ));
        }

        let tokens = TokenPair {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        };
        let user = response.user;
        self.inner.token_store.set_session(&tokens, &user).await?;

        self.inner.state.send_replace(SessionSnapshot {
            current_user: Some(user.clone()),
            is_loading: false,
        });
        info!(user_id = %user.id, role = %user.role, "Signed in");
        let _ = self.inner.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            user_id: user.id,
            role: user.role,
        }));

        Ok(NavigationIntent::Proceed {
            destination: self.landing_for(intended),
        })
    }

    /// Creates an account. The new user still has to sign in.
    #[instrument(skip(self, registration), fields(email = %redact_if_sensitive("email", &registration.email)))]
    pub async fn sign_up(&self, registration: Registration) -> Result<NavigationIntent> {
        validate_registration(&registration)?;

        let request = ApiRequest::post("/users").json(&registration)?;
        self.inner.client.execute(request).await?;

        info!("Account registered");
        let _ = self.inner.event_bus.emit(CoreEvent::Auth(AuthEvent::Registered {
            email: registration.email,
        }));

        Ok(NavigationIntent::SignIn {
            destination: self.inner.settings.sign_in_path.clone(),
            notice: None,
        })
    }

    /// Signs out. Local state is always cleared, whatever the server says.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> NavigationIntent {
        let refresh_token = match self.inner.token_store.get_tokens().await {
            Ok(tokens) => tokens.and_then(|t| t.refresh_token),
            Err(e) => {
                warn!(error = %e, "Could not read refresh token for logout");
                None
            }
        };

        let logout = match ApiRequest::post("/auth/logout").json(&RefreshTokenBody { refresh_token }) {
            Ok(request) => self.inner.client.execute(request).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = logout {
            warn!(error = %e, "Server-side logout failed, clearing local session anyway");
        }

        self.clear_local_session(SignOutReason::UserInitiated).await;

        NavigationIntent::UnauthenticatedEntry {
            destination: self.inner.settings.unauthenticated_entry_path.clone(),
        }
    }

    /// Local cleanup after the session was ended by a failed refresh.
    ///
    /// Makes no network call.
    #[instrument(skip(self))]
    pub async fn handle_forced_logout(&self) -> NavigationIntent {
        self.clear_local_session(SignOutReason::SessionExpired).await;

        NavigationIntent::SignIn {
            destination: self.inner.settings.sign_in_path.clone(),
            notice: Some(SessionNotice::session_expired()),
        }
    }

    /// Reacts to forced-logout events until the returned subscription is
    /// dropped.
    ///
    /// Subscribes to the event bus before returning, so no event emitted
    /// afterwards is missed.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen_for_forced_logout(&self) -> ForcedLogoutSubscription {
        let mut events =
            EventStream::new(self.inner.event_bus.subscribe()).filter(CoreEvent::is_forced_logout);
        let (intents_tx, intents) = mpsc::unbounded_channel();
        let manager = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(_) => {
                        if manager.holds_new_session().await {
                            debug!("Session expiry arrived after a new sign-in, ignoring");
                            continue;
                        }
                        let intent = manager.handle_forced_logout().await;
                        let _ = intents_tx.send(intent);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Forced logout listener lagged behind the event bus");
                        if manager.session_ended_elsewhere().await {
                            let intent = manager.handle_forced_logout().await;
                            let _ = intents_tx.send(intent);
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event bus closed, forced logout listener stopping");
                        break;
                    }
                }
            }
        });

        ForcedLogoutSubscription { handle, intents }
    }

    /// The coordinator clears the store before announcing expiry, so stored
    /// tokens mean someone signed in since.
    async fn holds_new_session(&self) -> bool {
        matches!(self.inner.token_store.get_tokens().await, Ok(Some(_)))
    }

    async fn session_ended_elsewhere(&self) -> bool {
        self.current_user().is_some()
            && matches!(self.inner.token_store.get_tokens().await, Ok(None))
    }

    fn landing_for(&self, intended: Option<&str>) -> String {
        match intended {
            Some(path)
                if path.starts_with('/')
                    && !path.starts_with("//")
                    && path != self.inner.settings.sign_in_path =>
            {
                path.to_string()
            }
            _ => self.inner.settings.default_landing_path.clone(),
        }
    }

    async fn discard_persisted_session(&self) {
        if let Err(e) = self.inner.token_store.clear_tokens().await {
            warn!(error = %e, "Failed to discard persisted session");
        }
    }

    async fn clear_local_session(&self, reason: SignOutReason) {
        self.discard_persisted_session().await;

        let caches = self.inner.caches.read().await.clone();
        for cache in caches {
            cache.clear_session_data().await;
            debug!(cache = cache.name(), "Session cache cleared");
        }

        let previous = self.inner.state.send_replace(SessionSnapshot {
            current_user: None,
            is_loading: false,
        });
        let user_id = previous.current_user.map(|user| user.id);
        info!(?reason, user_id = ?user_id, "Signed out");
        let _ = self
            .inner
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SignedOut { user_id, reason }));
    }
}

/// Live forced-logout listener. Dropping it stops the listener.
pub struct ForcedLogoutSubscription {
    handle: JoinHandle<()>,
    intents: mpsc::UnboundedReceiver<NavigationIntent>,
}

impl ForcedLogoutSubscription {
    /// Waits for the next forced logout and returns where to go.
    pub async fn next_intent(&mut self) -> Option<NavigationIntent> {
        self.intents.recv().await
    }

    pub fn try_next(&mut self) -> Option<NavigationIntent> {
        self.intents.try_recv().ok()
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ForcedLogoutSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, test_user, FakeApi, RefreshReply};
    use crate::token_store::USER_KEY;
    use crate::ErrorKind;
    use bridge_traits::storage::{InMemorySecureStore, SecureStore};
    use core_runtime::config::RefreshCredentialMode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCache {
        clears: AtomicUsize,
    }

    #[async_trait]
    impl SessionScopedCache for CountingCache {
        async fn clear_session_data(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn drain(events: &mut core_runtime::events::Receiver<CoreEvent>) -> Vec<CoreEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    #[tokio::test]
    async fn test_rehydrate_without_tokens() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();
        assert!(session.is_session_loading());

        assert!(session.rehydrate().await.is_none());
        assert!(!session.is_session_loading());
        assert!(session.current_user().is_none());
        assert!(h.api.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rehydrate_restores_cached_profile() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        h.seed_session("access", Some("refresh")).await;
        let session = h.session_manager();
        let mut changes = session.subscribe();

        assert_eq!(session.rehydrate().await, Some(test_user()));
        assert!(changes.has_changed().unwrap());
        let snapshot = changes.borrow_and_update().clone();
        assert!(snapshot.is_authenticated());
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_rehydrate_discards_token_without_profile() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        h.token_store
            .set_tokens(&TokenPair::new("access", Some("refresh".to_string())))
            .await
            .unwrap();
        let session = h.session_manager();

        assert!(session.rehydrate().await.is_none());
        assert!(h.token_store.get_tokens().await.unwrap().is_none());
        assert!(!session.is_session_loading());
    }

    #[tokio::test]
    async fn test_rehydrate_discards_malformed_profile() {
        let secure_store = Arc::new(InMemorySecureStore::new());
        let token_store = Arc::new(TokenStore::new(secure_store.clone()));
        token_store
            .set_tokens(&TokenPair::new("access", None))
            .await
            .unwrap();
        secure_store.set_secret(USER_KEY, b"{not json").await.unwrap();

        let client = Arc::new(AuthenticatedClient::new(
            FakeApi::new(),
            token_store.clone(),
            EventBus::new(8),
            crate::testing::BASE_URL,
            AuthSettings::default(),
            std::time::Duration::from_secs(5),
        ));
        let session = SessionManager::new(client, EventBus::new(8));

        assert!(session.rehydrate().await.is_none());
        assert!(token_store.get_tokens().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rehydrate_runs_once() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();
        assert!(session.rehydrate().await.is_none());

        h.seed_session("access", Some("refresh")).await;
        assert!(session.rehydrate().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_persists_session_and_proceeds() {
        let api = FakeApi::new();
        *api.valid_access.lock().unwrap() = Some("login-access".to_string());
        let h = harness(api, RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();
        let mut events = h.event_bus.subscribe();

        let intent = session
            .sign_in("staff@school.edu", "correct-horse", None)
            .await
            .unwrap();
        assert_eq!(
            intent,
            NavigationIntent::Proceed {
                destination: "/dashboard".to_string()
            }
        );

        let user = session.current_user().unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.email, "staff@school.edu");

        let (tokens, stored_user) = h.token_store.get_session().await.unwrap();
        let tokens = tokens.unwrap();
        assert_eq!(tokens.access_token, "login-access");
        assert_eq!(tokens.refresh_token.as_deref(), Some("login-refresh"));
        assert_eq!(stored_user, Some(user));

        assert_eq!(
            drain(&mut events),
            vec![CoreEvent::Auth(AuthEvent::SignedIn {
                user_id: "u-1".to_string(),
                role: "admin".to_string()
            })]
        );

        let request = h.api.last_request_to("/auth/login").unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "email": "staff@school.edu", "password": "correct-horse" })
        );

        let follow_up: serde_json::Value =
            h.client.get_json("/organizations", &[]).await.unwrap();
        assert_eq!(follow_up["token"], "login-access");
        let request = h.api.last_request_to("/organizations").unwrap();
        assert_eq!(request.bearer(), Some("login-access"));
        assert_eq!(h.api.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_in_honors_safe_intended_destination() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();

        for (intended, expected) in [
            (Some("/organizations"), "/organizations"),
            (Some("//evil.example.com"), "/dashboard"),
            (Some("https://evil.example.com"), "/dashboard"),
            (Some("/login"), "/dashboard"),
        ] {
            let intent = session
                .sign_in("staff@school.edu", "correct-horse", intended)
                .await
                .unwrap();
            assert_eq!(intent.destination(), expected, "intended {:?}", intended);
        }
    }

    #[tokio::test]
    async fn test_sign_in_rejected_credentials() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();
        session.rehydrate().await;

        let err = session
            .sign_in("staff@school.edu", "wrong", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(matches!(err, AuthError::AuthenticationFailed(ref m) if m.contains("Invalid credentials")));
        assert!(session.current_user().is_none());
        assert!(h.token_store.get_tokens().await.unwrap().is_none());
        assert_eq!(h.api.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_in_validation_happens_before_network() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();

        let err = session.sign_in("not-an-email", "", None).await.unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert!(errors.message_for("email").is_some());
        assert!(errors.message_for("password").is_some());
        assert!(h.api.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_does_not_authenticate() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();
        let mut events = h.event_bus.subscribe();

        let intent = session
            .sign_up(Registration::new("new@school.edu", "secret1", "Nadia", "Rahman"))
            .await
            .unwrap();
        assert_eq!(
            intent,
            NavigationIntent::SignIn {
                destination: "/login".to_string(),
                notice: None
            }
        );
        assert!(session.current_user().is_none());
        assert!(h.token_store.get_tokens().await.unwrap().is_none());
        assert_eq!(
            drain(&mut events),
            vec![CoreEvent::Auth(AuthEvent::Registered {
                email: "new@school.edu".to_string()
            })]
        );

        let request = h.api.last_request_to("/users").unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["firstName"], "Nadia");
        assert_eq!(body["lastName"], "Rahman");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();

        let err = session
            .sign_up(Registration::new("new@school.edu", "abc", "Nadia", "Rahman"))
            .await
            .unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap().message_for("password"),
            Some("Password must be at least 6 characters")
        );
        assert_eq!(h.api.calls_to("/users"), 0);
    }

    #[tokio::test]
    async fn test_sign_out_clears_everything_even_when_server_fails() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        *h.api.logout_status.lock().unwrap() = 500;
        let session = h.session_manager();
        let cache = Arc::new(CountingCache::default());
        session.register_cache(cache.clone()).await;
        session
            .sign_in("staff@school.edu", "correct-horse", None)
            .await
            .unwrap();
        let mut events = h.event_bus.subscribe();

        let intent = session.sign_out().await;
        assert_eq!(
            intent,
            NavigationIntent::UnauthenticatedEntry {
                destination: "/".to_string()
            }
        );
        assert!(session.current_user().is_none());
        assert!(h.token_store.get_tokens().await.unwrap().is_none());
        assert!(h.token_store.get_user().await.unwrap().is_none());
        assert_eq!(cache.clears.load(Ordering::SeqCst), 1);
        assert_eq!(
            drain(&mut events),
            vec![CoreEvent::Auth(AuthEvent::SignedOut {
                user_id: Some("u-1".to_string()),
                reason: SignOutReason::UserInitiated
            })]
        );

        let request = h.api.last_request_to("/auth/logout").unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "refreshToken": "login-refresh" }));
    }

    #[tokio::test]
    async fn test_sign_out_when_offline() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        h.seed_session("access", Some("refresh")).await;
        let session = h.session_manager();
        session.rehydrate().await;
        h.api.unreachable.store(true, Ordering::SeqCst);

        let intent = session.sign_out().await;
        assert_eq!(intent.destination(), "/");
        assert!(session.current_user().is_none());
        assert!(h.token_store.get_tokens().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forced_logout_after_failed_refresh() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        *h.api.refresh_reply.lock().unwrap() = RefreshReply::Reject(401);
        h.seed_session("stale", Some("rt-1")).await;
        let session = h.session_manager();
        let cache = Arc::new(CountingCache::default());
        session.register_cache(cache.clone()).await;
        session.rehydrate().await;
        let mut subscription = session.listen_for_forced_logout();

        let err = h
            .client
            .execute(ApiRequest::get("/organizations"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired(_)));

        let intent = subscription.next_intent().await.unwrap();
        assert_eq!(intent.destination(), "/login");
        assert_eq!(intent.notice(), Some(&SessionNotice::session_expired()));
        assert!(session.current_user().is_none());
        assert_eq!(cache.clears.load(Ordering::SeqCst), 1);
        assert!(subscription.try_next().is_none());
        assert!(subscription.is_active());
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_listening() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        h.seed_session("access", Some("refresh")).await;
        let session = h.session_manager();
        session.rehydrate().await;

        let subscription = session.listen_for_forced_logout();
        drop(subscription);

        let _ = h.event_bus.emit(CoreEvent::Auth(AuthEvent::SessionExpired {
            message: "gone".to_string(),
        }));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(session.current_user().is_some());
    }

    #[tokio::test]
    async fn test_stale_expiry_does_not_end_new_session() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        let session = h.session_manager();
        session.rehydrate().await;
        let mut subscription = session.listen_for_forced_logout();

        session
            .sign_in("staff@school.edu", "correct-horse", None)
            .await
            .unwrap();
        let _ = h.event_bus.emit(CoreEvent::Auth(AuthEvent::SessionExpired {
            message: "Refresh rejected with status 401".to_string(),
        }));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(subscription.try_next().is_none());
        assert_eq!(session.current_user().unwrap().id, "u-1");
        let tokens = h.token_store.get_tokens().await.unwrap().unwrap();
        assert_eq!(tokens.access_token, "login-access");
    }

    #[tokio::test]
    async fn test_handle_forced_logout_makes_no_network_call() {
        let h = harness(FakeApi::new(), RefreshCredentialMode::BodyToken).await;
        h.seed_session("access", Some("refresh")).await;
        let session = h.session_manager();
        session.rehydrate().await;

        let intent = session.handle_forced_logout().await;
        assert!(matches!(intent, NavigationIntent::SignIn { .. }));
        assert!(h.api.requests.lock().unwrap().is_empty());
        assert!(h.token_store.get_tokens().await.unwrap().is_none());
    }
}
