//! Scripted API server used by the unit tests in this crate.

use crate::client::AuthenticatedClient;
use crate::session::SessionManager;
use crate::token_store::TokenStore;
use crate::types::{TokenPair, UserProfile};
use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::InMemorySecureStore;
use bytes::Bytes;
use core_runtime::config::{AuthSettings, RefreshCredentialMode};
use core_runtime::events::EventBus;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub(crate) const BASE_URL: &str = "http://api.test";

pub(crate) enum RefreshReply {
    Issue {
        access: String,
        refresh: Option<String>,
    },
    Reject(u16),
    Garbage,
}

impl RefreshReply {
    pub(crate) fn issue(access: &str, refresh: Option<&str>) -> Self {
        RefreshReply::Issue {
            access: access.to_string(),
            refresh: refresh.map(str::to_string),
        }
    }
}

/// Protected endpoints accept exactly `valid_access` as bearer token.
/// `/always-401` never accepts anything; `/conflict` answers 409.
pub(crate) struct FakeApi {
    pub valid_access: Mutex<Option<String>>,
    pub refresh_reply: Mutex<RefreshReply>,
    pub refresh_gate: Mutex<Option<Arc<Notify>>>,
    pub logout_status: Mutex<u16>,
    pub unreachable: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub unauthorized: AtomicUsize,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            valid_access: Mutex::new(None),
            refresh_reply: Mutex::new(RefreshReply::issue(
                "refreshed-access",
                Some("refreshed-refresh"),
            )),
            refresh_gate: Mutex::new(None),
            logout_status: Mutex::new(204),
            unreachable: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            unauthorized: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn path_of(url: &str) -> String {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url);
        path.split('?').next().unwrap_or(path).to_string()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| Self::path_of(&r.url) == path)
            .count()
    }

    pub(crate) fn last_request_to(&self, path: &str) -> Option<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| Self::path_of(&r.url) == path)
            .cloned()
    }

    fn empty(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    fn login(&self, request: &HttpRequest) -> BridgeResult<HttpResponse> {
        let body: serde_json::Value =
            serde_json::from_slice(request.body.as_deref().unwrap_or_default())
                .unwrap_or_default();
        if body["password"] == "correct-horse" {
            *self.valid_access.lock().unwrap() = Some("login-access".to_string());
            HttpResponse::with_json(
                200,
                &json!({
                    "access_token": "login-access",
                    "refresh_token": "login-refresh",
                    "user": { "id": "u-1", "email": body["email"], "role": "admin" }
                }),
            )
        } else {
            HttpResponse::with_json(401, &json!({ "message": "Invalid credentials" }))
        }
    }

    async fn refresh(&self) -> BridgeResult<HttpResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.refresh_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = match &*self.refresh_reply.lock().unwrap() {
            RefreshReply::Issue { access, refresh } => Ok((access.clone(), refresh.clone())),
            RefreshReply::Reject(status) => Err(Some(*status)),
            RefreshReply::Garbage => Err(None),
        };

        match reply {
            Ok((access, refresh)) => {
                *self.valid_access.lock().unwrap() = Some(access.clone());
                let mut body = json!({ "access_token": access });
                if let Some(refresh) = refresh {
                    body["refresh_token"] = json!(refresh);
                }
                HttpResponse::with_json(200, &body)
            }
            Err(Some(status)) => {
                HttpResponse::with_json(status, &json!({ "message": "Invalid refresh token" }))
            }
            Err(None) => Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(b"<html>not json</html>"),
            }),
        }
    }

    fn protected(&self, request: &HttpRequest, path: &str) -> BridgeResult<HttpResponse> {
        if path == "/conflict" {
            return HttpResponse::with_json(409, &json!({ "message": "Already exists" }));
        }

        let valid = self.valid_access.lock().unwrap().clone();
        let accepted = path != "/always-401"
            && valid.is_some()
            && request.bearer() == valid.as_deref();
        if accepted {
            HttpResponse::with_json(200, &json!({ "path": path, "token": request.bearer() }))
        } else {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
            HttpResponse::with_json(401, &json!({ "message": "Unauthorized" }))
        }
    }
}

#[async_trait]
impl HttpClient for FakeApi {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionFailed("connection refused".to_string()));
        }

        let path = Self::path_of(&request.url);
        match (request.method, path.as_str()) {
            (HttpMethod::Post, "/auth/login") => self.login(&request),
            (HttpMethod::Post, "/auth/refresh") => self.refresh().await,
            (HttpMethod::Post, "/auth/logout") => {
                Ok(Self::empty(*self.logout_status.lock().unwrap()))
            }
            (HttpMethod::Post, "/users") => {
                HttpResponse::with_json(201, &json!({ "id": "u-2", "email": "new@school.edu" }))
            }
            _ => self.protected(&request, &path),
        }
    }
}

pub(crate) fn test_user() -> UserProfile {
    UserProfile {
        id: "u-1".to_string(),
        email: "staff@school.edu".to_string(),
        role: "admin".to_string(),
    }
}

pub(crate) struct Harness {
    pub api: Arc<FakeApi>,
    pub token_store: Arc<TokenStore>,
    pub event_bus: EventBus,
    pub client: Arc<AuthenticatedClient>,
    pub coordinator: crate::refresh::RefreshCoordinator,
}

pub(crate) async fn harness(api: Arc<FakeApi>, mode: RefreshCredentialMode) -> Harness {
    let token_store = Arc::new(TokenStore::new(Arc::new(InMemorySecureStore::new())));
    let event_bus = EventBus::new(64);
    let settings = AuthSettings {
        refresh_mode: mode,
        ..AuthSettings::default()
    };
    let client = Arc::new(AuthenticatedClient::new(
        api.clone(),
        token_store.clone(),
        event_bus.clone(),
        BASE_URL,
        settings,
        Duration::from_secs(5),
    ));
    let coordinator = client.coordinator().clone();

    Harness {
        api,
        token_store,
        event_bus,
        client,
        coordinator,
    }
}

impl Harness {
    pub(crate) async fn seed_session(&self, access: &str, refresh: Option<&str>) {
        let tokens = TokenPair::new(access, refresh.map(str::to_string));
        self.token_store
            .set_session(&tokens, &test_user())
            .await
            .unwrap();
    }

    pub(crate) fn session_manager(&self) -> SessionManager {
        SessionManager::new(self.client.clone(), self.event_bus.clone())
    }
}
