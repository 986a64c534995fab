use serde::{Deserialize, Serialize};
use std::fmt;

/// Access and refresh credentials for the current session.
///
/// The access token authorizes API calls; the refresh token (absent when the
/// server keeps it in a cookie) obtains a new access token after a 401.
///
/// `Debug` never prints token values.
///
/// # Examples
///
/// ```
/// use core_auth::TokenPair;
///
/// let tokens = TokenPair::new("access", Some("refresh".to_string()));
/// assert_eq!(format!("{:?}", tokens), "TokenPair { access_token: \"[REDACTED]\", refresh_token: Some(\"[REDACTED]\") }");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// The signed-in staff member, as returned by `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// Sign-in request body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Account creation request body for `POST /users`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// Body of `/auth/refresh` and `/auth/logout`.
#[derive(Serialize)]
pub(crate) struct RefreshTokenBody {
    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Message a host should show alongside a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNotice {
    pub title: String,
    pub description: String,
}

impl SessionNotice {
    pub fn session_expired() -> Self {
        Self {
            title: "Session Expired".to_string(),
            description: "Your session has expired. Please login again.".to_string(),
        }
    }
}

/// Where the presentation layer should go after a session operation.
///
/// The core never navigates; it returns one of these and the host acts on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    /// Signed in; continue to `destination`.
    Proceed { destination: String },
    /// Show the sign-in page, optionally with a notice.
    SignIn {
        destination: String,
        notice: Option<SessionNotice>,
    },
    /// Show the public entry page.
    UnauthenticatedEntry { destination: String },
}

impl NavigationIntent {
    pub fn destination(&self) -> &str {
        match self {
            NavigationIntent::Proceed { destination }
            | NavigationIntent::SignIn { destination, .. }
            | NavigationIntent::UnauthenticatedEntry { destination } => destination,
        }
    }

    pub fn notice(&self) -> Option<&SessionNotice> {
        match self {
            NavigationIntent::SignIn { notice, .. } => notice.as_ref(),
            _ => None,
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub current_user: Option<UserProfile>,
    /// True until the persisted session has been read at startup.
    pub is_loading: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            current_user: None,
            is_loading: true,
        }
    }
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }
}
