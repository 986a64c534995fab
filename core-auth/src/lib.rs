//! # Authentication Module
//!
//! Session credentials, authenticated requests and the session lifecycle for
//! the billing console.
//!
//! ## Overview
//!
//! - [`TokenStore`] persists the access token, refresh token and cached
//!   profile through the host `SecureStore`.
//! - [`AuthenticatedClient`] attaches the bearer token to every request and
//!   recovers from 401 responses by refreshing once and replaying.
//! - [`RefreshCoordinator`] guarantees a single outstanding refresh, however
//!   many requests fail at once, and ends the session when refresh fails.
//! - [`SessionManager`] exposes the current user and sign-in, sign-up,
//!   sign-out and forced logout, returning [`NavigationIntent`]s.
//!
//! ## Features
//!
//! - Refresh credential in the request body or in an HTTP-only cookie
//! - Client-side validation before any request leaves the process
//! - Forced logout delivered over the core event bus
//! - Token values never logged

pub mod client;
pub mod error;
pub mod refresh;
pub mod session;
pub mod token_store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod testing;

pub use client::{ApiRequest, AuthenticatedClient};
pub use error::{AuthError, ErrorKind, Result};
pub use refresh::RefreshCoordinator;
pub use session::{ForcedLogoutSubscription, SessionManager, SessionScopedCache};
pub use token_store::TokenStore;
pub use types::{
    Credentials, NavigationIntent, Registration, SessionNotice, SessionSnapshot, TokenPair,
    UserProfile,
};
pub use validation::{is_valid_email, FieldError, ValidationErrors};
