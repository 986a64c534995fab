//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the bridge traits
//! the console core needs:
//! - `HttpClient` using `reqwest` (with an optional cookie jar for
//!   cookie-based token refresh)
//! - `SecureStore` using the `keyring` crate (OS keychain)
//! - `SecureStore` backed by a JSON file for headless hosts
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileSecureStore, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let store = FileSecureStore::in_data_dir("billing-console")?;
//!
//!     // Use in core configuration
//! }
//! ```

mod file_store;
mod http;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use file_store::FileSecureStore;
pub use http::{HttpClientOptions, ReqwestHttpClient};

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
