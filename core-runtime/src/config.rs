//! # Core Configuration Module
//!
//! Provides configuration management for the console core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and the settings of the session
//! context. It enforces fail-fast validation so that a missing bridge or a
//! malformed URL is reported at startup rather than on the first request.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Transport for every API call
//! - `SecureStore` - Persistence of the session tokens and cached profile
//!
//! When the `desktop-shims` feature is enabled, `ReqwestHttpClient` and
//! `KeyringSecureStore` are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, RefreshCredentialMode};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://billing.example.com/api")
//!     .refresh_mode(RefreshCredentialMode::Cookie)
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! [`CoreConfigBuilder::from_env`] seeds a builder from:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `CONSOLE_API_BASE_URL` | API root, e.g. `https://host/api` |
//! | `CONSOLE_REFRESH_MODE` | `body` (default) or `cookie` |
//! | `CONSOLE_REQUEST_TIMEOUT_SECS` | Per-request timeout in seconds |

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, SecureStore, SystemClock};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "CONSOLE_API_BASE_URL";
pub const ENV_REFRESH_MODE: &str = "CONSOLE_REFRESH_MODE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CONSOLE_REQUEST_TIMEOUT_SECS";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// How the refresh credential reaches `POST /auth/refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshCredentialMode {
    /// The stored refresh token is sent as `{"refreshToken": ...}`.
    #[default]
    BodyToken,
    /// The server keeps the refresh token in an HTTP-only cookie; the request
    /// body is empty and the HTTP client must keep a cookie jar.
    Cookie,
}

impl FromStr for RefreshCredentialMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "body" | "body_token" | "token" => Ok(Self::BodyToken),
            "cookie" => Ok(Self::Cookie),
            other => Err(Error::Config(format!(
                "Unknown refresh mode '{}'. Expected 'body' or 'cookie'.",
                other
            ))),
        }
    }
}

/// Authentication and navigation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub refresh_mode: RefreshCredentialMode,
    /// Request paths whose 401 responses never trigger a refresh. Matched
    /// exactly against the path without its query string.
    pub exempt_paths: Vec<String>,
    /// Where a successful sign-in lands when no destination was requested.
    pub default_landing_path: String,
    /// Sign-in page, target of forced logout and successful registration.
    pub sign_in_path: String,
    /// Public entry page shown after a voluntary sign-out.
    pub unauthenticated_entry_path: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_mode: RefreshCredentialMode::BodyToken,
            exempt_paths: ["/auth/login", "/auth/refresh", "/auth/logout", "/users"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            default_landing_path: "/dashboard".to_string(),
            sign_in_path: "/login".to_string(),
            unauthenticated_entry_path: "/".to_string(),
        }
    }
}

impl AuthSettings {
    /// Whether a 401 on `path` must fail without attempting a refresh.
    pub fn is_exempt(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        let path = path.trim_end_matches('/');
        self.exempt_paths
            .iter()
            .any(|exempt| exempt.trim_end_matches('/') == path)
    }

    fn validate(&self) -> Result<()> {
        let routes = [
            ("default_landing_path", &self.default_landing_path),
            ("sign_in_path", &self.sign_in_path),
            ("unauthenticated_entry_path", &self.unauthenticated_entry_path),
        ];
        for (name, value) in routes {
            if !value.starts_with('/') {
                return Err(Error::Config(format!(
                    "{} must be an absolute route starting with '/', got '{}'",
                    name, value
                )));
            }
        }

        if let Some(bad) = self.exempt_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(Error::Config(format!(
                "Exempt path '{}' must start with '/'",
                bad
            )));
        }

        Ok(())
    }
}

/// Session-scoped query cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Maximum number of cached GET responses
    pub capacity: usize,
    /// How long a cached response is served before it is fetched again
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 256,
            ttl: Duration::from_secs(30),
        }
    }
}

/// Core configuration for the console core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// API root; request paths such as `/auth/login` are appended to it.
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub http_client: Arc<dyn HttpClient>,
    pub secure_store: Arc<dyn SecureStore>,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthSettings,
    pub cache: CacheSettings,
    /// Capacity of the event bus channel
    pub event_buffer_size: usize,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("auth", &self.auth)
            .field("cache", &self.cache)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The API base URL is an absolute http(s) URL
    /// - The request timeout is within (0, 300s]
    /// - Navigation routes and exempt paths are absolute
    /// - Cache and event buffer sizes are non-zero
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_base_url).map_err(|e| {
            Error::Config(format!(
                "Invalid API base URL '{}': {}",
                self.api_base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(Error::Config(
                "Request timeout exceeds maximum of 300 seconds".to_string(),
            ));
        }

        self.auth.validate()?;

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(Error::Config(
                "Cache capacity must be greater than 0 when the cache is enabled".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Joins the base URL and an API path such as `/organizations`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _timeout: Duration,
    _mode: RefreshCredentialMode,
) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for API access. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject a client that returns every response regardless of status."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    timeout: Duration,
    mode: RefreshCredentialMode,
) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::{HttpClientOptions, ReqwestHttpClient};

    let client = ReqwestHttpClient::with_options(HttpClientOptions {
        timeout,
        cookie_store: mode == RefreshCredentialMode::Cookie,
        ..HttpClientOptions::default()
    })
    .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;

    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for session persistence. \
                 Desktop: enable the 'desktop-shims' feature to use the default KeyringSecureStore. \
                 Headless hosts: inject FileSecureStore or InMemorySecureStore."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    Ok(Arc::new(KeyringSecureStore::new()))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    request_timeout: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    clock: Option<Arc<dyn Clock>>,
    auth: AuthSettings,
    cache: CacheSettings,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Seeds a builder from `CONSOLE_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable is set but unparseable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();

        if let Some(url) = lookup(ENV_API_BASE_URL) {
            builder = builder.api_base_url(url);
        }

        if let Some(mode) = lookup(ENV_REFRESH_MODE) {
            builder = builder.refresh_mode(mode.parse()?);
        }

        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_REQUEST_TIMEOUT_SECS, secs
                ))
            })?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    /// Sets the API root. Default: `http://localhost:3000/api`.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Default: 30 seconds.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, a reqwest-based client is created when the
    /// `desktop-shims` feature is enabled. In `Cookie` refresh mode the
    /// default client keeps a cookie jar.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation (required without
    /// `desktop-shims`).
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Time source for cache expiry. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn refresh_mode(mut self, mode: RefreshCredentialMode) -> Self {
        self.auth.refresh_mode = mode;
        self
    }

    /// Replaces the list of refresh-exempt paths.
    pub fn exempt_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth.exempt_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_landing_path(mut self, path: impl Into<String>) -> Self {
        self.auth.default_landing_path = path.into();
        self
    }

    /// Sets all authentication settings at once.
    pub fn auth(mut self, auth: AuthSettings) -> Self {
        self.auth = auth;
        self
    }

    pub fn cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`](crate::events::DEFAULT_EVENT_BUFFER_SIZE).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent and no
    ///   platform default is available
    /// - [`Error::Config`] when a setting is invalid
    pub fn build(self) -> Result<CoreConfig> {
        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout, self.auth.refresh_mode)?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let config = CoreConfig {
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            request_timeout,
            http_client,
            secure_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            auth: self.auth,
            cache: self.cache,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
