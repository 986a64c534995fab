//! Core service façade and bootstrap helpers.
//!
//! [`ConsoleCore`] is the session context a host creates once: it wires the
//! host-provided bridges from a [`CoreConfig`] into the token store,
//! authenticated client, session manager and billing API. Its lifecycle is
//! explicit:
//!
//! 1. [`ConsoleCore::bootstrap`] validates the configuration and builds the
//!    components. No I/O happens yet.
//! 2. [`ConsoleCore::start`] restores the persisted session and returns the
//!    forced-logout subscription the host should drive.
//! 3. [`ConsoleCore::shutdown`] drops session-scoped state.
//!
//! Desktop apps typically enable the `desktop-shims` feature so that
//! `reqwest` and the OS keychain back the HTTP and secure-store bridges.

pub mod error;

pub use error::{CoreError, Result};

pub use core_auth::{
    AuthError, ForcedLogoutSubscription, NavigationIntent, Registration, SessionManager,
    SessionNotice, SessionSnapshot, UserProfile,
};
pub use core_billing::{BillingApi, BillingError};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder};
pub use core_runtime::events::{CoreEvent, EventBus};

use core_auth::{AuthenticatedClient, TokenStore};
use core_billing::QueryCache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
pub struct ConsoleCore {
    config: CoreConfig,
    event_bus: EventBus,
    client: Arc<AuthenticatedClient>,
    session: SessionManager,
    billing: Arc<BillingApi>,
    cache: Arc<QueryCache>,
    started: AtomicBool,
}

impl ConsoleCore {
    /// Builds every component from `config`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InitializationFailed` for an invalid configuration.
    #[instrument(skip(config), fields(api_base_url = %config.api_base_url))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let token_store = Arc::new(TokenStore::new(Arc::clone(&config.secure_store)));
        let client = Arc::new(AuthenticatedClient::from_config(
            &config,
            token_store,
            event_bus.clone(),
        ));
        let session = SessionManager::new(Arc::clone(&client), event_bus.clone());

        let cache = Arc::new(QueryCache::new(config.cache, Arc::clone(&config.clock)));
        session.register_cache(cache.clone()).await;
        let billing = Arc::new(BillingApi::new(
            Arc::clone(&client),
            Arc::clone(&cache),
            event_bus.clone(),
        ));

        info!(refresh_mode = ?config.auth.refresh_mode, "Console core bootstrapped");

        Ok(Self {
            config,
            event_bus,
            client,
            session,
            billing,
            cache,
            started: AtomicBool::new(false),
        })
    }

    /// Restores the persisted session and starts reacting to forced logout.
    ///
    /// The returned subscription yields a [`NavigationIntent`] each time the
    /// session is ended by a failed refresh; dropping it stops the listener.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::AlreadyStarted` on a second call.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<ForcedLogoutSubscription> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CoreError::AlreadyStarted);
        }

        let subscription = self.session.listen_for_forced_logout();
        let user = self.session.rehydrate().await;
        info!(signed_in = user.is_some(), "Console core started");
        Ok(subscription)
    }

    /// Tears the session context down. Persisted credentials are kept, so
    /// the next start restores the session.
    #[instrument(skip(self))]
    pub async fn shutdown(self) {
        self.cache.clear().await;
        info!("Console core shut down");
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn billing(&self) -> &Arc<BillingApi> {
        &self.billing
    }

    pub fn client(&self) -> &Arc<AuthenticatedClient> {
        &self.client
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}

/// Bootstraps from `CONSOLE_*` environment variables with the desktop
/// bridges.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop().await?;
/// let mut forced_logout = core.start().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop() -> Result<ConsoleCore> {
    let config = CoreConfigBuilder::from_env()?.build()?;
    ConsoleCore::bootstrap(config).await
}
