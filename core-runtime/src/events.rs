//! # Event Bus System
//!
//! Provides an event-driven architecture for the console core using
//! `tokio::sync::broadcast`. Modules publish typed events; hosts and other
//! modules subscribe without knowing who produced them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐
//! │ RefreshCoordinator├─────────>│           │   subscribe   ┌─────────────────────┐
//! └──────────────────┘           │ EventBus  ├──────────────>│ Forced-logout watch │
//! ┌──────────────────┐   emit    │ (broadcast│               └─────────────────────┘
//! │ SessionManager   ├─────────>│  channel) │   subscribe   ┌─────────────────────┐
//! └──────────────────┘           │           ├──────────────>│ Host UI / toasts    │
//! ┌──────────────────┐   emit    │           │               └─────────────────────┘
//! │ BillingApi       ├─────────>│           │
//! └──────────────────┘           └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::SessionExpired {
//!         message: "refresh rejected".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(event.is_forced_logout());
//! # }
//! ```
//!
//! ## Event Types
//!
//! ### Authentication Events
//! - `SignedIn` / `SignedOut` / `Registered`
//! - `TokenRefreshing` / `TokenRefreshed`
//! - `SessionExpired`: the refresh failed; every listener must drop the
//!   session. Emitted exactly once per failed refresh.
//! - `AuthError`
//!
//! ### Billing Events
//! Emitted after a mutation succeeds on the server.
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: all senders dropped. Treat as shutdown.
//!
//! `emit` fails only when nobody is subscribed; publishers ignore that case.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication and session events
    Auth(AuthEvent),
    /// Organization, subscription and payment changes
    Billing(BillingEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Billing(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SessionExpired { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn { .. })
            | CoreEvent::Auth(AuthEvent::SignedOut { .. })
            | CoreEvent::Billing(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// True for the event that requires every holder of session state to
    /// discard it.
    pub fn is_forced_logout(&self) -> bool {
        matches!(self, CoreEvent::Auth(AuthEvent::SessionExpired { .. }))
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignOutReason {
    /// The user asked to sign out.
    UserInitiated,
    /// The refresh token was rejected or missing.
    SessionExpired,
}

/// Events related to authentication and the session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Credentials accepted and the session persisted.
    SignedIn {
        user_id: String,
        role: String,
    },
    /// Local session state was cleared.
    SignedOut {
        /// The user that was signed in, when known.
        user_id: Option<String>,
        reason: SignOutReason,
    },
    /// A new account was created. The caller is not signed in.
    Registered {
        email: String,
    },
    /// A refresh call was issued after a 401.
    TokenRefreshing,
    /// A refresh call succeeded and new tokens were stored.
    TokenRefreshed {
        /// Whether the server rotated the refresh token as well.
        refresh_token_rotated: bool,
    },
    /// The refresh call failed; the session is gone.
    SessionExpired {
        /// Failure reason shared by every request that was waiting.
        message: String,
    },
    /// Authentication error occurred.
    AuthError {
        message: String,
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SignedIn { .. } => "User signed in successfully",
            AuthEvent::SignedOut { .. } => "User signed out",
            AuthEvent::Registered { .. } => "Account registered",
            AuthEvent::TokenRefreshing => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::SessionExpired { .. } => "Session expired",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Billing Events
// ============================================================================

/// Events emitted after billing mutations succeed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum BillingEvent {
    OrganizationCreated {
        organization_id: String,
        name: String,
    },
    OrganizationUpdated {
        organization_id: String,
    },
    SubscriptionCreated {
        subscription_id: String,
        organization_id: String,
        amount: f64,
    },
    SubscriptionCancelled {
        subscription_id: String,
    },
    SubscriptionRenewed {
        subscription_id: String,
    },
    PaymentRecorded {
        payment_id: String,
        subscription_id: String,
        amount: f64,
        /// `stripe` or `bkash`
        method: String,
    },
}

impl BillingEvent {
    fn description(&self) -> &str {
        match self {
            BillingEvent::OrganizationCreated { .. } => "Organization created",
            BillingEvent::OrganizationUpdated { .. } => "Organization updated",
            BillingEvent::SubscriptionCreated { .. } => "Subscription created",
            BillingEvent::SubscriptionCancelled { .. } => "Subscription cancelled",
            BillingEvent::SubscriptionRenewed { .. } => "Subscription renewed",
            BillingEvent::PaymentRecorded { .. } => "Payment recorded",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to core events.
///
/// Cheap to clone; all clones share one channel.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
/// let mut subscriber = event_bus.subscribe();
///
/// event_bus
///     .emit(CoreEvent::Auth(AuthEvent::SignedIn {
///         user_id: "user-123".to_string(),
///         role: "admin".to_string(),
///     }))
///     .ok();
///
/// assert!(subscriber.recv().await.is_ok());
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   A subscriber that falls further behind receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it, or an error when
    /// there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscription. Only events emitted afterwards are seen.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver wrapper with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let stream = EventStream::new(bus.subscribe()).filter(CoreEvent::is_forced_logout);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only yield events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Waits for the next matching event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns the next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
