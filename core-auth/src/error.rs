use crate::validation::ValidationErrors;
use bridge_traits::BridgeError;
use thiserror::Error;

/// Coarse classification used by hosts to pick a message and a recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before any network call
    Validation,
    /// Bad credentials, or the session can no longer be refreshed
    Authentication,
    /// No response was received
    Network,
    /// The server answered with an error status other than 401
    ConflictOrServer,
    /// Storage, serialization or programming errors
    Internal,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Serialization failed ({context}): {source}")]
    SerializationFailed {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::AuthenticationFailed(_) | AuthError::SessionExpired(_) => {
                ErrorKind::Authentication
            }
            AuthError::Network(_) => ErrorKind::Network,
            AuthError::Api { .. } => ErrorKind::ConflictOrServer,
            AuthError::SecureStorageUnavailable(_)
            | AuthError::SerializationFailed { .. }
            | AuthError::InvalidResponse(_)
            | AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status carried by the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Api { status, .. } => Some(*status),
            AuthError::AuthenticationFailed(_) => Some(401),
            _ => None,
        }
    }

    /// Per-field messages for validation failures.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            AuthError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Failure to obtain a response from the transport.
    pub(crate) fn from_transport(error: BridgeError) -> Self {
        AuthError::Network(error.to_string())
    }

    pub(crate) fn from_storage(error: BridgeError) -> Self {
        AuthError::SecureStorageUnavailable(error.to_string())
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        AuthError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
