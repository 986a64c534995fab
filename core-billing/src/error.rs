use core_auth::{AuthError, ErrorKind, ValidationErrors};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BillingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BillingError::Auth(e) => e.kind(),
            BillingError::Validation(_) => ErrorKind::Validation,
            BillingError::Decode { .. } => ErrorKind::Internal,
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            BillingError::Validation(errors) => Some(errors),
            BillingError::Auth(e) => e.validation_errors(),
            BillingError::Decode { .. } => None,
        }
    }

    /// True when the session is gone and the user has to sign in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, BillingError::Auth(AuthError::SessionExpired(_)))
    }
}

impl From<ValidationErrors> for BillingError {
    fn from(errors: ValidationErrors) -> Self {
        BillingError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
