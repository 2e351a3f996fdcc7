//! # Gateway Error Types
//!
//! Typed error handling for the payment gateway core.
//! Every adapter operation returns `Result<T, GatewayError>`; raw transport
//! failures are wrapped into `Initialization` or `Verification` before they
//! leave an adapter.

use thiserror::Error;

/// Core error type for all gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Registry could not resolve the provider name to a concrete adapter
    #[error("Unsupported provider: {name}")]
    UnsupportedProvider { name: String },

    /// Remote session-create call failed
    #[error("Initialization failed [{provider}]{}: {message}", display_status(.status))]
    Initialization {
        provider: String,
        /// Upstream HTTP status, `None` when no response was received
        status: Option<u16>,
        message: String,
    },

    /// Remote verify call failed
    #[error("Verification failed [{provider}]{}: {message}", display_status(.status))]
    Verification {
        provider: String,
        /// Upstream HTTP status, `None` when no response was received
        status: Option<u16>,
        message: String,
    },

    /// Invalid request data (amount, email, currency, reference)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors (missing keys, invalid values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Session expired or was never created
    #[error("Session not found or expired: {reference}")]
    SessionNotFound { reference: String },

    /// Checkout URL signature missing, tampered or expired
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Deferred notification could not be dispatched or failed while running
    #[error("Notification error: {0}")]
    Notification(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl GatewayError {
    /// Upstream status code carried by initialization/verification failures
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GatewayError::Initialization { status, .. }
            | GatewayError::Verification { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::UnsupportedProvider { .. } => 404,
            GatewayError::Initialization { .. } => 502,
            GatewayError::Verification { .. } => 502,
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::Configuration(_) => 500,
            GatewayError::SessionNotFound { .. } => 400,
            GatewayError::InvalidSignature(_) => 403,
            GatewayError::Notification(_) => 500,
            GatewayError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
