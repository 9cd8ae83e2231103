//! Error types for Kino VPAID Core

use thiserror::Error;

/// Result type alias for ad session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ad session error types
#[derive(Error, Debug)]
pub enum Error {
    // Lifecycle errors
    #[error("Cannot {operation} while ad is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    // Attribute errors
    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    // Creative errors
    #[error("Malformed ad parameters: {0}")]
    MalformedParameters(String),

    // Host errors
    #[error("Host callback for {event} failed")]
    Callback {
        event: String,
        #[source]
        source: anyhow::Error,
    },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an invalid state error for a rejected host call
    pub fn invalid_state(operation: &'static str, state: impl ToString) -> Self {
        Error::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    /// Returns true if the caller can recover and keep using the session
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::InvalidState { .. } | Error::InvalidAttribute(_))
    }

    /// Returns the error code for tracking
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidState { .. } => "INVALID_STATE",
            Error::InvalidAttribute(_) => "INVALID_ATTRIBUTE",
            Error::MalformedParameters(_) => "MALFORMED_PARAMETERS",
            Error::Callback { .. } => "CALLBACK",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedParameters(err.to_string())
    }
}
