//! Error types for the parameter store client.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during parameter store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The named parameter (or tagged resource) does not exist.
    #[error("Parameter not found: {0}")]
    NotFound(String),

    /// The store rejected the request.
    #[error("Store error ({code}): {message}")]
    Api { code: String, message: String },

    /// The store answered with something we could not interpret.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// The request never got an answer from the store: credentials, region,
    /// connection or request construction failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error setting up the transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Check if this error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error came back from the store itself (as opposed to the transport).
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::NotFound(_))
    }
}
