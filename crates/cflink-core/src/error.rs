//! Error types for cflink
//!
//! A single error enum is shared by the store, the gateways and the
//! reconciler so callers can match on the kind of failure without
//! downcasting.

use thiserror::Error;

/// Result type alias for cflink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cflink
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input shape or missing required field, rejected before any external call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The DNS provider rejected the request
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Rejection reason as reported by the provider
        message: String,
    },

    /// Gateway unreachable or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// A local invariant would be violated by the request
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Entity does not exist (or is not visible to the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential encryption or decryption failed
    #[error("Credential error: {0}")]
    Crypto(String),

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a credential error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Create an authorization error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// True for failures that happened at one of the outbound gateways.
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Network(_))
    }

    /// Short reason suitable for a log entry or a batch failure list.
    ///
    /// Strips the variant prefix so that user-facing messages read
    /// "record already exists" rather than "Provider error (cloudflare): ...".
    pub fn reason(&self) -> String {
        match self {
            Self::Provider { message, .. } => message.clone(),
            Self::Validation(msg)
            | Self::Network(msg)
            | Self::Conflict(msg)
            | Self::NotFound(msg)
            | Self::Storage(msg)
            | Self::Config(msg)
            | Self::Crypto(msg)
            | Self::Unauthorized(msg)
            | Self::Other(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
