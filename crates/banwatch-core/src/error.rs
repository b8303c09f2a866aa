//! Error types for the banwatch system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for banwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the banwatch system
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream API (ban source) errors
    #[error("Ban source error: {0}")]
    Source(String),

    /// Notification sink errors (webhook delivery)
    #[error("Notification sink error: {0}")]
    Sink(String),

    /// Watermark persistence errors
    #[error("Watermark store error: {0}")]
    Watermark(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Locale table errors (missing language, malformed resource)
    #[error("Locale error: {0}")]
    Locale(String),

    /// Timestamp that does not match the expected format
    #[error("Invalid timestamp '{value}': {reason}")]
    Timestamp {
        /// The offending raw value
        value: String,
        /// Why parsing failed
        reason: String,
    },

    /// Filesystem and socket errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a ban source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a notification sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a watermark store error
    pub fn watermark(msg: impl Into<String>) -> Self {
        Self::Watermark(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a locale error
    pub fn locale(msg: impl Into<String>) -> Self {
        Self::Locale(msg.into())
    }

    /// Create a timestamp parse error
    pub fn timestamp(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Timestamp {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
