//! Error types for Relay.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Event errors
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Cannot convert {category} event: {reason}")]
    Conversion { category: String, reason: String },

    // Matching errors
    #[error("Matching failed for {pipeline}: {reason}")]
    Matching { pipeline: String, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // Cache errors
    #[error("Timed out after {elapsed_ms}ms: {what}")]
    Timeout { what: String, elapsed_ms: u64 },

    // Collaborator errors
    #[error("Pipeline store error: {0}")]
    Store(String),

    #[error("Pipeline initiation failed for {pipeline}: {reason}")]
    Initiation { pipeline: String, reason: String },

    #[error("Listener failed: {0}")]
    Listener(String),

    // Infrastructure errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short, stable name of the error variant, suitable as a metric tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidEvent(_) => "invalid_event",
            Error::Conversion { .. } => "conversion",
            Error::Matching { .. } => "matching",
            Error::InvalidPattern { .. } => "invalid_pattern",
            Error::Timeout { .. } => "timeout",
            Error::Store(_) => "store",
            Error::Initiation { .. } => "initiation",
            Error::Listener(_) => "listener",
            Error::Http(_) => "http",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::Internal(_) => "internal",
        }
    }

    pub fn conversion(category: impl Into<String>, reason: impl ToString) -> Self {
        Error::Conversion {
            category: category.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
