//! Unified error handling for the edugraph crate
//!
//! Domain-specific errors (store, LLM, enrichment) stay in their modules;
//! this `Error` wraps them for use across module boundaries, with an
//! [`ErrorCategory`] classification for logging and handling strategies.

use std::io;

use thiserror::Error;

pub use crate::enrich::EnrichError;
pub use crate::llm::LlmError;
pub use crate::store::StoreError;

/// Classification of errors for handling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-level failures (HTTP transport, timeout)
    Network,
    /// Triple-store protocol errors
    Store,
    /// LLM and generation errors
    Llm,
    /// Parsing and serialization errors
    Parsing,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the edugraph crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Triple-store errors (query, update, upload)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Generative API errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// DBpedia lookup errors
    #[error("Enrichment error: {0}")]
    Enrich(#[from] EnrichError),

    /// HTTP client errors outside the store protocol
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context.
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Check whether the error is plausibly transient. Nothing in the
    /// crate retries automatically; callers use this for logging only.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(StoreError::Http(_)) | Self::Http(_) => true,
            Self::Store(_) => false,
            Self::Llm(e) => e.is_recoverable(),
            Self::Enrich(_) => true,
            Self::Json(_) | Self::Io(_) | Self::Config(_) | Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Store(StoreError::Http(_)) | Self::Http(_) => ErrorCategory::Network,
            Self::Store(StoreError::Decode(_)) => ErrorCategory::Parsing,
            Self::Store(_) => ErrorCategory::Store,
            Self::Llm(_) => ErrorCategory::Llm,
            Self::Enrich(_) => ErrorCategory::Network,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Io(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_status_category() {
        let err = Error::Store(StoreError::Status {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(err.category(), ErrorCategory::Store);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing endpoint");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_llm_category() {
        let err = Error::Llm(LlmError::EmptyResponse);
        assert_eq!(err.category(), ErrorCategory::Llm);
    }
}
