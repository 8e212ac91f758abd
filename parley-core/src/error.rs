//! Error types for parley-core

use thiserror::Error;

/// Main error type for the parley-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Redis backend error
    #[error("backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Store-level failure that did not come from Redis
    #[error("store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP error talking to the completion API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by the completion API
    #[error("{kind}: {message}")]
    Completion { kind: String, message: String },
}

impl Error {
    /// Build a completion error with an API-style type label.
    pub fn completion(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Completion {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Type label used when classifying the error for display.
    ///
    /// Transport errors are labelled after what went wrong so that timeouts
    /// and refused connections land in the right category.
    pub fn type_name(&self) -> String {
        match self {
            Error::Backend(e) if e.is_timeout() => "TimeoutError".to_string(),
            Error::Backend(e) if e.is_connection_refusal() || e.is_io_error() => {
                "ConnectionError".to_string()
            }
            Error::Backend(_) => "RedisError".to_string(),
            Error::Store(_) => "StoreError".to_string(),
            Error::Io(_) => "IoError".to_string(),
            Error::Json(_) => "JsonError".to_string(),
            Error::Config(_) => "ConfigError".to_string(),
            Error::Http(e) if e.is_timeout() => "TimeoutError".to_string(),
            Error::Http(e) if e.is_connect() => "APIConnectionError".to_string(),
            Error::Http(_) => "HttpError".to_string(),
            Error::Completion { kind, .. } => kind.clone(),
        }
    }
}

/// Result type alias for parley-core
pub type Result<T> = std::result::Result<T, Error>;
