//! Error types for the node
//!
//! A single crate-wide error enum built with `thiserror`, with constructor
//! helpers per category. Startup-fatal conditions (configuration, storage)
//! are distinguished from the non-fatal kinds that peer traffic produces.

use thiserror::Error;

/// Main error type for the node
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration; fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// Unreadable or invalid persisted chain; fatal at startup
    #[error("storage error: {0}")]
    Storage(String),

    /// A chain or block failed structural validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// A submitted transaction was not admitted to the pool
    #[error("transaction rejected: {0}")]
    TxRejected(String),

    /// Peer dial, request, or deadline failure
    #[error("network error: {0}")]
    Network(String),

    /// Mining worker failure
    #[error("worker error: {0}")]
    Worker(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary chain encoding errors
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// Outbound HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for the node
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a transaction rejection
    pub fn tx_rejected(msg: impl Into<String>) -> Self {
        Self::TxRejected(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a worker error
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }

    /// Whether this error should abort the process at startup.
    ///
    /// The node never aborts for peer-sourced errors; only local truth being
    /// corrupt (config, storage) is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Storage(_))
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration",
            Error::Storage(_) => "storage",
            Error::Validation(_) => "validation",
            Error::TxRejected(_) => "transaction",
            Error::Network(_) | Error::Http(_) => "network",
            Error::Worker(_) => "worker",
            Error::Io(_) => "io",
            Error::Json(_) | Error::Encoding(_) => "serialization",
        }
    }
}
