//! Error types for monkey
//!
//! Provides a unified error type for all operations. Library code only ever
//! returns these; the binary decides the exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using MonkeyError
pub type Result<T> = std::result::Result<T, MonkeyError>;

/// Unified error type for monkey operations
#[derive(Debug, Error)]
pub enum MonkeyError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Setup Errors (store location / open)
    // -------------------------------------------------------------------------
    #[error("monkey's hand wont open at {path}: {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Monkey can't play with directories: {0}")]
    StoreIsDirectory(PathBuf),

    #[error("Monkey needs a file to play with: {0} does not exist")]
    StoreMissing(PathBuf),

    #[error("Store corrupted: {0}")]
    StoreCorrupted(String),

    #[error("Store {0} is in use by another monkey")]
    StoreLocked(PathBuf),

    #[error("Home directory could not be resolved")]
    NoHomeDir,

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Log corruption detected: {0}")]
    LogCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store log is unusable after a failed write that could not be undone")]
    LogPoisoned,

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("Store was opened read-only")]
    ReadOnly,

    #[error("Incompatible value: {0}")]
    IncompatibleValue(String),

    #[error("Keys and bucket names must not be empty")]
    EmptyKey,

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("monkey is malformed: {0}")]
    MalformedStore(PathBuf),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("{0}")]
    Argument(String),

    // -------------------------------------------------------------------------
    // Traversal Errors
    // -------------------------------------------------------------------------
    #[error("Bucket nesting deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("Worker error: {0}")]
    Worker(String),
}

impl MonkeyError {
    /// Shorthand for an argument validation error
    pub fn argument(message: impl Into<String>) -> Self {
        MonkeyError::Argument(message.into())
    }

    /// Process exit code for this error.
    ///
    /// Argument validation errors use 2, the same code clap uses for usage
    /// errors. Everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            MonkeyError::Argument(_) => 2,
            _ => 1,
        }
    }
}

impl From<bincode::Error> for MonkeyError {
    fn from(e: bincode::Error) -> Self {
        MonkeyError::Serialization(e.to_string())
    }
}
