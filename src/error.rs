//! Error handling for the log pipeline.
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for log pipeline operations
#[derive(Error, Debug)]
pub enum LogPipeError {
    /// A frame prefix or length that cannot be parsed. Fatal unless robust
    /// parsing is enabled, which downgrades it to a filtered `BAD_DATA` span.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A payload the codec could not decode (always fatal).
    #[error("Decode error: {0}")]
    Decode(String),

    /// Errors in the resolved run configuration, reported before any frame
    /// is processed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LogPipeError>,
    },
}

impl LogPipeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LogPipeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for log pipeline operations
pub type Result<T> = std::result::Result<T, LogPipeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
