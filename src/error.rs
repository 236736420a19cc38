//! Error handling for QuadView-RS
//!
//! This module defines the application error type and a Result alias.
//! Expected, user-triggerable conditions (a too-short signal path, a file
//! with the wrong extension, a group without a timestamp array) are NOT
//! errors; the operations involved return sentinel values instead. The
//! variants here cover genuine I/O, parse and script failures.

use thiserror::Error;

/// Main error type for QuadView-RS operations
#[derive(Error, Debug)]
pub enum QuadViewError {
    /// Errors reported by the external MAT-file reader
    #[error("MAT-file error: {0}")]
    Mat(String),

    /// Errors related to app-state loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to custom-function script compilation/execution
    #[error("Script error: {0}")]
    Script(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<QuadViewError>,
    },
}

impl QuadViewError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        QuadViewError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        QuadViewError::Script(err.to_string())
    }
}

/// Result type alias for QuadView-RS operations
pub type Result<T> = std::result::Result<T, QuadViewError>;

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

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| QuadViewError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| QuadViewError::from_rhai_error(e).with_context(f()))
    }
}
