//! Error handling for flowmesh
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the library. Cancellation is deliberately absent: a cancelled
//! computation resolves to [`crate::pipeline::MeshOutcome::Cancelled`].

use thiserror::Error;

/// Main error type for flowmesh operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// Grid buffer length does not match its declared shape
    #[error("Shape mismatch: expected {expected} floats for {columns}x{rows} grid, got {actual}")]
    ShapeMismatch {
        columns: usize,
        rows: usize,
        expected: usize,
        actual: usize,
    },

    /// A numeric parameter is outside its valid range
    #[error("Invalid parameter `{name}`: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// The delegated worker could not accept the request
    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// The delegated worker went away before replying
    #[error("Worker crashed before replying to job {0}")]
    WorkerCrashed(u64),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowError>,
    },
}

impl FlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for [`FlowError::InvalidParameter`]
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        FlowError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Result type alias for flowmesh operations
pub type Result<T> = std::result::Result<T, FlowError>;

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

/// Check that `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FlowError::invalid(
            name,
            format!("must be finite and > 0, got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let err = FlowError::ShapeMismatch {
            columns: 4,
            rows: 4,
            expected: 32,
            actual: 30,
        };
        let msg = err.to_string();
        assert!(msg.contains("4x4"));
        assert!(msg.contains("32"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_error_with_context() {
        let err = FlowError::Config("bad sigma".to_string());
        let with_ctx = err.with_context("Failed to load config");
        assert!(with_ctx.to_string().contains("Failed to load config"));
        assert!(with_ctx.to_string().contains("bad sigma"));
    }

    #[test]
    fn test_result_ext_context() {
        let res: Result<()> = Err(FlowError::WorkerCrashed(7));
        let err = res.context("delegated compute").unwrap_err();
        assert!(matches!(err, FlowError::WithContext { .. }));
        assert!(err.to_string().contains("job 7"));
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("sigma", 1.0).is_ok());
        assert!(ensure_positive("sigma", 0.0).is_err());
        assert!(ensure_positive("sigma", -2.0).is_err());
        assert!(ensure_positive("sigma", f32::NAN).is_err());
        assert!(ensure_positive("sigma", f32::INFINITY).is_err());
    }
}
