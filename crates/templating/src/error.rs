//! Error types for template resolution and rendering.
//!
//! This module provides [`TemplatingError`], the single error type returned by
//! every registry and render operation. Domain failures carry the offending
//! name as structured data; collaborator failures (file reads, producers,
//! engines) pass through untouched so their message and `source()` chain
//! reach the caller as-is.

use std::time::Duration;

use thiserror::Error;

/// Boxed error used for failures raised by producers and engines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TemplatingError>;

/// Error type for templating operations.
#[derive(Debug, Error)]
pub enum TemplatingError {
    /// An engine candidate was rejected at registration time.
    ///
    /// The engine registry is left unchanged.
    #[error("the engine registered as \"{name}\" is not a valid engine: {reason}")]
    InvalidEngine {
        /// Name the engine was being registered under
        name: String,
        /// Why the candidate was rejected
        reason: String,
    },

    /// A resolved template declares an engine that is not registered.
    #[error("unknown templating engine \"{name}\"")]
    UnknownEngine {
        /// The engine name declared by the template source
        name: String,
    },

    /// No source is registered under the requested template name.
    #[error("unknown template \"{name}\"")]
    UnknownTemplate {
        /// The template name that was requested
        name: String,
    },

    /// The blocking nested-load bridge gave up waiting for resolution.
    #[error("timed out after {timeout:?} while waiting for template \"{name}\"")]
    LoadTimeout {
        /// The template name being loaded
        name: String,
        /// The wall-clock budget that was exhausted
        timeout: Duration,
    },

    /// Render arguments did not serialize to a mapping.
    #[error("render arguments must serialize to a map: {reason}")]
    InvalidArguments {
        /// Description of what was received instead
        reason: String,
    },

    /// Reading a file-backed template failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A producer-backed template failed to supply its code.
    #[error(transparent)]
    Producer(BoxError),

    /// The engine reported a failure while rendering.
    #[error(transparent)]
    Engine(BoxError),

    /// Render arguments could not be serialized.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl TemplatingError {
    pub(crate) fn invalid_engine(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TemplatingError::InvalidEngine {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_engine(name: impl Into<String>) -> Self {
        TemplatingError::UnknownEngine { name: name.into() }
    }

    pub(crate) fn unknown_template(name: impl Into<String>) -> Self {
        TemplatingError::UnknownTemplate { name: name.into() }
    }

    /// Wraps an engine-internal failure.
    pub fn engine(err: impl Into<BoxError>) -> Self {
        TemplatingError::Engine(err.into())
    }

    /// Returns true if this is an [`UnknownTemplate`](Self::UnknownTemplate) error.
    pub fn is_unknown_template(&self) -> bool {
        matches!(self, TemplatingError::UnknownTemplate { .. })
    }

    /// Returns true if this is an [`UnknownEngine`](Self::UnknownEngine) error.
    pub fn is_unknown_engine(&self) -> bool {
        matches!(self, TemplatingError::UnknownEngine { .. })
    }

    /// Returns true if this is a [`LoadTimeout`](Self::LoadTimeout) error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TemplatingError::LoadTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display_carries_name() {
        let err = TemplatingError::unknown_template("foo");
        assert_eq!(err.to_string(), "unknown template \"foo\"");

        let err = TemplatingError::unknown_engine("jade");
        assert!(err.to_string().contains("jade"));
    }

    #[test]
    fn test_io_error_passes_through() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TemplatingError = io_err.into();
        assert!(matches!(err, TemplatingError::Io(_)));
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err = TemplatingError::engine("syntax error at line 1");
        assert_eq!(err.to_string(), "syntax error at line 1");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_timeout_is_distinct_from_unknown_template() {
        let err = TemplatingError::LoadTimeout {
            name: "slow".into(),
            timeout: Duration::from_millis(10),
        };
        assert!(err.is_timeout());
        assert!(!err.is_unknown_template());
    }
}
