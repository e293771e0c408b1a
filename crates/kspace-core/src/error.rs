//! Error types for the k-space pipeline

use std::io;
use thiserror::Error;

use crate::axis::CoreAxis;
use crate::config::ConfigError;

/// Result type for k-space operations
pub type KspaceResult<T> = Result<T, KspaceError>;

/// Errors that can occur anywhere in the synthesis / codec / reconstruction pipeline.
///
/// Every variant is terminal for the operation that produced it. Nothing is
/// retried internally and no partially-built tensor or file is handed back.
#[derive(Error, Debug)]
pub enum KspaceError {
    /// File create/read/write failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required header field is missing or cannot be parsed
    #[error("Malformed header field '{field}': {reason}")]
    MalformedHeader { field: String, reason: String },

    /// Sample body shorter than the header declares
    #[error("Truncated data: header declares {expected} body bytes, only {actual} available")]
    TruncatedData { expected: usize, actual: usize },

    /// A required axis is absent from a template, or matched more than once
    #[error("Cannot resolve {axis} axis: {reason}")]
    AxisResolution { axis: CoreAxis, reason: String },

    /// Template extent differs from the supplied extent
    #[error("{axis} mismatch: template requires {expected}, supplied {actual}")]
    ShapeMismatch {
        axis: String,
        expected: usize,
        actual: usize,
    },

    /// Tensor or image dimensions are unusable (zero extent, wrong buffer length, ...)
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Reference image could not be decoded
    #[error("Reference image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl KspaceError {
    pub(crate) fn malformed(field: &str, reason: impl Into<String>) -> Self {
        KspaceError::MalformedHeader {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape_mismatch(axis: impl ToString, expected: usize, actual: usize) -> Self {
        KspaceError::ShapeMismatch {
            axis: axis.to_string(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message_names_both_values() {
        let err = KspaceError::shape_mismatch(CoreAxis::Channel, 4, 3);
        let msg = err.to_string();
        assert!(msg.contains("Channel"), "{}", msg);
        assert!(msg.contains("requires 4"), "{}", msg);
        assert!(msg.contains("supplied 3"), "{}", msg);
    }

    #[test]
    fn test_io_error_converts() {
        let err: KspaceError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, KspaceError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
