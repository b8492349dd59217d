//! Error types for the CTR pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the CTR pipeline.
///
/// Data-level anomalies (unresolvable click positions, unseen items) never
/// surface here; they travel in-band as sentinels. Only usage errors and
/// malformed inputs do.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    // Input errors (20-29)
    #[error("unknown event type: {0:?}")]
    UnknownEventType(String),

    #[error("invalid position {0}: must be -1 or >= 1")]
    InvalidPosition(i64),

    // Estimator errors (30-39)
    #[error("estimator used before fit")]
    NotFitted,

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::SchemaValidation(_) => 11,
            Error::UnknownEventType(_) => 20,
            Error::InvalidPosition(_) => 21,
            Error::NotFitted => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Whether this error signals a broken call sequence rather than bad data.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::NotFitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_grouped_by_category() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::UnknownEventType("view".into()).code(), 20);
        assert_eq!(Error::NotFitted.code(), 30);
    }

    #[test]
    fn not_fitted_is_usage_error() {
        assert!(Error::NotFitted.is_usage_error());
        assert!(!Error::InvalidPosition(0).is_usage_error());
    }

    #[test]
    fn display_messages() {
        assert_eq!(Error::NotFitted.to_string(), "estimator used before fit");
        assert_eq!(
            Error::UnknownEventType("view".into()).to_string(),
            "unknown event type: \"view\""
        );
    }
}
