//! Error types for the notequery system.

use thiserror::Error;

/// Unified error type for query compilation and execution.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Schema lookup on a tag that has no backend identity
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Filter operator token outside the supported set
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Query that cannot be compiled (e.g. no conditions)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Backend refused the structure of a submitted query
    #[error("Backend rejected query: {0}")]
    BackendRejected(String),

    /// Response envelope could not be interpreted
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Network or HTTP failure unrelated to query structure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryError {
    /// Whether this error should move the executor on to the next wire shape.
    pub fn is_rejection(&self) -> bool {
        matches!(self, QueryError::BackendRejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rejections_trigger_fallback() {
        assert!(QueryError::BackendRejected("bad kind".to_string()).is_rejection());
        assert!(!QueryError::Transport("connection reset".to_string()).is_rejection());
        assert!(!QueryError::TagNotFound("task".to_string()).is_rejection());
    }

    #[test]
    fn test_error_display() {
        let err = QueryError::UnsupportedOperator("~=".to_string());
        assert_eq!(err.to_string(), "Unsupported operator: ~=");
    }
}
