//! Error types for the backend client.

use thiserror::Error;

use notequery_types::QueryError;

/// Errors that can occur talking to the backend over HTTP.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Backend refused the request as malformed (400, 404, 422)
    #[error("Request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Backend asked us to slow down (429)
    #[error("Rate limited by backend")]
    RateLimited,

    /// Backend failed internally (5xx)
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Any other non-success status
    #[error("HTTP error ({status}): {body}")]
    Http { status: u16, body: String },

    /// Failed to reach the backend
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Response value has the wrong shape for the call
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be built from its configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::RateLimited | ClientError::Server { .. } | ClientError::Connection(_)
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Connection(e.to_string())
    }
}

impl From<ClientError> for QueryError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Rejected { .. } => QueryError::BackendRejected(e.to_string()),
            ClientError::InvalidResponse(msg) => QueryError::MalformedResponse(msg),
            ClientError::Config(msg) => QueryError::Config(msg),
            other => QueryError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ClientError::RateLimited.is_transient());
        assert!(ClientError::Connection("reset".to_string()).is_transient());
        assert!(ClientError::Server {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!ClientError::Rejected {
            status: 400,
            body: String::new()
        }
        .is_transient());
        assert!(!ClientError::Http {
            status: 401,
            body: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_rejection_maps_to_backend_rejected() {
        let err: QueryError = ClientError::Rejected {
            status: 422,
            body: "unknown kind 106".to_string(),
        }
        .into();
        assert!(err.is_rejection());
        assert!(err.to_string().contains("unknown kind 106"));
    }

    #[test]
    fn test_other_errors_map_to_transport() {
        let err: QueryError = ClientError::RateLimited.into();
        assert!(matches!(err, QueryError::Transport(_)));

        let err: QueryError = ClientError::InvalidResponse("bad id".to_string()).into();
        assert!(matches!(err, QueryError::MalformedResponse(_)));
    }
}
