//! Error types for query building, transport and response mapping

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, SearchError>;

/// Every failure a search call can surface to the caller.
///
/// The variants are kept apart so callers can tell "fix the query" from
/// "retry the call" from "restart the scroll".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Malformed predicate or query parameters, caught before dispatch
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The engine rejected the request
    #[error("Server error: {status} - {reason}")]
    Server { status: u16, reason: String },

    /// Response did not have the expected shape
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Scroll continuation against a timed-out or unknown scroll token
    #[error("Scroll cursor expired: {0}")]
    CursorExpired(String),

    /// Invalid client settings
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SearchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }

    /// Whether the same request may succeed when sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Server { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {}", err))
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(SearchError::Transport("reset".into()).is_retryable());
        assert!(SearchError::Server {
            status: 503,
            reason: "unavailable".into()
        }
        .is_retryable());
        assert!(!SearchError::Server {
            status: 400,
            reason: "unknown field".into()
        }
        .is_retryable());
        assert!(!SearchError::invalid("bad range").is_retryable());
        assert!(!SearchError::CursorExpired("gone".into()).is_retryable());
    }
}
