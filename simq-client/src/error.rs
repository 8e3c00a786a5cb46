//! Error types for the simq client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the research API
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Sign-in was refused, or the session could not be renewed
    #[error("Authentication failed (status {status}): {message}")]
    Authentication {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// The server is throttling requests
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Wait the server asked for, from `Retry-After`
        retry_after: Option<Duration>,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A header the protocol requires was absent
    #[error("Response is missing the {0} header")]
    MissingHeader(&'static str),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// The server refused the payload itself; sending it again cannot help
    pub fn is_rejected(&self) -> bool {
        match self {
            Self::ApiError { status, .. } => {
                self.is_client_error() && !matches!(status, 401 | 408 | 429)
            }
            Self::InvalidRequest(_) => true,
            _ => false,
        }
    }

    /// The response was unusable: malformed body or missing header
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::ParseError(_) | Self::MissingHeader(_))
    }

    /// The wait a throttling server asked for
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_excludes_throttling_and_auth() {
        assert!(ClientError::api_error(400, "bad expression").is_rejected());
        assert!(ClientError::api_error(404, "gone").is_rejected());
        assert!(!ClientError::api_error(401, "expired").is_rejected());
        assert!(!ClientError::api_error(429, "slow down").is_rejected());
        assert!(!ClientError::api_error(503, "busy").is_rejected());
    }

    #[test]
    fn test_rate_limited_is_not_rejected() {
        let err = ClientError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
            message: "slow down".to_string(),
        };
        assert!(!err.is_rejected());
        assert!(!err.is_protocol());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(ClientError::api_error(503, "busy").retry_after(), None);
    }

    #[test]
    fn test_protocol_errors() {
        assert!(ClientError::ParseError("eof".to_string()).is_protocol());
        assert!(ClientError::MissingHeader("Location").is_protocol());
        assert!(!ClientError::api_error(500, "oops").is_protocol());
    }

    #[test]
    fn test_status_classes() {
        assert!(ClientError::api_error(418, "teapot").is_client_error());
        assert!(!ClientError::api_error(500, "oops").is_client_error());
    }
}
