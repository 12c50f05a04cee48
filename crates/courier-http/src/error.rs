//! HTTP client error types

use std::time::Duration;

use thiserror::Error;

use crate::response::Payload;

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// HTTP client errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network request failed
    #[error("Network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Request cancelled through the client's abort signal
    #[error("Request aborted{}", abort_suffix(.reason))]
    Aborted { reason: Option<String> },

    /// Non-success HTTP status, carrying the decoded body
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: Payload },

    /// Response body could not be decoded
    #[error("{0}")]
    Decode(String),

    /// Request data could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Unsupported HTTP method
    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(String),

    /// Invalid header name or value
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Client build error
    #[error("Failed to build HTTP client: {0}")]
    BuildError(String),

    /// Raised by a user-supplied interceptor
    #[error("Interceptor error: {0}")]
    Interceptor(String),
}

impl HttpError {
    /// Check if the request was cancelled, either by its timeout or by `abort`
    pub fn is_cancellation(&self) -> bool {
        matches!(self, HttpError::Timeout(_) | HttpError::Aborted { .. })
    }

    /// Check if the error happened while talking to the network
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::RequestFailed(_)) || self.is_cancellation()
    }

    /// HTTP status code, for status errors
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Decoded body of a status error
    pub fn body(&self) -> Option<&Payload> {
        match self {
            HttpError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Shorthand for raising an error from inside an interceptor
    pub fn interceptor(message: impl Into<String>) -> Self {
        HttpError::Interceptor(message.into())
    }
}

fn abort_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_includes_body() {
        let error = HttpError::Status {
            status: 404,
            body: Payload::Text("Not Found".to_string()),
        };
        assert_eq!(error.to_string(), "HTTP 404: Not Found");
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn test_aborted_display() {
        let error = HttpError::Aborted {
            reason: Some("cancelled".to_string()),
        };
        assert_eq!(error.to_string(), "Request aborted: cancelled");

        let error = HttpError::Aborted { reason: None };
        assert_eq!(error.to_string(), "Request aborted");
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(HttpError::Timeout(Duration::from_millis(50)).is_cancellation());
        assert!(HttpError::Aborted { reason: None }.is_cancellation());
        assert!(!HttpError::Decode("bad".to_string()).is_cancellation());
        assert!(!HttpError::InvalidUrl("bad".to_string()).is_transport());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let http_error: HttpError = err.into();
        assert!(matches!(http_error, HttpError::Serialization(_)));
    }
}
