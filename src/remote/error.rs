//! Remote client error types

use thiserror::Error;

/// Errors that can occur talking to the device cloud
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Parse(String),
}

/// Check if an HTTP status code is worth an immediate retry
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

impl RemoteError {
    /// Check if this error is transient
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::Api { status, .. } => is_retryable_status(*status),
            RemoteError::Parse(_) => false,
            RemoteError::Credentials(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        // 5xx and throttling errors should be retryable
        assert!(
            RemoteError::Api {
                status: 500,
                message: "Server error".to_string()
            }
            .is_retryable()
        );

        assert!(
            RemoteError::Api {
                status: 429,
                message: "Slow down".to_string()
            }
            .is_retryable()
        );

        // 4xx errors should not be retryable
        assert!(
            !RemoteError::Api {
                status: 404,
                message: "No such job".to_string()
            }
            .is_retryable()
        );

        // A malformed payload will stay malformed
        assert!(!RemoteError::Parse("bad JSON".to_string()).is_retryable());

        // Missing credentials never recover on retry
        assert!(!RemoteError::Credentials("SAUCE_ACCESS_KEY".to_string()).is_retryable());
    }

    #[test]
    fn test_retryable_status_codes() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(408));
        assert!(!is_retryable_status(200));
        assert!(!is_retryable_status(401));
    }
}
