//! Custom error types for export operations

use thiserror::Error;

/// Export-related errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// Document URL does not contain the expected path shape
    #[error("Invalid Onshape URL format: {url}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
    },

    /// API request returned a non-success status
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body, clipped
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Transport error description
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        /// What could not be parsed
        message: String,
    },

    /// The server reported the translation as failed
    #[error("Translation failed: {reason}")]
    TranslationFailed {
        /// Failure reason reported by the server
        reason: String,
    },

    /// The translation was still active after the last poll
    #[error("Translation timed out after {attempts} status checks")]
    PollTimeout {
        /// Status checks made
        attempts: u32,
    },

    /// The translation settled in a state other than DONE or FAILED
    #[error("Translation had unexpected state: {state}")]
    UnexpectedState {
        /// State string reported by the server
        state: String,
    },

    /// A finished translation produced nothing to download
    #[error("No result files available for download")]
    NoResults,

    /// Every result file of a finished translation failed to download or save
    #[error("All {failed} result files failed to download or save")]
    DownloadFailed {
        /// Number of result files that were attempted
        failed: usize,
    },

    /// The export worker pool shut down before a job could start
    #[error("Export worker pool error: {0}")]
    WorkerPool(#[from] tokio::sync::AcquireError),

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        /// File that could not be read or written
        path: String,
        /// Underlying IO error
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is misconfigured
        message: String,
    },

    /// Credential file or prompt error
    #[error("Credential error: {message}")]
    CredentialError {
        /// What went wrong
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ExportError {
    /// Build an [`ExportError::ApiError`], clipping long response bodies
    pub fn api(status: u16, body: &str) -> Self {
        const MAX_BODY: usize = 100;
        let message = match body.char_indices().nth(MAX_BODY) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        ExportError::ApiError { status, message }
    }

    /// Whether the server rejected the credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ExportError::ApiError { status: 401 | 403, .. })
    }
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_clips_long_body() {
        let body = "x".repeat(250);
        let err = ExportError::api(500, &body);
        match err {
            ExportError::ApiError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message.len(), 103);
                assert!(message.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_auth_failure_detection() {
        assert!(ExportError::api(401, "Unauthenticated").is_auth_failure());
        assert!(ExportError::api(403, "").is_auth_failure());
        assert!(!ExportError::api(404, "").is_auth_failure());
        assert!(!ExportError::NoResults.is_auth_failure());
    }

    #[tokio::test]
    async fn test_closed_worker_pool_is_its_own_error() {
        let pool = std::sync::Arc::new(tokio::sync::Semaphore::new(1));
        pool.close();

        let err = ExportError::from(pool.acquire_owned().await.unwrap_err());

        assert!(matches!(err, ExportError::WorkerPool(_)));
        assert!(err.to_string().starts_with("Export worker pool error"));
        assert!(!err.is_auth_failure());
    }
}
