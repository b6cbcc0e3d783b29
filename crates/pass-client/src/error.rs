//! Error types for client operations

use pass_core::ErrorCategory;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure, timeout, rate limit or server error. Retryable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request rejected by the API
    #[error("API error {code} (HTTP {status}): {message}")]
    Api {
        /// HTTP status
        status: u16,
        /// API code
        code: i64,
        /// Server message
        message: String,
    },

    /// Revision mismatch reported by the server
    #[error("Revision conflict: {0}")]
    Conflict(String),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Domain error
    #[error(transparent)]
    Core(#[from] pass_core::Error),

    /// Local storage error
    #[error(transparent)]
    Storage(#[from] pass_storage_sqlite::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation cancelled
    #[error("Cancelled")]
    Cancelled,

    /// Background task failed
    #[error("Task error: {0}")]
    Task(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Task(e.to_string())
    }
}

impl Error {
    /// Whether the retry policy applies
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Revision conflict, from the server or from local reconciliation
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict(_) => true,
            Error::Core(e) => e.is_conflict(),
            Error::Storage(pass_storage_sqlite::Error::Core(e)) => e.is_conflict(),
            _ => false,
        }
    }

    /// Target does not exist remotely
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport(_) => ErrorCategory::Transport,
            Error::Api { .. } => ErrorCategory::Transport,
            Error::Conflict(_) => ErrorCategory::Conflict,
            Error::Decode(_) => ErrorCategory::Corruption,
            Error::Core(e) => e.category(),
            Error::Storage(e) => e.category(),
            Error::Config(_) | Error::Cancelled | Error::Task(_) => ErrorCategory::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        assert!(Error::Conflict("stale".into()).is_conflict());
        let core = pass_core::Error::Conflict {
            item_id: "a".into(),
            detail: "stale".into(),
        };
        assert!(Error::from(core).is_conflict());
        assert!(!Error::Transport("reset".into()).is_conflict());

        let missing = Error::Api {
            status: 404,
            code: 2001,
            message: "gone".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_conflict());
    }

    #[test]
    fn test_categories() {
        assert_eq!(Error::Transport("x".into()).category(), ErrorCategory::Transport);
        assert_eq!(Error::Conflict("x".into()).category(), ErrorCategory::Conflict);
        let corrupted = pass_core::Error::corrupted("ItemEntity", "content");
        assert_eq!(
            Error::Storage(corrupted.into()).category(),
            ErrorCategory::Corruption
        );
        assert!(Error::Transport("x".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }
}
