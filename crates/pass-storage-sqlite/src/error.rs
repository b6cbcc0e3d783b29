//! Error types

use pass_core::ErrorCategory;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Encryption error
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Domain error raised while mapping rows
    #[error(transparent)]
    Core(#[from] pass_core::Error),

    /// Storage error (generic)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Core(e) => e.category(),
            Error::Encryption(_) => ErrorCategory::Crypto,
            Error::Serialization(_) => ErrorCategory::Internal,
            Error::Database(_) | Error::Migration(_) | Error::NotFound(_) | Error::Storage(_) => {
                ErrorCategory::Storage
            }
        }
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
