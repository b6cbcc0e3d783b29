//! Error types for Pass Core
//!
//! Error taxonomy for key resolution, envelope coding and item state transitions.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Cryptographic failure reasons.
///
/// Decoding failures (`FailedToDecode`, `FailedToUnarmor`) mean the input is
/// malformed. `FailedToVerifySignature` means the input is well formed but
/// was not produced by the expected signer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoFailure {
    /// Base64 decoding of a field failed
    #[error("Failed to decode {0}")]
    FailedToDecode(String),

    /// Armor header/footer or body could not be stripped
    #[error("Failed to unarmor {0}")]
    FailedToUnarmor(String),

    /// Armoring failed
    #[error("Failed to armor {0}")]
    FailedToArmor(String),

    /// Encryption failed
    #[error("Failed to encrypt")]
    FailedToEncrypt,

    /// Authenticated decryption of a data packet failed
    #[error("Failed to decrypt content")]
    FailedToDecryptContent,

    /// Signature did not verify
    #[error("Failed to verify signature {0}")]
    FailedToVerifySignature(String),

    /// Session key generation failed
    #[error("Failed to generate session key")]
    FailedToGenerateSessionKey,

    /// Session key could not be unwrapped from the vault key packet
    #[error("Failed to unwrap session key")]
    FailedToUnwrapSessionKey,

    /// Locked private key could not be opened with its passphrase
    #[error("Failed to unlock key")]
    FailedToUnlockKey,
}

/// Pass Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field is missing from a persisted or wire object
    #[error("Corrupted {object}: missing value for {property}")]
    Corrupted {
        /// Owning object type, e.g. `ItemEntity`
        object: String,
        /// Missing or invalid field
        property: String,
    },

    /// Vault keys and item keys of a share disagree
    #[error("ItemKeys & VaultKeys are not synced for share with ID {0}")]
    CorruptedShareKeys(String),

    /// Locally re-encrypted content could not be opened
    #[error("Corrupted encrypted content")]
    CorruptedEncryptedContent,

    /// Key material failed its signature check
    #[error("Corrupted key: {0}")]
    CorruptedKey(String),

    /// Cryptographic failure
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoFailure),

    /// Rotation is not known locally
    #[error("Key not found for share \"{share_id}\" rotation ID \"{rotation_id}\"")]
    KeyNotFound {
        /// Share ID
        share_id: String,
        /// Rotation ID
        rotation_id: String,
    },

    /// Share has no keys at all
    #[error("Vault key not found for share \"{0}\"")]
    VaultKeyNotFound(String),

    /// Two keys expected to be of the same rotation are not
    #[error("Unmatched rotation IDs \"{left}\" & \"{right}\"")]
    UnmatchedRotationId {
        /// First rotation ID
        left: String,
        /// Second rotation ID
        right: String,
    },

    /// Revision mismatch
    #[error("Revision conflict for item {item_id}: {detail}")]
    Conflict {
        /// Item ID
        item_id: String,
        /// What did not match
        detail: String,
    },

    /// State transition not allowed from the current state
    #[error("Invalid transition for item {item_id}: cannot {action} from {from}")]
    InvalidTransition {
        /// Item ID
        item_id: String,
        /// Current state
        from: String,
        /// Requested action
        action: String,
    },

    /// Unknown item state integer
    #[error("Unknown item state: {0}")]
    UnknownState(i64),

    /// Unknown share target type
    #[error("Unknown share type: {0}")]
    UnknownShareType(i64),

    /// Protobuf content could not be decoded
    #[error("Invalid item content: {0}")]
    InvalidContent(#[from] prost::DecodeError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a named missing field
    pub fn corrupted(object: impl Into<String>, property: impl Into<String>) -> Self {
        Error::Corrupted {
            object: object.into(),
            property: property.into(),
        }
    }

    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Conflict { .. } | Error::InvalidTransition { .. }
        )
    }

    /// Check if error is a revision conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Conflict { .. } => {
                "This item was modified on another device. Refresh and try again.".to_string()
            }
            Error::InvalidTransition { action, from, .. } => {
                format!("This item cannot be {} while it is {}.", past_tense(action), from.to_lowercase())
            }
            Error::Crypto(_) | Error::CorruptedKey(_) => {
                "This item could not be verified and was hidden.".to_string()
            }
            Error::Corrupted { .. }
            | Error::CorruptedShareKeys(_)
            | Error::CorruptedEncryptedContent => {
                "Local data is damaged. A full sync is required.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Corrupted { .. }
            | Error::CorruptedShareKeys(_)
            | Error::CorruptedEncryptedContent => ErrorCategory::Corruption,
            Error::Crypto(_) | Error::InvalidContent(_) => ErrorCategory::Crypto,
            Error::CorruptedKey(_)
            | Error::KeyNotFound { .. }
            | Error::VaultKeyNotFound(_)
            | Error::UnmatchedRotationId { .. } => ErrorCategory::Keys,
            Error::Conflict { .. } | Error::InvalidTransition { .. } => ErrorCategory::Conflict,
            Error::UnknownState(_) | Error::UnknownShareType(_) => ErrorCategory::Corruption,
            Error::Serialization(_) | Error::Other(_) => ErrorCategory::Internal,
        }
    }
}

fn past_tense(action: &str) -> &str {
    match action {
        "trash" => "trashed",
        "untrash" => "restored",
        "delete" => "deleted",
        other => other,
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Required data missing or malformed
    Corruption,
    /// Decode, unarmor or signature failure
    Crypto,
    /// Key resolution or key trust failure
    Keys,
    /// Revision mismatch or illegal state transition
    Conflict,
    /// Network failure
    Transport,
    /// Local database failure
    Storage,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Corruption => write!(f, "Corruption"),
            ErrorCategory::Crypto => write!(f, "Crypto"),
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Conflict => write!(f, "Conflict"),
            ErrorCategory::Transport => write!(f, "Transport"),
            ErrorCategory::Storage => write!(f, "Storage"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupted_names_field() {
        let err = Error::corrupted("ItemEntity", "rotationID");
        assert_eq!(
            err.to_string(),
            "Corrupted ItemEntity: missing value for rotationID"
        );
        assert_eq!(err.category(), ErrorCategory::Corruption);
    }

    #[test]
    fn test_crypto_failures_are_distinct() {
        let garbage = Error::from(CryptoFailure::FailedToDecode("content".into()));
        let tampered = Error::from(CryptoFailure::FailedToVerifySignature("userSignature".into()));
        assert_eq!(garbage.category(), ErrorCategory::Crypto);
        assert_eq!(tampered.category(), ErrorCategory::Crypto);
        assert!(garbage.to_string().contains("decode content"));
        assert!(tampered.to_string().contains("verify signature userSignature"));
    }

    #[test]
    fn test_conflict_detection() {
        let err = Error::Conflict {
            item_id: "item".into(),
            detail: "expected 2, got 3".into(),
        };
        assert!(err.is_conflict());
        assert!(err.is_user_error());
        assert!(err.user_message().contains("another device"));
        assert!(!Error::CorruptedEncryptedContent.is_conflict());
    }

    #[test]
    fn test_transition_message() {
        let err = Error::InvalidTransition {
            item_id: "a".into(),
            from: "Active".into(),
            action: "delete".into(),
        };
        assert_eq!(err.user_message(), "This item cannot be deleted while it is active.");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Corruption.to_string(), "Corruption");
        assert_eq!(ErrorCategory::Conflict.to_string(), "Conflict");
        assert_eq!(ErrorCategory::Transport.to_string(), "Transport");
    }
}
