//! Proton Pass item and vault core
//!
//! This crate implements the end-to-end encrypted item model: the key
//! hierarchy, the item envelope codec, item content, revisions and batch
//! reconciliation. It is pure and does no I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod armor;
pub mod batch;
pub mod content;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod item;
pub mod keys;
pub mod requests;
pub mod revision;
pub mod share;

#[cfg(any(test, feature = "test-helpers"))]
pub mod fixtures;

pub use batch::{chunked, BatchOutcome, FailedItem, FailureReason, MAX_BATCH_SIZE};
pub use content::{ItemContent, ItemContentType, VaultContent};
pub use envelope::{decrypt_item, encrypt_item, EnvelopeFields, OpenKeys, SealedEnvelope, CONTENT_FORMAT_VERSION};
pub use error::{CryptoFailure, Error, ErrorCategory, Result};
pub use item::{Locker, SymmetricallyEncryptedItem};
pub use keys::{
    AddressKey, ItemKey, PrivateKey, PublicKey, ShareKeys, UnlockedItemKey, UnlockedVaultKey, VaultKey,
};
pub use requests::{CreateItemRequest, TrashItemsRequest, UpdateItemRequest};
pub use revision::{ItemAction, ItemRevision, ItemRevisionList, ItemRevisionRef, ItemState, ItemTransition, ModifiedItem};
pub use share::{Share, TargetType};
