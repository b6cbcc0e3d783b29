//! Encrypted SQLite cache for Pass items
//!
//! Provides an encrypted-at-rest database with WAL mode and migrations,
//! row mapping that names missing fields, and main-key storage.
//!
//! ## Layers
//!
//! - **Database Encryption**: SQLCipher page encryption with an Argon2id-derived key
//! - **Content Re-encryption**: item content sealed with the device main key
//! - **Secure Store**: platform secret store behind a trait, optionally locked

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod encryption;
pub mod error;
pub mod feature_flags;
pub mod items;
pub mod keys;
pub mod migrations;
pub mod models;
pub mod secure_store;
pub mod security;
pub mod shares;

pub use database::Database;
pub use encryption::EncryptionKey;
pub use error::{Error, Result};
pub use feature_flags::FeatureFlagStorage;
pub use items::ItemStorage;
pub use keys::KeyStorage;
pub use models::{ItemRow, KeyRow, ShareRow};
pub use secure_store::{LockedSecureStore, MainKeyProvider, MemorySecureStore, SecureStore};
pub use security::{derive_key_bytes, generate_salt, EncryptionAlgorithm, MasterKey};
pub use shares::ShareStorage;
