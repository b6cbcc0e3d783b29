//! Secure key-value storage
//!
//! [`SecureStore`] is the seam to the platform secret store (Keychain,
//! Keystore, libsecret). [`LockedSecureStore`] adds encryption at rest with
//! the main key on top of any store.

use crate::security::{EncryptionAlgorithm, MasterKey};
use crate::{Error, Result};
use parking_lot::RwLock;
use pass_core::Locker;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

/// Secure key-value store
pub trait SecureStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Write a value
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store for tests and platforms without a native backend
#[derive(Default)]
pub struct MemorySecureStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemorySecureStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Store whose values are encrypted with a locker
pub struct LockedSecureStore<S, L> {
    store: S,
    locker: L,
}

impl<S: SecureStore, L: Locker> LockedSecureStore<S, L> {
    /// Wrap a store
    pub fn new(store: S, locker: L) -> Self {
        Self { store, locker }
    }

    /// Typed read
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Typed write
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, &serde_json::to_vec(value)?)
    }
}

impl<S: SecureStore, L: Locker> SecureStore for LockedSecureStore<S, L> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.store.get(key)? {
            Some(locked) => Ok(Some(self.locker.unlock(&locked)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let locked = self.locker.lock(value)?;
        self.store.set(key, &locked)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key)
    }
}

/// Loads or provisions the device main key
pub struct MainKeyProvider;

impl MainKeyProvider {
    /// Secure store entry holding the main key
    pub const MAIN_KEY: &'static str = "pass.main-key";

    /// Load the main key, generating and persisting one on first use
    pub fn load_or_create(store: &dyn SecureStore, algorithm: EncryptionAlgorithm) -> Result<MasterKey> {
        if let Some(bytes) = store.get(Self::MAIN_KEY)? {
            return MasterKey::from_bytes(&bytes, algorithm)
                .map_err(|_| Error::Encryption("Stored main key has an invalid length".to_string()));
        }
        let key = MasterKey::generate(algorithm);
        store.set(Self::MAIN_KEY, key.as_bytes())?;
        tracing::info!("Provisioned new main key");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        uid: String,
        access_token: String,
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySecureStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_locked_store_encrypts_at_rest() {
        let key = MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305);
        let locked = LockedSecureStore::new(MemorySecureStore::new(), key);
        let session = Session {
            uid: "uid-1".into(),
            access_token: "token".into(),
        };
        locked.set_json("session", &session).unwrap();
        assert_eq!(locked.get_json::<Session>("session").unwrap(), Some(session));

        let raw = locked.store.get("session").unwrap().unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("token"));
    }

    #[test]
    fn test_locked_store_wrong_key() {
        let store = MemorySecureStore::new();
        let writer = MasterKey::generate(EncryptionAlgorithm::AesGcm);
        store.set("k", &writer.encrypt(b"secret").unwrap()).unwrap();

        let reader = LockedSecureStore::new(store, MasterKey::generate(EncryptionAlgorithm::AesGcm));
        assert!(reader.get("k").is_err());
    }

    #[test]
    fn test_main_key_is_stable() {
        let store = MemorySecureStore::new();
        let first = MainKeyProvider::load_or_create(&store, EncryptionAlgorithm::AesGcm).unwrap();
        let second = MainKeyProvider::load_or_create(&store, EncryptionAlgorithm::AesGcm).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }
}
