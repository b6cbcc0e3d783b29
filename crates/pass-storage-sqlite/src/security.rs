//! Main key and passphrase derivation
//!
//! The main key re-encrypts item content and secure-store values on the
//! device. Database pages are encrypted separately by SQLCipher with a key
//! derived by [`derive_key_bytes`].

use crate::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Argon2, ParamsBuilder, Version};
use chacha20poly1305::ChaCha20Poly1305;
use pass_core::{CryptoFailure, Locker};
use rand::RngCore;
use zeroize::Zeroizing;

const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 2 + 12;

/// Argon2id parameters for the database key: m_cost (KiB), t_cost, p_cost
pub const DATABASE_KDF_PARAMS: (u32, u32, u32) = (65536, 3, 4);

/// Encryption algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    /// AES-256-GCM
    AesGcm,
    /// ChaCha20-Poly1305
    ChaCha20Poly1305,
}

impl EncryptionAlgorithm {
    fn tag(self) -> u8 {
        match self {
            EncryptionAlgorithm::AesGcm => 0,
            EncryptionAlgorithm::ChaCha20Poly1305 => 1,
        }
    }
}

/// Device main key
#[derive(Clone)]
pub struct MasterKey {
    key: Zeroizing<[u8; 32]>,
    algorithm: EncryptionAlgorithm,
}

impl MasterKey {
    /// Generate new random main key
    pub fn generate(algorithm: EncryptionAlgorithm) -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut key[..]);
        Self { key, algorithm }
    }

    /// Create from bytes
    pub fn from_bytes(bytes: &[u8], algorithm: EncryptionAlgorithm) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(Error::Encryption("Invalid key length".to_string()));
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(bytes);
        Ok(Self { key, algorithm })
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Algorithm new ciphertexts are written with
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    /// Encrypt data
    ///
    /// Format: `[version(1)][algorithm(1)][nonce(12)][ciphertext]`
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = match self.algorithm {
            EncryptionAlgorithm::AesGcm => Aes256Gcm::new(self.key.as_ref().into())
                .encrypt(Nonce::from_slice(&nonce_bytes), plaintext),
            EncryptionAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new(self.key.as_ref().into())
                .encrypt(chacha20poly1305::Nonce::from_slice(&nonce_bytes), plaintext),
        }
        .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut result = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        result.push(FORMAT_VERSION);
        result.push(self.algorithm.tag());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by [`MasterKey::encrypt`]
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < HEADER_LEN {
            return Err(Error::Encryption("Invalid ciphertext length".to_string()));
        }
        let version = data[0];
        if version != FORMAT_VERSION {
            return Err(Error::Encryption(format!("Unsupported encryption version: {}", version)));
        }

        let nonce = &data[2..HEADER_LEN];
        let ciphertext = &data[HEADER_LEN..];
        // The header names the algorithm, so data written before a switch stays readable.
        match data[1] {
            0 => Aes256Gcm::new(self.key.as_ref().into()).decrypt(Nonce::from_slice(nonce), ciphertext),
            1 => ChaCha20Poly1305::new(self.key.as_ref().into())
                .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext),
            other => return Err(Error::Encryption(format!("Unknown algorithm: {}", other))),
        }
        .map_err(|e| Error::Encryption(e.to_string()))
    }
}

impl Locker for MasterKey {
    fn lock(&self, plaintext: &[u8]) -> pass_core::Result<Vec<u8>> {
        self.encrypt(plaintext)
            .map_err(|_| CryptoFailure::FailedToEncrypt.into())
    }

    fn unlock(&self, data: &[u8]) -> pass_core::Result<Vec<u8>> {
        self.decrypt(data)
            .map_err(|_| CryptoFailure::FailedToDecryptContent.into())
    }
}

/// Derive raw key bytes from passphrase using Argon2id.
pub fn derive_key_bytes(passphrase: &str, salt: &[u8]) -> Result<[u8; 32]> {
    if salt.len() < 16 {
        return Err(Error::Encryption("Salt too short".to_string()));
    }

    let params = ParamsBuilder::new()
        .m_cost(DATABASE_KDF_PARAMS.0)
        .t_cost(DATABASE_KDF_PARAMS.1)
        .p_cost(DATABASE_KDF_PARAMS.2)
        .output_len(32)
        .build()
        .map_err(|e| Error::Encryption(e.to_string()))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut *key)
        .map_err(|e| Error::Encryption(e.to_string()))?;

    let mut out = [0u8; 32];
    out.copy_from_slice(&key[..]);
    Ok(out)
}

/// Generate random salt
pub fn generate_salt() -> [u8; 32] {
    let mut salt = [0u8; 32];
    OsRng.fill_bytes(&mut salt);
    salt
}
