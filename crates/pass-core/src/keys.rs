//! Key hierarchy
//!
//! ```text
//! AddressKey ──signs──> VaultKey.keySignature, ItemKey.keySignature
//!      └─seals─> VaultKey.keyPassphrase
//! VaultKey ───seals──> ItemKey.keyPassphrase, item content session keys
//! ItemKey ────signs──> itemKeySignature, vaultKeyPacketSignature
//! ```
//!
//! Every key is a pair of an Ed25519 signing key and an X25519 encryption key.
//! Vault and item keys are stored locked with a random passphrase. A key is
//! only trusted after its `keySignature` verifies against the issuing address.

use crate::armor::{self, ArmorKind};
use crate::crypto::{open_message, open_with_key, random_bytes, seal_message, seal_with_key};
use crate::error::{CryptoFailure, Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

const LOCKED_KEY_VERSION: u8 = 1;
const LOCK_SALT_LEN: usize = 16;
const PUBLIC_KEY_LEN: usize = 64;

/// Argon2id parameters for key locking: m_cost (KiB), t_cost, p_cost.
/// Lock passphrases are 32 random bytes, so these stay light.
const KEY_LOCK_PARAMS: (u32, u32, u32) = (4096, 1, 1);

/// Public half of a Pass key pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    verifying: VerifyingKey,
    encryption: X25519PublicKey,
}

impl PublicKey {
    /// Serialize as `verifying(32) || encryption(32)`
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out[..32].copy_from_slice(self.verifying.as_bytes());
        out[32..].copy_from_slice(self.encryption.as_bytes());
        out
    }

    /// Parse from `verifying(32) || encryption(32)`
    pub fn from_bytes(bytes: &[u8], field: &str) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(CryptoFailure::FailedToUnarmor(field.to_string()).into());
        }
        let mut verifying = [0u8; 32];
        verifying.copy_from_slice(&bytes[..32]);
        let mut encryption = [0u8; 32];
        encryption.copy_from_slice(&bytes[32..]);

        let verifying = VerifyingKey::from_bytes(&verifying)
            .map_err(|_| CryptoFailure::FailedToUnarmor(field.to_string()))?;
        Ok(Self {
            verifying,
            encryption: X25519PublicKey::from(encryption),
        })
    }

    /// Armored public key
    pub fn armored(&self) -> String {
        armor::armor(ArmorKind::PublicKey, &self.to_bytes())
    }

    /// Parse an armored public key
    pub fn from_armored(armored: &str, field: &str) -> Result<Self> {
        let bytes = armor::unarmor(ArmorKind::PublicKey, armored, field)?;
        Self::from_bytes(&bytes, field)
    }

    /// Lowercase hex SHA-256 of the serialized public key
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.to_bytes()))
    }

    /// X25519 key that session keys are wrapped to
    pub fn encryption_key(&self) -> &X25519PublicKey {
        &self.encryption
    }

    /// Verify a detached Ed25519 signature. `field` names the signature.
    pub fn verify(&self, message: &[u8], signature: &[u8], field: &str) -> Result<()> {
        let fail = || CryptoFailure::FailedToVerifySignature(field.to_string());
        let signature = Signature::from_slice(signature).map_err(|_| fail())?;
        self.verifying
            .verify(message, &signature)
            .map_err(|_| fail().into())
    }
}

/// Private Pass key pair
#[derive(Clone)]
pub struct PrivateKey {
    signing: SigningKey,
    encryption: StaticSecret,
}

impl PrivateKey {
    /// Generate a random key pair
    pub fn generate() -> Self {
        Self::from_seeds(&random_bytes(), &random_bytes())
    }

    /// Build from 32-byte seeds
    pub fn from_seeds(signing_seed: &[u8; 32], encryption_seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(signing_seed),
            encryption: StaticSecret::from(*encryption_seed),
        }
    }

    /// Public half
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying: self.signing.verifying_key(),
            encryption: X25519PublicKey::from(&self.encryption),
        }
    }

    /// Detached Ed25519 signature
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing.sign(message).to_bytes().to_vec()
    }

    /// Decrypt a message sealed to this key
    pub fn open(&self, message: &[u8]) -> Result<Vec<u8>> {
        open_message(message, &self.encryption)
    }

    pub(crate) fn encryption_secret(&self) -> &StaticSecret {
        &self.encryption
    }

    fn seeds(&self) -> Zeroizing<[u8; 64]> {
        let mut out = Zeroizing::new([0u8; 64]);
        out[..32].copy_from_slice(&self.signing.to_bytes());
        out[32..].copy_from_slice(self.encryption.as_bytes());
        out
    }

    /// Lock with a passphrase and armor.
    ///
    /// Body: `[version(1)][public(64)][salt(16)][nonce(12)][sealed seeds]`.
    /// The public part stays readable so the key can be fingerprinted
    /// before it is unlocked.
    pub fn lock(&self, passphrase: &str) -> Result<String> {
        let salt: [u8; LOCK_SALT_LEN] = random_bytes();
        let lock_key = derive_lock_key(passphrase, &salt)?;
        let seeds = self.seeds();
        let sealed = seal_with_key(&lock_key, &seeds[..])?;

        let mut body = Vec::with_capacity(1 + PUBLIC_KEY_LEN + LOCK_SALT_LEN + sealed.len());
        body.push(LOCKED_KEY_VERSION);
        body.extend_from_slice(&self.public_key().to_bytes());
        body.extend_from_slice(&salt);
        body.extend_from_slice(&sealed);
        Ok(armor::armor(ArmorKind::PrivateKey, &body))
    }

    /// Unlock an armored key produced by [`PrivateKey::lock`]
    pub fn unlock(armored: &str, passphrase: &str, field: &str) -> Result<Self> {
        let locked = LockedKey::parse(armored, field)?;
        let lock_key = derive_lock_key(passphrase, &locked.salt)?;
        let seeds = Zeroizing::new(
            open_with_key(&lock_key, &locked.sealed).map_err(|_| CryptoFailure::FailedToUnlockKey)?,
        );
        if seeds.len() != 64 {
            return Err(CryptoFailure::FailedToUnlockKey.into());
        }
        let mut signing_seed = Zeroizing::new([0u8; 32]);
        signing_seed.copy_from_slice(&seeds[..32]);
        let mut encryption_seed = Zeroizing::new([0u8; 32]);
        encryption_seed.copy_from_slice(&seeds[32..]);

        let key = Self::from_seeds(&signing_seed, &encryption_seed);
        if key.public_key() != locked.public {
            return Err(Error::CorruptedKey(format!(
                "{}: unlocked key does not match its public part",
                field
            )));
        }
        Ok(key)
    }
}

fn derive_lock_key(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(KEY_LOCK_PARAMS.0, KEY_LOCK_PARAMS.1, KEY_LOCK_PARAMS.2, Some(32))
        .map_err(|_| CryptoFailure::FailedToUnlockKey)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|_| CryptoFailure::FailedToUnlockKey)?;
    Ok(key)
}

struct LockedKey {
    public: PublicKey,
    salt: Vec<u8>,
    sealed: Vec<u8>,
}

impl LockedKey {
    fn parse(armored: &str, field: &str) -> Result<Self> {
        let body = armor::unarmor(ArmorKind::PrivateKey, armored, field)?;
        let header = 1 + PUBLIC_KEY_LEN + LOCK_SALT_LEN;
        if body.len() <= header || body[0] != LOCKED_KEY_VERSION {
            return Err(CryptoFailure::FailedToUnarmor(field.to_string()).into());
        }
        let public = PublicKey::from_bytes(&body[1..1 + PUBLIC_KEY_LEN], field)?;
        Ok(Self {
            public,
            salt: body[1 + PUBLIC_KEY_LEN..header].to_vec(),
            sealed: body[header..].to_vec(),
        })
    }
}

/// Read the public part of a locked armored key without unlocking it
pub fn locked_public_key(armored: &str, field: &str) -> Result<PublicKey> {
    Ok(LockedKey::parse(armored, field)?.public)
}

fn generate_passphrase() -> Zeroizing<String> {
    Zeroizing::new(armor::encode_base64(&random_bytes::<32>()))
}

/// The user's address key
#[derive(Clone)]
pub struct AddressKey {
    /// Address ID
    pub address_id: String,
    /// Address email, matched against `signatureEmail`
    pub email: String,
    key: PrivateKey,
}

impl AddressKey {
    /// Wrap an existing private key
    pub fn new(address_id: impl Into<String>, email: impl Into<String>, key: PrivateKey) -> Self {
        Self {
            address_id: address_id.into(),
            email: email.into(),
            key,
        }
    }

    /// Generate a fresh address key
    pub fn generate(address_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(address_id, email, PrivateKey::generate())
    }

    /// Private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    /// Public key
    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }
}

/// Accessors shared by rotation-scoped keys
pub trait RotationKey {
    /// Rotation ID
    fn rotation_id(&self) -> &str;
    /// Rotation generation number
    fn rotation(&self) -> i64;
}

/// Vault key of one rotation, as stored and transmitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VaultKey {
    /// Rotation ID
    #[serde(rename = "RotationID")]
    pub rotation_id: String,
    /// Rotation generation
    pub rotation: i64,
    /// Armored locked private key
    pub key: String,
    /// Base64 passphrase sealed to the address key
    pub key_passphrase: Option<String>,
    /// Base64 address signature over the key fingerprint
    pub key_signature: String,
    /// Creation time (unix seconds)
    pub create_time: i64,
}

/// Item key of one rotation, as stored and transmitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemKey {
    /// Rotation ID
    #[serde(rename = "RotationID")]
    pub rotation_id: String,
    /// Rotation generation
    pub rotation: i64,
    /// Armored locked private key
    pub key: String,
    /// Base64 passphrase sealed to the vault key
    pub key_passphrase: Option<String>,
    /// Base64 address signature over the key fingerprint
    pub key_signature: String,
    /// Creation time (unix seconds)
    pub create_time: i64,
}

impl RotationKey for VaultKey {
    fn rotation_id(&self) -> &str {
        &self.rotation_id
    }
    fn rotation(&self) -> i64 {
        self.rotation
    }
}

impl RotationKey for ItemKey {
    fn rotation_id(&self) -> &str {
        &self.rotation_id
    }
    fn rotation(&self) -> i64 {
        self.rotation
    }
}

/// Verify `key_signature` over the fingerprint of a locked key.
fn verify_key_signature(
    armored: &str,
    key_signature: &str,
    issuer: &PublicKey,
    field: &str,
) -> Result<PublicKey> {
    let corrupted = |reason: &str| Error::CorruptedKey(format!("{}: {}", field, reason));

    let public = locked_public_key(armored, field).map_err(|_| corrupted("unreadable key"))?;
    let signature = armor::decode_base64(key_signature, "keySignature")
        .map_err(|_| corrupted("undecodable signature"))?;
    issuer
        .verify(public.fingerprint().as_bytes(), &signature, "keySignature")
        .map_err(|_| corrupted("signature does not verify"))?;
    Ok(public)
}

fn open_passphrase(sealed: Option<&str>, opener: &PrivateKey, field: &str) -> Result<Zeroizing<String>> {
    let sealed = sealed.ok_or_else(|| Error::corrupted(field, "keyPassphrase"))?;
    let sealed = armor::decode_base64(sealed, "keyPassphrase")?;
    let raw = Zeroizing::new(opener.open(&sealed)?);
    let passphrase = String::from_utf8(raw.to_vec())
        .map_err(|_| CryptoFailure::FailedToUnlockKey)?;
    Ok(Zeroizing::new(passphrase))
}

impl VaultKey {
    /// Generate a new vault key for `rotation_id`, signed and sealed by `address`
    pub fn issue(
        rotation_id: impl Into<String>,
        rotation: i64,
        address: &AddressKey,
        create_time: i64,
    ) -> Result<(VaultKey, UnlockedVaultKey)> {
        let rotation_id = rotation_id.into();
        let private = PrivateKey::generate();
        let passphrase = generate_passphrase();

        let key = private.lock(&passphrase)?;
        let sealed = seal_message(passphrase.as_bytes(), address.public_key().encryption_key())?;
        let signature = address
            .private_key()
            .sign(private.public_key().fingerprint().as_bytes());

        let record = VaultKey {
            rotation_id: rotation_id.clone(),
            rotation,
            key,
            key_passphrase: Some(armor::encode_base64(&sealed)),
            key_signature: armor::encode_base64(&signature),
            create_time,
        };
        let unlocked = UnlockedVaultKey {
            rotation_id,
            rotation,
            key: private,
        };
        Ok((record, unlocked))
    }

    /// Verify against the address and unlock.
    ///
    /// Fails with `CorruptedKey` when `keySignature` does not verify.
    pub fn unlock(&self, address: &AddressKey) -> Result<UnlockedVaultKey> {
        verify_key_signature(&self.key, &self.key_signature, &address.public_key(), "VaultKey")?;
        let passphrase = open_passphrase(
            self.key_passphrase.as_deref(),
            address.private_key(),
            "VaultKey",
        )?;
        let key = PrivateKey::unlock(&self.key, &passphrase, "VaultKey")?;
        Ok(UnlockedVaultKey {
            rotation_id: self.rotation_id.clone(),
            rotation: self.rotation,
            key,
        })
    }
}

impl ItemKey {
    /// Generate a new item key under `vault`, signed by `address`
    pub fn issue(
        vault: &UnlockedVaultKey,
        address: &AddressKey,
        create_time: i64,
    ) -> Result<(ItemKey, UnlockedItemKey)> {
        let private = PrivateKey::generate();
        let passphrase = generate_passphrase();

        let key = private.lock(&passphrase)?;
        let sealed = seal_message(passphrase.as_bytes(), vault.public_key().encryption_key())?;
        let signature = address
            .private_key()
            .sign(private.public_key().fingerprint().as_bytes());

        let record = ItemKey {
            rotation_id: vault.rotation_id.clone(),
            rotation: vault.rotation,
            key,
            key_passphrase: Some(armor::encode_base64(&sealed)),
            key_signature: armor::encode_base64(&signature),
            create_time,
        };
        let unlocked = UnlockedItemKey {
            rotation_id: vault.rotation_id.clone(),
            rotation: vault.rotation,
            key: private,
        };
        Ok((record, unlocked))
    }

    /// Public key after checking `keySignature` against the issuing address
    pub fn verified_public_key(&self, issuer: &PublicKey) -> Result<PublicKey> {
        verify_key_signature(&self.key, &self.key_signature, issuer, "ItemKey")
    }

    /// Verify against the issuing address and unlock with the vault key
    /// of the same rotation.
    pub fn unlock(&self, vault: &UnlockedVaultKey, issuer: &PublicKey) -> Result<UnlockedItemKey> {
        if vault.rotation_id != self.rotation_id {
            return Err(Error::UnmatchedRotationId {
                left: vault.rotation_id.clone(),
                right: self.rotation_id.clone(),
            });
        }
        self.verified_public_key(issuer)?;
        let passphrase = open_passphrase(self.key_passphrase.as_deref(), &vault.key, "ItemKey")?;
        let key = PrivateKey::unlock(&self.key, &passphrase, "ItemKey")?;
        Ok(UnlockedItemKey {
            rotation_id: self.rotation_id.clone(),
            rotation: self.rotation,
            key,
        })
    }
}

/// Vault key ready for use
#[derive(Clone)]
pub struct UnlockedVaultKey {
    /// Rotation ID
    pub rotation_id: String,
    /// Rotation generation
    pub rotation: i64,
    key: PrivateKey,
}

impl UnlockedVaultKey {
    /// Public key
    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    /// Private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    pub(crate) fn encryption_secret(&self) -> &StaticSecret {
        self.key.encryption_secret()
    }
}

/// Item key ready for signing
#[derive(Clone)]
pub struct UnlockedItemKey {
    /// Rotation ID
    pub rotation_id: String,
    /// Rotation generation
    pub rotation: i64,
    key: PrivateKey,
}

impl UnlockedItemKey {
    /// Public key
    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    /// Private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }
}

/// All keys known for one share
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareKeys {
    /// Share ID
    pub share_id: String,
    /// Vault keys, any order
    pub vault_keys: Vec<VaultKey>,
    /// Item keys, any order
    pub item_keys: Vec<ItemKey>,
}

impl ShareKeys {
    /// Create an empty key set
    pub fn new(share_id: impl Into<String>) -> Self {
        Self {
            share_id: share_id.into(),
            ..Default::default()
        }
    }

    fn not_found(&self, rotation_id: &str) -> Error {
        Error::KeyNotFound {
            share_id: self.share_id.clone(),
            rotation_id: rotation_id.to_string(),
        }
    }

    /// Vault key for a rotation
    pub fn resolve_vault_key(&self, rotation_id: &str) -> Result<&VaultKey> {
        self.vault_keys
            .iter()
            .find(|k| k.rotation_id == rotation_id)
            .ok_or_else(|| self.not_found(rotation_id))
    }

    /// Item key for a rotation
    pub fn resolve_item_key(&self, rotation_id: &str) -> Result<&ItemKey> {
        self.item_keys
            .iter()
            .find(|k| k.rotation_id == rotation_id)
            .ok_or_else(|| self.not_found(rotation_id))
    }

    /// Vault key by rotation generation (share content is addressed this way)
    pub fn resolve_vault_key_by_rotation(&self, rotation: i64) -> Result<&VaultKey> {
        self.vault_keys
            .iter()
            .find(|k| k.rotation == rotation)
            .ok_or_else(|| self.not_found(&rotation.to_string()))
    }

    /// Item key with the highest rotation
    pub fn latest_item_key(&self) -> Result<&ItemKey> {
        latest_of(&self.item_keys).ok_or_else(|| Error::VaultKeyNotFound(self.share_id.clone()))
    }

    /// Newest vault/item key pair, used for new content
    pub fn latest(&self) -> Result<(&VaultKey, &ItemKey)> {
        let item_key = self.latest_item_key()?;
        let vault_key = latest_of(&self.vault_keys)
            .ok_or_else(|| Error::VaultKeyNotFound(self.share_id.clone()))?;
        if vault_key.rotation_id != item_key.rotation_id {
            return Err(Error::UnmatchedRotationId {
                left: vault_key.rotation_id.clone(),
                right: item_key.rotation_id.clone(),
            });
        }
        Ok((vault_key, item_key))
    }

    /// Every item key must have a vault key of the same rotation
    pub fn validate(&self) -> Result<()> {
        let synced = self
            .item_keys
            .iter()
            .all(|ik| self.vault_keys.iter().any(|vk| vk.rotation_id == ik.rotation_id));
        if synced {
            Ok(())
        } else {
            Err(Error::CorruptedShareKeys(self.share_id.clone()))
        }
    }
}

fn latest_of<K: RotationKey>(keys: &[K]) -> Option<&K> {
    keys.iter().max_by_key(|k| k.rotation())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> AddressKey {
        AddressKey::generate("address-1", "user@proton.me")
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let key = PrivateKey::from_seeds(&[1u8; 32], &[2u8; 32]);
        let fp = key.public_key().fingerprint();
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, PrivateKey::from_seeds(&[1u8; 32], &[2u8; 32]).public_key().fingerprint());
    }

    #[test]
    fn test_lock_unlock() {
        let key = PrivateKey::generate();
        let armored = key.lock("passphrase").unwrap();
        let unlocked = PrivateKey::unlock(&armored, "passphrase", "key").unwrap();
        assert_eq!(unlocked.public_key(), key.public_key());
        assert_eq!(locked_public_key(&armored, "key").unwrap(), key.public_key());
    }

    #[test]
    fn test_unlock_wrong_passphrase() {
        let armored = PrivateKey::generate().lock("right").unwrap();
        let err = PrivateKey::unlock(&armored, "wrong", "key").err().unwrap();
        assert!(matches!(err, Error::Crypto(CryptoFailure::FailedToUnlockKey)));
    }

    #[test]
    fn test_public_key_armor() {
        let public = PrivateKey::generate().public_key();
        let parsed = PublicKey::from_armored(&public.armored(), "pub").unwrap();
        assert_eq!(parsed, public);
    }

    #[test]
    fn test_vault_and_item_key_unlock() {
        let address = address();
        let (vault_key, unlocked_vault) = VaultKey::issue("r1", 1, &address, 100).unwrap();
        let (item_key, unlocked_item) = ItemKey::issue(&unlocked_vault, &address, 100).unwrap();

        let vault = vault_key.unlock(&address).unwrap();
        assert_eq!(vault.public_key(), unlocked_vault.public_key());

        let item = item_key.unlock(&vault, &address.public_key()).unwrap();
        assert_eq!(item.public_key(), unlocked_item.public_key());
        assert_eq!(item.rotation_id, "r1");
    }

    #[test]
    fn test_foreign_signature_is_corrupted_key() {
        let address = address();
        let stranger = AddressKey::generate("address-2", "other@proton.me");
        let (mut vault_key, _) = VaultKey::issue("r1", 1, &address, 100).unwrap();
        let (forged, _) = VaultKey::issue("r1", 1, &stranger, 100).unwrap();
        vault_key.key_signature = forged.key_signature;

        let err = vault_key.unlock(&address).err().unwrap();
        assert!(matches!(err, Error::CorruptedKey(_)));
    }

    #[test]
    fn test_missing_passphrase_is_named() {
        let address = address();
        let (mut vault_key, _) = VaultKey::issue("r1", 1, &address, 100).unwrap();
        vault_key.key_passphrase = None;
        let err = vault_key.unlock(&address).err().unwrap();
        assert_eq!(err.to_string(), "Corrupted VaultKey: missing value for keyPassphrase");
    }

    #[test]
    fn test_item_key_rotation_mismatch() {
        let address = address();
        let (_, v1) = VaultKey::issue("r1", 1, &address, 100).unwrap();
        let (_, v2) = VaultKey::issue("r2", 2, &address, 200).unwrap();
        let (item_key, _) = ItemKey::issue(&v1, &address, 100).unwrap();
        let err = item_key.unlock(&v2, &address.public_key()).err().unwrap();
        assert!(matches!(err, Error::UnmatchedRotationId { .. }));
    }

    #[test]
    fn test_resolve_and_latest() {
        let address = address();
        let (vk1, v1) = VaultKey::issue("r1", 1, &address, 100).unwrap();
        let (vk2, v2) = VaultKey::issue("r2", 2, &address, 200).unwrap();
        let (ik1, _) = ItemKey::issue(&v1, &address, 100).unwrap();
        let (ik2, _) = ItemKey::issue(&v2, &address, 200).unwrap();

        let keys = ShareKeys {
            share_id: "share".into(),
            vault_keys: vec![vk2, vk1],
            item_keys: vec![ik1, ik2],
        };
        assert_eq!(keys.resolve_vault_key("r1").unwrap().rotation, 1);
        assert_eq!(keys.resolve_item_key("r2").unwrap().rotation, 2);
        assert_eq!(keys.resolve_vault_key_by_rotation(2).unwrap().rotation_id, "r2");

        let (vault, item) = keys.latest().unwrap();
        assert_eq!(vault.rotation_id, "r2");
        assert_eq!(item.rotation_id, "r2");
        assert!(keys.validate().is_ok());

        let err = keys.resolve_vault_key("r9").err().unwrap();
        assert!(matches!(err, Error::KeyNotFound { ref rotation_id, .. } if rotation_id == "r9"));
    }

    #[test]
    fn test_unsynced_keys_rejected() {
        let address = address();
        let (_, v1) = VaultKey::issue("r1", 1, &address, 100).unwrap();
        let (ik1, _) = ItemKey::issue(&v1, &address, 100).unwrap();
        let keys = ShareKeys {
            share_id: "share".into(),
            vault_keys: vec![],
            item_keys: vec![ik1],
        };
        assert!(matches!(keys.validate(), Err(Error::CorruptedShareKeys(_))));
        assert!(matches!(keys.latest(), Err(Error::VaultKeyNotFound(_))));
    }
}
