//! Symmetric session keys and asymmetric session-key wrapping
//!
//! Session-encrypted blob: `[nonce(12)][ciphertext + tag]` (ChaCha20-Poly1305).
//!
//! Key packet: `[ephemeral X25519 public(32)][nonce(12)][wrapped session key(32) + tag(16)]`.
//! The wrapping key is HKDF-SHA256 over the X25519 shared secret, bound to both
//! public keys.

use crate::error::{CryptoFailure, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Session key length
pub const SESSION_KEY_LEN: usize = 32;
/// AEAD nonce length
pub const NONCE_LEN: usize = 12;
/// AEAD tag length
pub const TAG_LEN: usize = 16;
/// Serialized key packet length
pub const KEY_PACKET_LEN: usize = 32 + NONCE_LEN + SESSION_KEY_LEN + TAG_LEN;

const KEY_PACKET_INFO: &[u8] = b"pass.vault-key-packet";

/// Fill a fixed buffer from the OS RNG
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}

/// One-time symmetric key for a single envelope
pub struct SessionKey(Zeroizing<[u8; SESSION_KEY_LEN]>);

impl SessionKey {
    /// Generate a fresh random session key
    pub fn generate() -> Self {
        Self(Zeroizing::new(random_bytes()))
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: [u8; SESSION_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoFailure::FailedToGenerateSessionKey)?;
        Ok(Self(Zeroizing::new(key)))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }

    /// Encrypt with a random nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal_with_key(&self.0, plaintext)
    }

    /// Decrypt a blob produced by [`SessionKey::encrypt`]
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        open_with_key(&self.0, data)
    }
}

/// AEAD-encrypt under a raw 32-byte key, prefixing the nonce
pub(crate) fn seal_with_key(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce_bytes: [u8; NONCE_LEN] = random_bytes();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoFailure::FailedToEncrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Inverse of [`seal_with_key`]
pub(crate) fn open_with_key(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoFailure::FailedToDecryptContent.into());
    }
    let cipher = ChaCha20Poly1305::new(key.into());
    let (nonce, ciphertext) = data.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoFailure::FailedToDecryptContent.into())
}

fn key_packet_kek(
    shared: &[u8; 32],
    ephemeral_public: &X25519PublicKey,
    recipient: &X25519PublicKey,
) -> Result<Zeroizing<[u8; 32]>> {
    let hkdf = Hkdf::<Sha256>::new(None, shared);
    let mut info = Vec::with_capacity(KEY_PACKET_INFO.len() + 64);
    info.extend_from_slice(KEY_PACKET_INFO);
    info.extend_from_slice(ephemeral_public.as_bytes());
    info.extend_from_slice(recipient.as_bytes());

    let mut kek = Zeroizing::new([0u8; 32]);
    hkdf.expand(&info, &mut kek[..])
        .map_err(|_| CryptoFailure::FailedToGenerateSessionKey)?;
    Ok(kek)
}

/// Wrap a session key to a recipient's X25519 public key
pub fn wrap_session_key(session: &SessionKey, recipient: &X25519PublicKey) -> Result<Vec<u8>> {
    let ephemeral = StaticSecret::from(random_bytes::<32>());
    let ephemeral_public = X25519PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient);
    let kek = key_packet_kek(shared.as_bytes(), &ephemeral_public, recipient)?;

    let wrapped = seal_with_key(&kek, session.as_bytes())?;

    let mut packet = Vec::with_capacity(KEY_PACKET_LEN);
    packet.extend_from_slice(ephemeral_public.as_bytes());
    packet.extend_from_slice(&wrapped);
    Ok(packet)
}

/// Unwrap a session key with the recipient's X25519 secret
pub fn unwrap_session_key(packet: &[u8], secret: &StaticSecret) -> Result<SessionKey> {
    if packet.len() != KEY_PACKET_LEN {
        return Err(CryptoFailure::FailedToUnwrapSessionKey.into());
    }
    let mut ephemeral_bytes = [0u8; 32];
    ephemeral_bytes.copy_from_slice(&packet[..32]);
    let ephemeral_public = X25519PublicKey::from(ephemeral_bytes);
    let recipient = X25519PublicKey::from(secret);

    let shared = secret.diffie_hellman(&ephemeral_public);
    let kek = key_packet_kek(shared.as_bytes(), &ephemeral_public, &recipient)?;

    let raw = open_with_key(&kek, &packet[32..])
        .map_err(|_| CryptoFailure::FailedToUnwrapSessionKey)?;
    SessionKey::from_bytes(&raw)
}

/// Split an encrypted message into key packet and data packet
pub fn split_message(message: &[u8]) -> Result<(&[u8], &[u8])> {
    if message.len() < KEY_PACKET_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoFailure::FailedToUnwrapSessionKey.into());
    }
    Ok(message.split_at(KEY_PACKET_LEN))
}

/// Encrypt `plaintext` to a recipient as a self-contained message
/// (`key packet || data packet`).
pub fn seal_message(plaintext: &[u8], recipient: &X25519PublicKey) -> Result<Vec<u8>> {
    let session = SessionKey::generate();
    let mut message = wrap_session_key(&session, recipient)?;
    message.extend_from_slice(&session.encrypt(plaintext)?);
    Ok(message)
}

/// Decrypt a message produced by [`seal_message`]
pub fn open_message(message: &[u8], secret: &StaticSecret) -> Result<Vec<u8>> {
    let (packet, data) = split_message(message)?;
    let session = unwrap_session_key(packet, secret)?;
    session.decrypt(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn keypair() -> (StaticSecret, X25519PublicKey) {
        let secret = StaticSecret::from(random_bytes::<32>());
        let public = X25519PublicKey::from(&secret);
        (secret, public)
    }

    #[test]
    fn test_session_key_roundtrip() {
        let key = SessionKey::generate();
        let ct = key.encrypt(b"login").unwrap();
        assert_eq!(ct.len(), NONCE_LEN + 5 + TAG_LEN);
        assert_eq!(key.decrypt(&ct).unwrap(), b"login");
    }

    #[test]
    fn test_wrap_unwrap() {
        let (secret, public) = keypair();
        let session = SessionKey::generate();
        let packet = wrap_session_key(&session, &public).unwrap();
        assert_eq!(packet.len(), KEY_PACKET_LEN);

        let unwrapped = unwrap_session_key(&packet, &secret).unwrap();
        assert_eq!(unwrapped.as_bytes(), session.as_bytes());
    }

    #[test]
    fn test_unwrap_with_wrong_key_fails() {
        let (_, public) = keypair();
        let (other, _) = keypair();
        let packet = wrap_session_key(&SessionKey::generate(), &public).unwrap();
        let err = unwrap_session_key(&packet, &other).err().unwrap();
        assert!(matches!(err, Error::Crypto(CryptoFailure::FailedToUnwrapSessionKey)));
    }

    #[test]
    fn test_message_roundtrip() {
        let (secret, public) = keypair();
        let message = seal_message(b"vault name", &public).unwrap();
        assert_eq!(open_message(&message, &secret).unwrap(), b"vault name");
    }

    #[test]
    fn test_short_message_rejected() {
        let (secret, _) = keypair();
        assert!(open_message(&[0u8; 10], &secret).is_err());
    }
}
