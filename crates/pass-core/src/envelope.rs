//! Item envelope codec
//!
//! Seal:
//! 1. fresh session key, plaintext encrypted into the data packet
//! 2. session key wrapped to the vault key into the vault key packet
//! 3. address key and item key each sign the plaintext, and both
//!    signatures are encrypted with the session key
//! 4. item key signs the vault key packet
//!
//! Open reverses the steps and verifies every signature. Any failure
//! rejects the item as a whole.

use crate::armor::{decode_base64, encode_base64};
use crate::content::ItemContent;
use crate::crypto::{split_message, unwrap_session_key, wrap_session_key, SessionKey};
use crate::error::{Error, Result};
use crate::keys::{AddressKey, PublicKey, UnlockedItemKey, UnlockedVaultKey};
use crate::revision::ItemRevision;

/// Envelope format version written by this codec
pub const CONTENT_FORMAT_VERSION: i64 = 1;

/// Binary output of [`seal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// Rotation of the vault key the session key is wrapped to
    pub rotation_id: String,
    /// Wrapped session key
    pub vault_key_packet: Vec<u8>,
    /// Item key signature over `vault_key_packet`
    pub vault_key_packet_signature: Vec<u8>,
    /// Session-encrypted content
    pub data_packet: Vec<u8>,
    /// Session-encrypted address signature
    pub user_signature: Vec<u8>,
    /// Session-encrypted item key signature
    pub item_key_signature: Vec<u8>,
}

impl SealedEnvelope {
    /// Full message: `vault_key_packet || data_packet`
    pub fn message(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.vault_key_packet.len() + self.data_packet.len());
        out.extend_from_slice(&self.vault_key_packet);
        out.extend_from_slice(&self.data_packet);
        out
    }

    /// Base64 full message, as carried in `ItemRevision.content`
    pub fn message_base64(&self) -> String {
        encode_base64(&self.message())
    }
}

/// Base64 wire fields of an envelope
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeFields<'a> {
    /// Rotation ID
    pub rotation_id: &'a str,
    /// Base64 `vaultKeyPacket || dataPacket`
    pub content: &'a str,
    /// Base64 encrypted address signature
    pub user_signature: &'a str,
    /// Base64 encrypted item key signature
    pub item_key_signature: &'a str,
    /// Base64 vault key packet signature, when the server returns it
    pub vault_key_packet_signature: Option<&'a str>,
}

impl<'a> From<&'a ItemRevision> for EnvelopeFields<'a> {
    fn from(revision: &'a ItemRevision) -> Self {
        Self {
            rotation_id: &revision.rotation_id,
            content: &revision.content,
            user_signature: &revision.user_signature,
            item_key_signature: &revision.item_key_signature,
            vault_key_packet_signature: revision.vault_key_packet_signature.as_deref(),
        }
    }
}

/// Keys needed to open and verify an envelope
#[derive(Clone, Copy)]
pub struct OpenKeys<'a> {
    /// Vault key of the envelope's rotation
    pub vault: &'a UnlockedVaultKey,
    /// Verified item key of the same rotation
    pub item_key: &'a PublicKey,
    /// Address key of `signatureEmail`
    pub signer: &'a PublicKey,
}

/// Encrypt and sign a plaintext for a vault
pub fn seal(
    plaintext: &[u8],
    vault: &UnlockedVaultKey,
    item_key: &UnlockedItemKey,
    address: &AddressKey,
) -> Result<SealedEnvelope> {
    if vault.rotation_id != item_key.rotation_id {
        return Err(Error::UnmatchedRotationId {
            left: vault.rotation_id.clone(),
            right: item_key.rotation_id.clone(),
        });
    }

    let session = SessionKey::generate();
    let data_packet = session.encrypt(plaintext)?;
    let vault_key_packet = wrap_session_key(&session, vault.public_key().encryption_key())?;

    let user_signature = session.encrypt(&address.private_key().sign(plaintext))?;
    let item_key_signature = session.encrypt(&item_key.private_key().sign(plaintext))?;
    let vault_key_packet_signature = item_key.private_key().sign(&vault_key_packet);

    Ok(SealedEnvelope {
        rotation_id: vault.rotation_id.clone(),
        vault_key_packet,
        vault_key_packet_signature,
        data_packet,
        user_signature,
        item_key_signature,
    })
}

/// Decrypt and verify an envelope, returning the plaintext
pub fn open(fields: EnvelopeFields<'_>, keys: OpenKeys<'_>) -> Result<Vec<u8>> {
    if keys.vault.rotation_id != fields.rotation_id {
        return Err(Error::UnmatchedRotationId {
            left: keys.vault.rotation_id.clone(),
            right: fields.rotation_id.to_string(),
        });
    }

    let message = decode_base64(fields.content, "content")?;
    let (vault_key_packet, data_packet) = split_message(&message)?;

    if let Some(signature) = fields.vault_key_packet_signature {
        let signature = decode_base64(signature, "vaultKeyPacketSignature")?;
        keys.item_key
            .verify(vault_key_packet, &signature, "vaultKeyPacketSignature")?;
    }

    let session = unwrap_session_key(vault_key_packet, keys.vault.encryption_secret())?;
    let plaintext = session.decrypt(data_packet)?;

    let user_signature = session.decrypt(&decode_base64(fields.user_signature, "userSignature")?)?;
    keys.signer.verify(&plaintext, &user_signature, "userSignature")?;

    let item_key_signature =
        session.decrypt(&decode_base64(fields.item_key_signature, "itemKeySignature")?)?;
    keys.item_key
        .verify(&plaintext, &item_key_signature, "itemKeySignature")?;

    Ok(plaintext)
}

/// Seal item content
pub fn encrypt_item(
    content: &ItemContent,
    vault: &UnlockedVaultKey,
    item_key: &UnlockedItemKey,
    address: &AddressKey,
) -> Result<SealedEnvelope> {
    seal(&content.to_bytes(), vault, item_key, address)
}

/// Open and decode an item revision
pub fn decrypt_item(revision: &ItemRevision, keys: OpenKeys<'_>) -> Result<ItemContent> {
    let plaintext = open(EnvelopeFields::from(revision), keys)?;
    ItemContent::from_bytes(&plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoFailure;
    use crate::fixtures::TestKeys;

    struct Wire {
        content: String,
        user_signature: String,
        item_key_signature: String,
        vault_key_packet_signature: String,
    }

    impl Wire {
        fn from_sealed(sealed: &SealedEnvelope) -> Self {
            Self {
                content: sealed.message_base64(),
                user_signature: encode_base64(&sealed.user_signature),
                item_key_signature: encode_base64(&sealed.item_key_signature),
                vault_key_packet_signature: encode_base64(&sealed.vault_key_packet_signature),
            }
        }

        fn fields(&self) -> EnvelopeFields<'_> {
            EnvelopeFields {
                rotation_id: "r1",
                content: &self.content,
                user_signature: &self.user_signature,
                item_key_signature: &self.item_key_signature,
                vault_key_packet_signature: Some(&self.vault_key_packet_signature),
            }
        }
    }

    fn sealed(keys: &TestKeys) -> SealedEnvelope {
        seal(b"secret", &keys.vault, &keys.item, &keys.address).unwrap()
    }

    #[test]
    fn test_seal_open() {
        let keys = TestKeys::new("share", "r1");
        let wire = Wire::from_sealed(&sealed(&keys));
        let plaintext = open(wire.fields(), keys.open_keys()).unwrap();
        assert_eq!(plaintext, b"secret");
    }

    #[test]
    fn test_wrong_rotation() {
        let keys = TestKeys::new("share", "r1");
        let wire = Wire::from_sealed(&sealed(&keys));
        let fields = EnvelopeFields {
            rotation_id: "r2",
            ..wire.fields()
        };
        assert!(matches!(
            open(fields, keys.open_keys()),
            Err(Error::UnmatchedRotationId { .. })
        ));
    }

    #[test]
    fn test_foreign_signer_rejected() {
        let keys = TestKeys::new("share", "r1");
        let stranger = TestKeys::new("share", "r1");
        let wire = Wire::from_sealed(&sealed(&keys));
        let stranger_public = stranger.address.public_key();
        let open_keys = OpenKeys {
            signer: &stranger_public,
            ..keys.open_keys()
        };
        let err = open(wire.fields(), open_keys).unwrap_err();
        assert!(matches!(
            err,
            Error::Crypto(CryptoFailure::FailedToVerifySignature(ref f)) if f == "userSignature"
        ));
    }

    #[test]
    fn test_swapped_signatures_rejected() {
        let keys = TestKeys::new("share", "r1");
        let mut wire = Wire::from_sealed(&sealed(&keys));
        std::mem::swap(&mut wire.user_signature, &mut wire.item_key_signature);
        assert!(open(wire.fields(), keys.open_keys()).is_err());
    }

    #[test]
    fn test_garbage_vs_tampered() {
        let keys = TestKeys::new("share", "r1");
        let mut wire = Wire::from_sealed(&sealed(&keys));
        wire.user_signature = "%%%".into();
        let garbage = open(wire.fields(), keys.open_keys()).unwrap_err();
        assert!(matches!(
            garbage,
            Error::Crypto(CryptoFailure::FailedToDecode(ref f)) if f == "userSignature"
        ));

        let other = sealed(&keys);
        let mut wire = Wire::from_sealed(&sealed(&keys));
        wire.vault_key_packet_signature = encode_base64(&other.vault_key_packet_signature);
        let tampered = open(wire.fields(), keys.open_keys()).unwrap_err();
        assert!(matches!(
            tampered,
            Error::Crypto(CryptoFailure::FailedToVerifySignature(ref f)) if f == "vaultKeyPacketSignature"
        ));
    }

    #[test]
    fn test_item_roundtrip() {
        let keys = TestKeys::new("share", "r1");
        let content = ItemContent::login("Mail", "me", "pw", vec![]);
        let revision = keys.revision("item-1", 1, &content);
        let decrypted = decrypt_item(&revision, keys.open_keys()).unwrap();
        assert_eq!(decrypted, content);
    }
}
