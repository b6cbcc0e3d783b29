//! Test fixtures shared across crates (`test-helpers` feature)

#![allow(missing_docs)]

use crate::armor::encode_base64;
use crate::content::ItemContent;
use crate::envelope::{encrypt_item, OpenKeys, CONTENT_FORMAT_VERSION};
use crate::error::Result;
use crate::item::Locker;
use crate::keys::{AddressKey, ItemKey, PublicKey, ShareKeys, UnlockedItemKey, UnlockedVaultKey, VaultKey};
use crate::revision::{ItemRevision, ItemState};

/// Address, vault key and item key of one rotation
pub struct TestKeys {
    pub address: AddressKey,
    pub vault_key: VaultKey,
    pub item_key: ItemKey,
    pub vault: UnlockedVaultKey,
    pub item: UnlockedItemKey,
    pub item_public: PublicKey,
    pub address_public: PublicKey,
    pub share_keys: ShareKeys,
}

impl TestKeys {
    pub fn new(share_id: &str, rotation_id: &str) -> Self {
        Self::for_address(AddressKey::generate("address-1", "user@proton.me"), share_id, rotation_id, 1)
    }

    pub fn for_address(address: AddressKey, share_id: &str, rotation_id: &str, rotation: i64) -> Self {
        let (vault_key, vault) = VaultKey::issue(rotation_id, rotation, &address, 1_700_000_000)
            .expect("issue vault key");
        let (item_key, item) = ItemKey::issue(&vault, &address, 1_700_000_000).expect("issue item key");
        let item_public = item.public_key();
        let address_public = address.public_key();
        let share_keys = ShareKeys {
            share_id: share_id.to_string(),
            vault_keys: vec![vault_key.clone()],
            item_keys: vec![item_key.clone()],
        };
        Self {
            address,
            vault_key,
            item_key,
            vault,
            item,
            item_public,
            address_public,
            share_keys,
        }
    }

    pub fn open_keys(&self) -> OpenKeys<'_> {
        OpenKeys {
            vault: &self.vault,
            item_key: &self.item_public,
            signer: &self.address_public,
        }
    }

    /// Active revision sealed for these keys
    pub fn revision(&self, item_id: &str, revision: i64, content: &ItemContent) -> ItemRevision {
        let sealed = encrypt_item(content, &self.vault, &self.item, &self.address).expect("seal item");
        ItemRevision {
            item_id: item_id.to_string(),
            revision,
            content_format_version: CONTENT_FORMAT_VERSION,
            rotation_id: sealed.rotation_id.clone(),
            content: sealed.message_base64(),
            user_signature: encode_base64(&sealed.user_signature),
            item_key_signature: encode_base64(&sealed.item_key_signature),
            vault_key_packet_signature: Some(encode_base64(&sealed.vault_key_packet_signature)),
            state: ItemState::Active,
            signature_email: self.address.email.clone(),
            alias_email: None,
            create_time: 1_700_000_000,
            modify_time: 1_700_000_000,
            revision_time: 1_700_000_000,
            last_use_time: None,
        }
    }
}

/// Reversible locker for tests that don't need real encryption
pub struct XorLocker(pub u8);

impl Locker for XorLocker {
    fn lock(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.iter().map(|b| b ^ self.0).collect())
    }

    fn unlock(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.iter().map(|b| b ^ self.0).collect())
    }
}
