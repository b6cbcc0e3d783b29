//! Locally re-encrypted items
//!
//! The end-to-end envelope is kept as received. The decrypted content is
//! encrypted a second time with the device main key so the cache can be
//! read without touching the key hierarchy.

use crate::armor::{decode_base64, encode_base64};
use crate::content::ItemContent;
use crate::error::{Error, Result};
use crate::revision::ItemRevision;

/// Encrypt-with-main-key / decrypt-with-main-key
pub trait Locker: Send + Sync {
    /// Encrypt data at rest
    fn lock(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    /// Decrypt data produced by [`Locker::lock`]
    fn unlock(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Cached item row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricallyEncryptedItem {
    /// Owning share
    pub share_id: String,
    /// Server revision, envelope included
    pub item: ItemRevision,
    /// Base64 main-key-encrypted content
    pub encrypted_content: String,
    /// Last local use (unix seconds)
    pub last_used_time: i64,
    /// Offered for AutoFill
    pub is_log_in_item: bool,
    /// Pinned locally
    pub pinned: bool,
    /// When the item was pinned
    pub pin_time: Option<i64>,
}

impl SymmetricallyEncryptedItem {
    /// Re-encrypt verified content for the cache
    pub fn seal(
        share_id: impl Into<String>,
        item: ItemRevision,
        content: &ItemContent,
        locker: &dyn Locker,
    ) -> Result<Self> {
        let encrypted = locker.lock(&content.to_bytes())?;
        let last_used_time = item.last_use_time.unwrap_or(item.modify_time);
        Ok(Self {
            share_id: share_id.into(),
            item,
            encrypted_content: encode_base64(&encrypted),
            last_used_time,
            is_log_in_item: content.is_log_in_item(),
            pinned: false,
            pin_time: None,
        })
    }

    /// Item ID
    pub fn item_id(&self) -> &str {
        &self.item.item_id
    }

    /// Decrypt the cached content
    pub fn decrypt_content(&self, locker: &dyn Locker) -> Result<ItemContent> {
        let data = decode_base64(&self.encrypted_content, "encryptedContent")
            .map_err(|_| Error::CorruptedEncryptedContent)?;
        let plaintext = locker
            .unlock(&data)
            .map_err(|_| Error::CorruptedEncryptedContent)?;
        ItemContent::from_bytes(&plaintext).map_err(|_| Error::CorruptedEncryptedContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{TestKeys, XorLocker};

    #[test]
    fn test_seal_and_decrypt() {
        let keys = TestKeys::new("share", "r1");
        let content = ItemContent::login("Mail", "me", "pw", vec![]);
        let revision = keys.revision("item-1", 1, &content);
        let locker = XorLocker(0x5a);

        let item = SymmetricallyEncryptedItem::seal("share", revision, &content, &locker).unwrap();
        assert!(item.is_log_in_item);
        assert_eq!(item.item_id(), "item-1");
        assert_eq!(item.decrypt_content(&locker).unwrap(), content);
    }

    #[test]
    fn test_undecodable_content_is_corrupted() {
        let keys = TestKeys::new("share", "r1");
        let content = ItemContent::note("n", "body");
        let revision = keys.revision("item-1", 1, &content);
        let item =
            SymmetricallyEncryptedItem::seal("share", revision, &content, &XorLocker(1)).unwrap();

        let mut broken = item.clone();
        broken.encrypted_content = "@@@".into();
        assert!(matches!(
            broken.decrypt_content(&XorLocker(1)),
            Err(Error::CorruptedEncryptedContent)
        ));
    }
}
