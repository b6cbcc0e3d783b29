//! Row models
//!
//! Rows mirror the tables column for column with every nullable column as an
//! `Option`. Conversion into domain types checks required fields in
//! declaration order and names the first one that is missing.

use pass_core::{
    Error as CoreError, ItemKey, ItemRevision, ItemState, Share, SymmetricallyEncryptedItem,
    VaultKey,
};
use rusqlite::Row;

type CoreResult<T> = std::result::Result<T, CoreError>;

fn required<T>(value: Option<T>, object: &str, property: &str) -> CoreResult<T> {
    value.ok_or_else(|| CoreError::corrupted(object, property))
}

/// `items` row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRow {
    /// Item ID
    pub item_id: String,
    /// Share ID
    pub share_id: String,
    /// Revision
    pub revision: Option<i64>,
    /// Content format version
    pub content_format_version: Option<i64>,
    /// Rotation ID
    pub rotation_id: Option<String>,
    /// End-to-end encrypted content
    pub content: Option<String>,
    /// Encrypted address signature
    pub user_signature: Option<String>,
    /// Encrypted item key signature
    pub item_key_signature: Option<String>,
    /// Vault key packet signature
    pub vault_key_packet_signature: Option<String>,
    /// State
    pub state: Option<i64>,
    /// Signing address email
    pub signature_email: Option<String>,
    /// Alias email
    pub alias_email: Option<String>,
    /// Creation time
    pub create_time: Option<i64>,
    /// Modification time
    pub modify_time: Option<i64>,
    /// Revision time
    pub revision_time: Option<i64>,
    /// Main-key-encrypted content
    pub symmetrically_encrypted_content: Option<String>,
    /// Last local use
    pub last_used_time: Option<i64>,
    /// AutoFill candidate
    pub is_log_in_item: bool,
    /// Pinned
    pub pinned: bool,
    /// Pin time
    pub pin_time: Option<i64>,
    /// Last use reported by the server
    pub last_use_time: Option<i64>,
}

/// Column list matching [`ItemRow::from_row`]
pub const ITEM_COLUMNS: &str = "item_id, share_id, revision, content_format_version, rotation_id, \
     content, user_signature, item_key_signature, vault_key_packet_signature, state, \
     signature_email, alias_email, create_time, modify_time, revision_time, \
     symmetrically_encrypted_content, last_used_time, is_log_in_item, pinned, pin_time, \
     last_use_time";

impl ItemRow {
    const OBJECT: &'static str = "ItemEntity";

    /// Read a row selected with [`ITEM_COLUMNS`]
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: row.get(0)?,
            share_id: row.get(1)?,
            revision: row.get(2)?,
            content_format_version: row.get(3)?,
            rotation_id: row.get(4)?,
            content: row.get(5)?,
            user_signature: row.get(6)?,
            item_key_signature: row.get(7)?,
            vault_key_packet_signature: row.get(8)?,
            state: row.get(9)?,
            signature_email: row.get(10)?,
            alias_email: row.get(11)?,
            create_time: row.get(12)?,
            modify_time: row.get(13)?,
            revision_time: row.get(14)?,
            symmetrically_encrypted_content: row.get(15)?,
            last_used_time: row.get(16)?,
            is_log_in_item: row.get(17)?,
            pinned: row.get(18)?,
            pin_time: row.get(19)?,
            last_use_time: row.get(20)?,
        })
    }

    /// Flatten a cached item
    pub fn from_item(item: &SymmetricallyEncryptedItem) -> Self {
        let revision = &item.item;
        Self {
            item_id: revision.item_id.clone(),
            share_id: item.share_id.clone(),
            revision: Some(revision.revision),
            content_format_version: Some(revision.content_format_version),
            rotation_id: Some(revision.rotation_id.clone()),
            content: Some(revision.content.clone()),
            user_signature: Some(revision.user_signature.clone()),
            item_key_signature: Some(revision.item_key_signature.clone()),
            vault_key_packet_signature: revision.vault_key_packet_signature.clone(),
            state: Some(revision.state.into()),
            signature_email: Some(revision.signature_email.clone()),
            alias_email: revision.alias_email.clone(),
            create_time: Some(revision.create_time),
            modify_time: Some(revision.modify_time),
            revision_time: Some(revision.revision_time),
            symmetrically_encrypted_content: Some(item.encrypted_content.clone()),
            last_used_time: Some(item.last_used_time),
            is_log_in_item: item.is_log_in_item,
            pinned: item.pinned,
            pin_time: item.pin_time,
            last_use_time: revision.last_use_time,
        }
    }

    /// Convert to the domain type, naming the first missing field
    pub fn into_item(self) -> CoreResult<SymmetricallyEncryptedItem> {
        let o = Self::OBJECT;
        let revision = required(self.revision, o, "revision")?;
        let content_format_version = required(self.content_format_version, o, "contentFormatVersion")?;
        let rotation_id = required(self.rotation_id, o, "rotationID")?;
        let content = required(self.content, o, "content")?;
        let user_signature = required(self.user_signature, o, "userSignature")?;
        let item_key_signature = required(self.item_key_signature, o, "itemKeySignature")?;
        let state = ItemState::try_from(required(self.state, o, "state")?)?;
        let signature_email = required(self.signature_email, o, "signatureEmail")?;
        let create_time = required(self.create_time, o, "createTime")?;
        let modify_time = required(self.modify_time, o, "modifyTime")?;
        let revision_time = required(self.revision_time, o, "revisionTime")?;
        let encrypted_content = required(
            self.symmetrically_encrypted_content,
            o,
            "symmetricallyEncryptedContent",
        )?;
        let last_used_time = required(self.last_used_time, o, "lastUsedTime")?;

        Ok(SymmetricallyEncryptedItem {
            share_id: self.share_id,
            item: ItemRevision {
                item_id: self.item_id,
                revision,
                content_format_version,
                rotation_id,
                content,
                user_signature,
                item_key_signature,
                vault_key_packet_signature: self.vault_key_packet_signature,
                state,
                signature_email,
                alias_email: self.alias_email,
                create_time,
                modify_time,
                revision_time,
                last_use_time: self.last_use_time,
            },
            encrypted_content,
            last_used_time,
            is_log_in_item: self.is_log_in_item,
            pinned: self.pinned,
            pin_time: self.pin_time,
        })
    }
}

/// `shares` row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareRow {
    /// Share ID
    pub share_id: String,
    /// Vault ID
    pub vault_id: Option<String>,
    /// Address ID
    pub address_id: Option<String>,
    /// Target type
    pub target_type: Option<i64>,
    /// Target ID
    pub target_id: Option<String>,
    /// Permission
    pub permission: Option<i64>,
    /// Encrypted vault content
    pub content: Option<String>,
    /// Content key rotation
    pub content_key_rotation: Option<i64>,
    /// Content format version
    pub content_format_version: Option<i64>,
    /// Expiry
    pub expire_time: Option<i64>,
    /// Creation time
    pub create_time: Option<i64>,
}

/// Column list matching [`ShareRow::from_row`]
pub const SHARE_COLUMNS: &str = "share_id, vault_id, address_id, target_type, target_id, \
     permission, content, content_key_rotation, content_format_version, expire_time, create_time";

impl ShareRow {
    const OBJECT: &'static str = "ShareEntity";

    /// Read a row selected with [`SHARE_COLUMNS`]
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            share_id: row.get(0)?,
            vault_id: row.get(1)?,
            address_id: row.get(2)?,
            target_type: row.get(3)?,
            target_id: row.get(4)?,
            permission: row.get(5)?,
            content: row.get(6)?,
            content_key_rotation: row.get(7)?,
            content_format_version: row.get(8)?,
            expire_time: row.get(9)?,
            create_time: row.get(10)?,
        })
    }

    /// Flatten a share
    pub fn from_share(share: &Share) -> Self {
        Self {
            share_id: share.share_id.clone(),
            vault_id: Some(share.vault_id.clone()),
            address_id: Some(share.address_id.clone()),
            target_type: Some(share.target_type),
            target_id: Some(share.target_id.clone()),
            permission: Some(share.permission),
            content: share.content.clone(),
            content_key_rotation: share.content_key_rotation,
            content_format_version: share.content_format_version,
            expire_time: share.expire_time,
            create_time: Some(share.create_time),
        }
    }

    /// Convert to the domain type, naming the first missing field
    pub fn into_share(self) -> CoreResult<Share> {
        let o = Self::OBJECT;
        Ok(Share {
            vault_id: required(self.vault_id, o, "vaultID")?,
            address_id: required(self.address_id, o, "addressID")?,
            target_type: required(self.target_type, o, "targetType")?,
            target_id: required(self.target_id, o, "targetID")?,
            permission: required(self.permission, o, "permission")?,
            create_time: required(self.create_time, o, "createTime")?,
            share_id: self.share_id,
            content: self.content,
            content_key_rotation: self.content_key_rotation,
            content_format_version: self.content_format_version,
            expire_time: self.expire_time,
        })
    }
}

/// `vault_keys` / `share_keys` row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRow {
    /// Share ID
    pub share_id: String,
    /// Rotation ID
    pub rotation_id: String,
    /// Rotation
    pub rotation: Option<i64>,
    /// Armored locked key
    pub key: Option<String>,
    /// Sealed passphrase
    pub key_passphrase: Option<String>,
    /// Key signature
    pub key_signature: Option<String>,
    /// Creation time
    pub create_time: Option<i64>,
}

/// Column list matching [`KeyRow::from_row`]
pub const KEY_COLUMNS: &str =
    "share_id, rotation_id, rotation, key, key_passphrase, key_signature, create_time";

struct KeyFields {
    rotation_id: String,
    rotation: i64,
    key: String,
    key_passphrase: Option<String>,
    key_signature: String,
    create_time: i64,
}

impl KeyRow {
    /// Read a row selected with [`KEY_COLUMNS`]
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            share_id: row.get(0)?,
            rotation_id: row.get(1)?,
            rotation: row.get(2)?,
            key: row.get(3)?,
            key_passphrase: row.get(4)?,
            key_signature: row.get(5)?,
            create_time: row.get(6)?,
        })
    }

    /// Flatten a vault key
    pub fn from_vault_key(share_id: &str, key: &VaultKey) -> Self {
        Self {
            share_id: share_id.to_string(),
            rotation_id: key.rotation_id.clone(),
            rotation: Some(key.rotation),
            key: Some(key.key.clone()),
            key_passphrase: key.key_passphrase.clone(),
            key_signature: Some(key.key_signature.clone()),
            create_time: Some(key.create_time),
        }
    }

    /// Flatten an item key
    pub fn from_item_key(share_id: &str, key: &ItemKey) -> Self {
        Self {
            share_id: share_id.to_string(),
            rotation_id: key.rotation_id.clone(),
            rotation: Some(key.rotation),
            key: Some(key.key.clone()),
            key_passphrase: key.key_passphrase.clone(),
            key_signature: Some(key.key_signature.clone()),
            create_time: Some(key.create_time),
        }
    }

    fn fields(self, object: &str) -> CoreResult<KeyFields> {
        Ok(KeyFields {
            rotation: required(self.rotation, object, "rotation")?,
            key: required(self.key, object, "key")?,
            key_passphrase: self.key_passphrase,
            key_signature: required(self.key_signature, object, "keySignature")?,
            create_time: required(self.create_time, object, "createTime")?,
            rotation_id: self.rotation_id,
        })
    }

    /// Convert to a vault key
    pub fn into_vault_key(self) -> CoreResult<VaultKey> {
        let f = self.fields("VaultKeyEntity")?;
        Ok(VaultKey {
            rotation_id: f.rotation_id,
            rotation: f.rotation,
            key: f.key,
            key_passphrase: f.key_passphrase,
            key_signature: f.key_signature,
            create_time: f.create_time,
        })
    }

    /// Convert to an item key
    pub fn into_item_key(self) -> CoreResult<ItemKey> {
        let f = self.fields("ShareKeyEntity")?;
        Ok(ItemKey {
            rotation_id: f.rotation_id,
            rotation: f.rotation,
            key: f.key,
            key_passphrase: f.key_passphrase,
            key_signature: f.key_signature,
            create_time: f.create_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pass_core::fixtures::{TestKeys, XorLocker};
    use pass_core::ItemContent;

    fn item_row() -> ItemRow {
        let keys = TestKeys::new("share-1", "r1");
        let content = ItemContent::note("n", "body");
        let revision = keys.revision("item-1", 1, &content);
        let item = SymmetricallyEncryptedItem::seal("share-1", revision, &content, &XorLocker(3)).unwrap();
        ItemRow::from_item(&item)
    }

    #[test]
    fn test_item_row_roundtrip() {
        let row = item_row();
        let item = row.clone().into_item().unwrap();
        assert_eq!(ItemRow::from_item(&item), row);
    }

    #[test]
    fn test_server_last_use_kept_apart() {
        let row = item_row();
        assert_eq!(row.last_use_time, None);
        assert!(row.last_used_time.is_some());
        let item = row.into_item().unwrap();
        assert_eq!(item.item.last_use_time, None);

        let keys = TestKeys::new("share-1", "r1");
        let content = ItemContent::note("n", "body");
        let mut revision = keys.revision("item-1", 1, &content);
        revision.last_use_time = Some(1_750_000_000);
        let item = SymmetricallyEncryptedItem::seal("share-1", revision, &content, &XorLocker(3)).unwrap();
        let back = ItemRow::from_item(&item).into_item().unwrap();
        assert_eq!(back.item.last_use_time, Some(1_750_000_000));
        assert_eq!(back.last_used_time, 1_750_000_000);
    }

    #[test]
    fn test_first_missing_field_named() {
        let mut row = item_row();
        row.rotation_id = None;
        row.user_signature = None;
        let err = row.into_item().unwrap_err();
        assert_eq!(err.to_string(), "Corrupted ItemEntity: missing value for rotationID");
    }

    #[test]
    fn test_missing_encrypted_content_named() {
        let mut row = item_row();
        row.symmetrically_encrypted_content = None;
        let err = row.into_item().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Corrupted ItemEntity: missing value for symmetricallyEncryptedContent"
        );
    }

    #[test]
    fn test_unknown_state_rejected() {
        let mut row = item_row();
        row.state = Some(5);
        assert!(matches!(row.into_item(), Err(CoreError::UnknownState(5))));
    }

    #[test]
    fn test_key_row_missing_signature() {
        let keys = TestKeys::new("share-1", "r1");
        let mut row = KeyRow::from_vault_key("share-1", &keys.vault_key);
        row.key_signature = None;
        let err = row.into_vault_key().unwrap_err();
        assert_eq!(err.to_string(), "Corrupted VaultKeyEntity: missing value for keySignature");
    }

    #[test]
    fn test_share_row_missing_vault_id() {
        let row = ShareRow {
            share_id: "s".into(),
            ..Default::default()
        };
        let err = row.into_share().unwrap_err();
        assert_eq!(err.to_string(), "Corrupted ShareEntity: missing value for vaultID");
    }
}
