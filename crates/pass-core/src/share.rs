//! Shares and vault metadata

use crate::armor::{self, ArmorKind};
use crate::content::VaultContent;
use crate::crypto::seal_message;
use crate::error::{Error, Result};
use crate::keys::UnlockedVaultKey;
use serde::{Deserialize, Serialize};

/// What a share grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    /// A whole vault
    Vault = 1,
    /// A single item
    Item = 2,
}

impl TryFrom<i64> for TargetType {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(TargetType::Vault),
            2 => Ok(TargetType::Item),
            other => Err(Error::UnknownShareType(other)),
        }
    }
}

impl From<TargetType> for i64 {
    fn from(value: TargetType) -> Self {
        value as i64
    }
}

/// Access-control and key-distribution boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Share {
    /// Share ID
    #[serde(rename = "ShareID")]
    pub share_id: String,
    /// Vault ID
    #[serde(rename = "VaultID")]
    pub vault_id: String,
    /// Address the share was issued to
    #[serde(rename = "AddressID")]
    pub address_id: String,
    /// Wire value of [`TargetType`]
    pub target_type: i64,
    /// Vault or item ID
    #[serde(rename = "TargetID")]
    pub target_id: String,
    /// Permission bitmask
    pub permission: i64,
    /// Armored vault metadata message
    #[serde(default)]
    pub content: Option<String>,
    /// Vault key rotation the content is encrypted for
    #[serde(default)]
    pub content_key_rotation: Option<i64>,
    /// Content format version
    #[serde(default)]
    pub content_format_version: Option<i64>,
    /// Expiry (unix seconds)
    #[serde(default)]
    pub expire_time: Option<i64>,
    /// Creation time (unix seconds)
    pub create_time: i64,
}

impl Share {
    /// Typed target
    pub fn target(&self) -> Result<TargetType> {
        TargetType::try_from(self.target_type)
    }

    /// Decrypt vault metadata with the vault key of `contentKeyRotation`
    pub fn decrypt_vault_content(&self, vault: &UnlockedVaultKey) -> Result<VaultContent> {
        let content = self
            .content
            .as_deref()
            .ok_or_else(|| Error::corrupted("Share", "content"))?;
        let rotation = self
            .content_key_rotation
            .ok_or_else(|| Error::corrupted("Share", "contentKeyRotation"))?;
        if rotation != vault.rotation {
            return Err(Error::UnmatchedRotationId {
                left: rotation.to_string(),
                right: vault.rotation.to_string(),
            });
        }

        let message = armor::unarmor(ArmorKind::Message, content, "Share.content")?;
        let plaintext = vault.private_key().open(&message)?;
        VaultContent::from_bytes(&plaintext)
    }
}

/// Encrypt vault metadata for a vault key
pub fn encrypt_vault_content(content: &VaultContent, vault: &UnlockedVaultKey) -> Result<String> {
    let message = seal_message(&content.to_bytes(), vault.public_key().encryption_key())?;
    Ok(armor::armor(ArmorKind::Message, &message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::VaultDisplay;
    use crate::fixtures::TestKeys;

    fn share(keys: &TestKeys, content: Option<String>) -> Share {
        Share {
            share_id: "share-1".into(),
            vault_id: "vault-1".into(),
            address_id: "address-1".into(),
            target_type: 1,
            target_id: "vault-1".into(),
            permission: 1,
            content,
            content_key_rotation: Some(keys.vault.rotation),
            content_format_version: Some(1),
            expire_time: None,
            create_time: 0,
        }
    }

    #[test]
    fn test_vault_content_roundtrip() {
        let keys = TestKeys::new("share-1", "r1");
        let vault = VaultContent {
            name: "Personal".into(),
            description: "".into(),
            display: Some(VaultDisplay { icon: 3, color: 7 }),
        };
        let encrypted = encrypt_vault_content(&vault, &keys.vault).unwrap();
        let share = share(&keys, Some(encrypted));
        assert_eq!(share.target().unwrap(), TargetType::Vault);
        assert_eq!(share.decrypt_vault_content(&keys.vault).unwrap(), vault);
    }

    #[test]
    fn test_missing_content_named() {
        let keys = TestKeys::new("share-1", "r1");
        let err = share(&keys, None).decrypt_vault_content(&keys.vault).unwrap_err();
        assert_eq!(err.to_string(), "Corrupted Share: missing value for content");
    }

    #[test]
    fn test_unknown_target_type() {
        let keys = TestKeys::new("share-1", "r1");
        let mut share = share(&keys, None);
        share.target_type = 9;
        assert!(matches!(share.target(), Err(Error::UnknownShareType(9))));
    }
}
