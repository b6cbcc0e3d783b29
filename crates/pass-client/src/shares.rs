//! Share repository

use crate::api::PassApi;
use crate::keys::ShareKeyRepository;
use crate::{Result, SharedDatabase};
use pass_core::{Error as CoreError, Share, VaultContent};
use pass_storage_sqlite::{Error as StorageError, ShareStorage};
use std::sync::Arc;
use tracing::info;

/// Share list and vault metadata
pub struct ShareRepository {
    api: Arc<dyn PassApi>,
    db: SharedDatabase,
    keys: Arc<ShareKeyRepository>,
}

impl ShareRepository {
    /// Create repository
    pub fn new(api: Arc<dyn PassApi>, db: SharedDatabase, keys: Arc<ShareKeyRepository>) -> Self {
        Self { api, db, keys }
    }

    /// Replace the cached share set with the remote one. Shares that
    /// disappeared lose their items and keys.
    pub async fn refresh_shares(&self) -> Result<Vec<Share>> {
        let shares = self.api.get_shares().await?;
        let removed = {
            let db = self.db.lock();
            ShareStorage::replace_all(db.conn(), &shares)?
        };
        for share_id in &removed {
            self.keys.forget_share(share_id);
        }
        info!("Refreshed {} shares, removed {}", shares.len(), removed.len());
        Ok(shares)
    }

    /// Cached shares
    pub fn get_shares(&self) -> Result<Vec<Share>> {
        let db = self.db.lock();
        Ok(ShareStorage::get_all(db.conn())?)
    }

    /// Cached share
    pub fn get_share(&self, share_id: &str) -> Result<Option<Share>> {
        let db = self.db.lock();
        Ok(ShareStorage::get(db.conn(), share_id)?)
    }

    /// Decrypted vault metadata of a vault share
    pub async fn get_vault_content(&self, share_id: &str) -> Result<VaultContent> {
        let share = self
            .get_share(share_id)?
            .ok_or_else(|| StorageError::NotFound(format!("share {}", share_id)))?;
        let rotation = share
            .content_key_rotation
            .ok_or_else(|| CoreError::corrupted("Share", "contentKeyRotation"))?;
        let vault = self.keys.vault_key_for_rotation(share_id, rotation).await?;
        Ok(share.decrypt_vault_content(&vault)?)
    }
}
