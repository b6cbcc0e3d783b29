//! Share key resolution
//!
//! Keys resolve local-first. A rotation that is not cached locally triggers
//! one remote refetch of the share's keys before failing with `KeyNotFound`.
//! Unlocked keys are kept in memory per `(share_id, rotation_id)`.

use crate::api::PassApi;
use crate::{Result, SharedDatabase};
use parking_lot::RwLock;
use pass_core::{AddressKey, OpenKeys, PublicKey, ShareKeys, UnlockedItemKey, UnlockedVaultKey};
use pass_storage_sqlite::KeyStorage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Unlocked keys of one rotation
#[derive(Clone)]
pub struct ResolvedKeys {
    /// Vault key
    pub vault: UnlockedVaultKey,
    /// Item key
    pub item: UnlockedItemKey,
    /// Verified item key public part
    pub item_public: PublicKey,
    /// Public key expected to have signed item content
    pub signer: PublicKey,
}

impl ResolvedKeys {
    /// Rotation ID
    pub fn rotation_id(&self) -> &str {
        &self.vault.rotation_id
    }

    /// Keys for opening an envelope of this rotation
    pub fn open_keys(&self) -> OpenKeys<'_> {
        OpenKeys {
            vault: &self.vault,
            item_key: &self.item_public,
            signer: &self.signer,
        }
    }
}

/// Resolves and caches share keys
pub struct ShareKeyRepository {
    api: Arc<dyn PassApi>,
    db: SharedDatabase,
    address: AddressKey,
    unlocked: RwLock<HashMap<(String, String), ResolvedKeys>>,
}

impl ShareKeyRepository {
    /// Create a repository for the user's address key
    pub fn new(api: Arc<dyn PassApi>, db: SharedDatabase, address: AddressKey) -> Self {
        Self {
            api,
            db,
            address,
            unlocked: RwLock::new(HashMap::new()),
        }
    }

    /// Address key used to unlock vault keys and sign content
    pub fn address(&self) -> &AddressKey {
        &self.address
    }

    /// Keys of a share, from the local store unless empty or `force_refresh`
    pub async fn get_share_keys(&self, share_id: &str, force_refresh: bool) -> Result<ShareKeys> {
        if !force_refresh {
            let local = {
                let db = self.db.lock();
                KeyStorage::get_share_keys(db.conn(), share_id)?
            };
            if !local.vault_keys.is_empty() {
                return Ok(local);
            }
        }
        self.refresh_share_keys(share_id).await
    }

    /// Fetch the share's keys from remote and persist them
    pub async fn refresh_share_keys(&self, share_id: &str) -> Result<ShareKeys> {
        let keys = self.api.get_share_keys(share_id).await?;
        keys.validate()?;
        {
            let db = self.db.lock();
            KeyStorage::upsert_share_keys(db.conn(), &keys)?;
        }
        debug!(
            "Fetched {} vault keys and {} item keys for share {}",
            keys.vault_keys.len(),
            keys.item_keys.len(),
            share_id
        );
        Ok(keys)
    }

    /// Unlocked keys of a rotation, refetching once when the rotation is unknown
    pub async fn resolve(&self, share_id: &str, rotation_id: &str) -> Result<ResolvedKeys> {
        let cache_key = (share_id.to_string(), rotation_id.to_string());
        let cached = self.unlocked.read().get(&cache_key).cloned();
        if let Some(keys) = cached {
            return Ok(keys);
        }

        let mut keys = self.get_share_keys(share_id, false).await?;
        if keys.resolve_vault_key(rotation_id).is_err() {
            info!(
                "Rotation {} of share {} is not cached, refetching keys",
                rotation_id, share_id
            );
            keys = self.refresh_share_keys(share_id).await?;
        }

        let resolved = self.unlock(&keys, rotation_id)?;
        self.unlocked.write().insert(cache_key, resolved.clone());
        Ok(resolved)
    }

    fn unlock(&self, keys: &ShareKeys, rotation_id: &str) -> Result<ResolvedKeys> {
        let vault_key = keys.resolve_vault_key(rotation_id)?;
        let item_key = keys.resolve_item_key(rotation_id)?;
        let vault = vault_key.unlock(&self.address)?;
        let signer = self.address.public_key();
        let item = item_key.unlock(&vault, &signer)?;
        Ok(ResolvedKeys {
            item_public: item.public_key(),
            vault,
            item,
            signer,
        })
    }

    /// Keys of the latest rotation, used to encrypt new content
    pub async fn latest(&self, share_id: &str) -> Result<ResolvedKeys> {
        let keys = self.get_share_keys(share_id, false).await?;
        let rotation_id = keys.latest()?.0.rotation_id.clone();
        self.resolve(share_id, &rotation_id).await
    }

    /// Vault key by rotation number, as referenced by share content
    pub async fn vault_key_for_rotation(&self, share_id: &str, rotation: i64) -> Result<UnlockedVaultKey> {
        let mut keys = self.get_share_keys(share_id, false).await?;
        if keys.resolve_vault_key_by_rotation(rotation).is_err() {
            keys = self.refresh_share_keys(share_id).await?;
        }
        let rotation_id = keys.resolve_vault_key_by_rotation(rotation)?.rotation_id.clone();
        Ok(self.resolve(share_id, &rotation_id).await?.vault)
    }

    /// Drop unlocked keys of a share
    pub fn forget_share(&self, share_id: &str) {
        self.unlocked.write().retain(|(s, _), _| s != share_id);
    }
}
