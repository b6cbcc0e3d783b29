//! In-process Pass server
//!
//! [`InMemoryPassServer`] implements [`PassApi`] with the server's
//! authoritative revision rules: creation yields revision 1, every accepted
//! update or state transition increments the revision by one, a stale
//! `LastRevision` is a conflict, per-item batch failures are omitted from the
//! response and deletion requires the trashed state.

use crate::api::PassApi;
use crate::{Error, Result};
use async_trait::async_trait;
use pass_core::armor::{decode_base64, encode_base64};
use pass_core::share::encrypt_vault_content;
use pass_core::{
    AddressKey, CreateItemRequest, ItemAction, ItemKey, ItemRevision, ItemRevisionList, ItemState,
    ItemTransition, ModifiedItem, Share, ShareKeys, TargetType, TrashItemsRequest,
    UpdateItemRequest, VaultContent, VaultKey, CONTENT_FORMAT_VERSION,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

const CODE_NOT_FOUND: i64 = 2001;
const CODE_INVALID_STATE: i64 = 2011;
const CODE_INVALID_REQUEST: i64 = 2000;

struct ShareState {
    share: Share,
    signature_email: String,
    keys: ShareKeys,
    items: Vec<ItemRevision>,
}

impl ShareState {
    fn item_mut(&mut self, item_id: &str) -> Option<&mut ItemRevision> {
        self.items.iter_mut().find(|i| i.item_id == item_id)
    }
}

/// Authoritative in-memory server
pub struct InMemoryPassServer {
    shares: Mutex<Vec<ShareState>>,
    clock: AtomicI64,
}

impl Default for InMemoryPassServer {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(what: &str, id: &str) -> Error {
    Error::Api {
        status: 404,
        code: CODE_NOT_FOUND,
        message: format!("{} {} does not exist", what, id),
    }
}

fn invalid(message: String) -> Error {
    Error::Api {
        status: 422,
        code: CODE_INVALID_REQUEST,
        message,
    }
}

impl InMemoryPassServer {
    /// Empty server
    pub fn new() -> Self {
        Self {
            shares: Mutex::new(Vec::new()),
            clock: AtomicI64::new(chrono::Utc::now().timestamp()),
        }
    }

    /// Strictly increasing timestamps
    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn with_share<T>(&self, share_id: &str, f: impl FnOnce(&mut ShareState) -> Result<T>) -> Result<T> {
        let mut shares = self.shares.lock();
        let state = shares
            .iter_mut()
            .find(|s| s.share.share_id == share_id)
            .ok_or_else(|| not_found("Share", share_id))?;
        f(state)
    }

    /// Create a vault owned by `address`, with a first key rotation and
    /// encrypted metadata. Returns the share.
    pub fn create_vault(
        &self,
        address: &AddressKey,
        share_id: &str,
        rotation_id: &str,
        content: &VaultContent,
    ) -> Result<Share> {
        let now = self.tick();
        let (vault_key, vault) = VaultKey::issue(rotation_id, 1, address, now)?;
        let (item_key, _) = ItemKey::issue(&vault, address, now)?;

        let vault_id = format!("vault-{}", uuid::Uuid::new_v4().simple());
        let share = Share {
            share_id: share_id.to_string(),
            vault_id: vault_id.clone(),
            address_id: address.address_id.clone(),
            target_type: TargetType::Vault.into(),
            target_id: vault_id,
            permission: 1,
            content: Some(encrypt_vault_content(content, &vault)?),
            content_key_rotation: Some(1),
            content_format_version: Some(CONTENT_FORMAT_VERSION),
            expire_time: None,
            create_time: now,
        };

        self.shares.lock().push(ShareState {
            share: share.clone(),
            signature_email: address.email.clone(),
            keys: ShareKeys {
                share_id: share_id.to_string(),
                vault_keys: vec![vault_key],
                item_keys: vec![item_key],
            },
            items: Vec::new(),
        });
        Ok(share)
    }

    /// Issue a new key rotation for a vault. New items are encrypted with it.
    pub fn rotate_vault_key(&self, address: &AddressKey, share_id: &str, rotation_id: &str) -> Result<()> {
        let now = self.tick();
        self.with_share(share_id, |state| {
            let rotation = state
                .keys
                .vault_keys
                .iter()
                .map(|k| k.rotation)
                .max()
                .unwrap_or(0)
                + 1;
            let (vault_key, vault) = VaultKey::issue(rotation_id, rotation, address, now)?;
            let (item_key, _) = ItemKey::issue(&vault, address, now)?;
            state.keys.vault_keys.push(vault_key);
            state.keys.item_keys.push(item_key);
            Ok(())
        })
    }

    /// Remove a share
    pub fn remove_share(&self, share_id: &str) {
        self.shares.lock().retain(|s| s.share.share_id != share_id);
    }

    /// Latest stored revision of an item
    pub fn item(&self, share_id: &str, item_id: &str) -> Option<ItemRevision> {
        self.with_share(share_id, |state| Ok(state.item_mut(item_id).cloned()))
            .ok()
            .flatten()
    }

    /// Number of items stored for a share
    pub fn item_count(&self, share_id: &str) -> usize {
        self.with_share(share_id, |state| Ok(state.items.len())).unwrap_or(0)
    }

    /// Mutate a stored revision in place without bumping its revision.
    /// Models corruption between the client and the server.
    pub fn tamper(&self, share_id: &str, item_id: &str, f: impl FnOnce(&mut ItemRevision)) -> bool {
        self.with_share(share_id, |state| Ok(state.item_mut(item_id).map(f).is_some()))
            .unwrap_or(false)
    }

    fn transition(&self, share_id: &str, request: TrashItemsRequest, action: ItemAction) -> Result<Vec<ModifiedItem>> {
        let now = self.tick();
        self.with_share(share_id, |state| {
            let mut modified = Vec::new();
            for r in &request.items {
                let Some(item) = state.item_mut(&r.item_id) else {
                    continue;
                };
                if item.revision != r.revision {
                    continue;
                }
                let Ok(ItemTransition::To(next)) = item.state.apply(action) else {
                    continue;
                };
                item.state = next;
                item.revision += 1;
                item.modify_time = now;
                item.revision_time = now;
                modified.push(ModifiedItem {
                    item_id: item.item_id.clone(),
                    revision: item.revision,
                    state: item.state,
                    modify_time: now,
                    revision_time: now,
                });
            }
            Ok(modified)
        })
    }
}

#[async_trait]
impl PassApi for InMemoryPassServer {
    async fn get_shares(&self) -> Result<Vec<Share>> {
        Ok(self.shares.lock().iter().map(|s| s.share.clone()).collect())
    }

    async fn get_share_keys(&self, share_id: &str) -> Result<ShareKeys> {
        self.with_share(share_id, |state| Ok(state.keys.clone()))
    }

    async fn get_items(&self, share_id: &str, page: u32, page_size: u32) -> Result<ItemRevisionList> {
        self.with_share(share_id, |state| {
            let size = page_size.max(1) as usize;
            let revisions_data = state
                .items
                .iter()
                .skip(page as usize * size)
                .take(size)
                .cloned()
                .collect();
            Ok(ItemRevisionList {
                total: state.items.len() as i64,
                revisions_data,
            })
        })
    }

    async fn get_item(&self, share_id: &str, item_id: &str) -> Result<ItemRevision> {
        self.with_share(share_id, |state| {
            state
                .item_mut(item_id)
                .cloned()
                .ok_or_else(|| not_found("Item", item_id))
        })
    }

    async fn create_item(&self, share_id: &str, request: CreateItemRequest) -> Result<ItemRevision> {
        let now = self.tick();
        self.with_share(share_id, |state| {
            if state.keys.resolve_vault_key(&request.rotation_id).is_err() {
                return Err(invalid(format!("Unknown rotation {}", request.rotation_id)));
            }
            if request.content_format_version != CONTENT_FORMAT_VERSION {
                return Err(invalid(format!(
                    "Unsupported content format version {}",
                    request.content_format_version
                )));
            }
            let mut message = decode_base64(&request.vault_key_packet, "VaultKeyPacket")
                .map_err(|e| invalid(e.to_string()))?;
            message.extend(decode_base64(&request.content, "Content").map_err(|e| invalid(e.to_string()))?);

            let item = ItemRevision {
                item_id: uuid::Uuid::new_v4().simple().to_string(),
                revision: 1,
                content_format_version: request.content_format_version,
                rotation_id: request.rotation_id,
                content: encode_base64(&message),
                user_signature: request.user_signature,
                item_key_signature: request.item_key_signature,
                vault_key_packet_signature: Some(request.vault_key_packet_signature),
                state: ItemState::Active,
                signature_email: state.signature_email.clone(),
                alias_email: None,
                create_time: now,
                modify_time: now,
                revision_time: now,
                last_use_time: None,
            };
            state.items.push(item.clone());
            Ok(item)
        })
    }

    async fn update_item(
        &self,
        share_id: &str,
        item_id: &str,
        request: UpdateItemRequest,
    ) -> Result<ItemRevision> {
        let now = self.tick();
        self.with_share(share_id, |state| {
            if state.keys.resolve_vault_key(&request.rotation_id).is_err() {
                return Err(invalid(format!("Unknown rotation {}", request.rotation_id)));
            }
            let item = state
                .item_mut(item_id)
                .ok_or_else(|| not_found("Item", item_id))?;
            if item.revision != request.last_revision {
                return Err(Error::Conflict(format!(
                    "Item {} is at revision {}, not {}",
                    item_id, item.revision, request.last_revision
                )));
            }
            item.revision += 1;
            item.rotation_id = request.rotation_id;
            item.content = request.content;
            item.content_format_version = request.content_format_version;
            item.user_signature = request.user_signature;
            item.item_key_signature = request.item_key_signature;
            item.vault_key_packet_signature = None;
            item.modify_time = now;
            item.revision_time = now;
            Ok(item.clone())
        })
    }

    async fn trash_items(&self, share_id: &str, request: TrashItemsRequest) -> Result<Vec<ModifiedItem>> {
        self.transition(share_id, request, ItemAction::Trash)
    }

    async fn untrash_items(
        &self,
        share_id: &str,
        request: TrashItemsRequest,
    ) -> Result<Vec<ModifiedItem>> {
        self.transition(share_id, request, ItemAction::Untrash)
    }

    async fn delete_items(&self, share_id: &str, request: TrashItemsRequest) -> Result<()> {
        self.with_share(share_id, |state| {
            for r in &request.items {
                let item = state
                    .item_mut(&r.item_id)
                    .ok_or_else(|| not_found("Item", &r.item_id))?;
                if item.revision != r.revision {
                    return Err(Error::Conflict(format!(
                        "Item {} is at revision {}, not {}",
                        r.item_id, item.revision, r.revision
                    )));
                }
                if item.state != ItemState::Trashed {
                    return Err(Error::Api {
                        status: 422,
                        code: CODE_INVALID_STATE,
                        message: format!("Item {} is not trashed", r.item_id),
                    });
                }
            }
            state
                .items
                .retain(|i| !request.items.iter().any(|r| r.item_id == i.item_id));
            Ok(())
        })
    }

    async fn update_last_use_time(&self, share_id: &str, item_id: &str, time: i64) -> Result<ItemRevision> {
        self.with_share(share_id, |state| {
            let item = state
                .item_mut(item_id)
                .ok_or_else(|| not_found("Item", item_id))?;
            item.last_use_time = Some(time);
            Ok(item.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pass_core::{encrypt_item, ItemContent, ItemRevisionRef};

    fn server_with_vault() -> (InMemoryPassServer, AddressKey) {
        let server = InMemoryPassServer::new();
        let address = AddressKey::generate("address-1", "user@proton.me");
        server
            .create_vault(&address, "share-1", "r1", &VaultContent::default())
            .unwrap();
        (server, address)
    }

    fn request_for(server: &InMemoryPassServer, address: &AddressKey) -> CreateItemRequest {
        let keys = server.with_share("share-1", |s| Ok(s.keys.clone())).unwrap();
        let vault = keys.vault_keys[0].unlock(address).unwrap();
        let item = keys.item_keys[0].unlock(&vault, &address.public_key()).unwrap();
        let sealed = encrypt_item(&ItemContent::note("n", ""), &vault, &item, address).unwrap();
        CreateItemRequest::new(&sealed)
    }

    #[tokio::test]
    async fn test_revisions_advance() {
        let (server, address) = server_with_vault();
        let created = server.create_item("share-1", request_for(&server, &address)).await.unwrap();
        assert_eq!(created.revision, 1);

        let trash = |revision| TrashItemsRequest {
            items: vec![ItemRevisionRef {
                item_id: created.item_id.clone(),
                revision,
            }],
        };
        let modified = server.trash_items("share-1", trash(1)).await.unwrap();
        assert_eq!(modified[0].revision, 2);
        assert_eq!(modified[0].state, ItemState::Trashed);

        // Stale or illegal transitions are omitted
        assert!(server.trash_items("share-1", trash(2)).await.unwrap().is_empty());
        assert!(server.untrash_items("share-1", trash(1)).await.unwrap().is_empty());

        server.delete_items("share-1", trash(2)).await.unwrap();
        assert_eq!(server.item_count("share-1"), 0);
    }

    #[tokio::test]
    async fn test_delete_requires_trashed() {
        let (server, address) = server_with_vault();
        let created = server.create_item("share-1", request_for(&server, &address)).await.unwrap();
        let request = TrashItemsRequest {
            items: vec![created.revision_ref()],
        };
        assert!(matches!(
            server.delete_items("share-1", request).await,
            Err(Error::Api { code: CODE_INVALID_STATE, .. })
        ));
        assert_eq!(server.item_count("share-1"), 1);
    }

    #[tokio::test]
    async fn test_unknown_share() {
        let server = InMemoryPassServer::new();
        assert!(matches!(
            server.get_share_keys("nope").await,
            Err(Error::Api { status: 404, .. })
        ));
    }
}
