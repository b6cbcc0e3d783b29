//! Item repository
//!
//! Mediates every item read and write between the local cache and the API:
//!
//! - **Refresh**: pages through remote revisions, verifies each envelope and
//!   re-encrypts verified content with the main key before caching it
//! - **Writes**: create, update, trash, untrash and delete are revision-checked
//!   and serialized per item
//! - **Conflicts**: refreshed once and retried once when safe, surfaced otherwise

use crate::api::PassApi;
use crate::cancel::CancelToken;
use crate::config::ClientConfig;
use crate::keys::{ResolvedKeys, ShareKeyRepository};
use crate::{Error, Result, SharedDatabase};
use pass_core::{
    chunked, decrypt_item, encrypt_item, BatchOutcome, CreateItemRequest, ErrorCategory,
    FailedItem, FailureReason, ItemAction, ItemContent, ItemRevision, ItemRevisionRef, ItemState,
    SymmetricallyEncryptedItem, TrashItemsRequest, UpdateItemRequest,
};
use pass_storage_sqlite::{Error as StorageError, ItemStorage, MasterKey};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Item excluded from the cache because it failed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    /// Item ID
    pub item_id: String,
    /// Rejected revision
    pub revision: i64,
    /// Failure category
    pub category: ErrorCategory,
    /// Failure description
    pub reason: String,
}

/// Result of refreshing one share
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Share ID
    pub share_id: String,
    /// Revisions received from remote
    pub fetched: usize,
    /// Verified items written to the cache
    pub stored: usize,
    /// Items that failed verification
    pub rejected: Vec<RejectedItem>,
}

/// Per-item write locks
#[derive(Default)]
struct ItemLocks {
    locks: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ItemLocks {
    fn key(share_id: &str, item_id: &str) -> String {
        format!("{}/{}", share_id, item_id)
    }

    async fn lock(&self, share_id: &str, item_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(Self::key(share_id, item_id)).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Lock several items in a stable order
    async fn lock_all<'a>(&self, ids: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<OwnedMutexGuard<()>> {
        let ordered: BTreeSet<(&str, &str)> = ids.collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for (share_id, item_id) in ordered {
            guards.push(self.lock(share_id, item_id).await);
        }
        guards
    }
}

/// Decrypt and re-encrypt a page of revisions. Runs on the blocking pool.
fn open_revisions(
    share_id: &str,
    revisions: Vec<ItemRevision>,
    keys: &HashMap<String, ResolvedKeys>,
    key_errors: &HashMap<String, (ErrorCategory, String)>,
    master_key: &MasterKey,
) -> Result<(Vec<SymmetricallyEncryptedItem>, Vec<RejectedItem>)> {
    let mut items = Vec::with_capacity(revisions.len());
    let mut rejected = Vec::new();

    for revision in revisions {
        let opened = match keys.get(&revision.rotation_id) {
            Some(keys) => decrypt_item(&revision, keys.open_keys())
                .map_err(|e| (e.category(), e.to_string())),
            None => Err(key_errors
                .get(&revision.rotation_id)
                .cloned()
                .unwrap_or_else(|| {
                    (
                        ErrorCategory::Keys,
                        format!("No key for rotation {}", revision.rotation_id),
                    )
                })),
        };
        match opened {
            Ok(content) => {
                items.push(SymmetricallyEncryptedItem::seal(share_id, revision, &content, master_key)?);
            }
            Err((category, reason)) => {
                warn!(
                    "Rejected item {} revision {} of share {}: {}",
                    revision.item_id, revision.revision, share_id, reason
                );
                rejected.push(RejectedItem {
                    item_id: revision.item_id,
                    revision: revision.revision,
                    category,
                    reason,
                });
            }
        }
    }
    Ok((items, rejected))
}

/// Item repository
pub struct ItemRepository {
    api: Arc<dyn PassApi>,
    db: SharedDatabase,
    keys: Arc<ShareKeyRepository>,
    master_key: MasterKey,
    config: ClientConfig,
    locks: ItemLocks,
}

impl ItemRepository {
    /// Create repository
    pub fn new(
        api: Arc<dyn PassApi>,
        db: SharedDatabase,
        keys: Arc<ShareKeyRepository>,
        config: ClientConfig,
    ) -> Self {
        let master_key = db.lock().master_key().clone();
        Self {
            api,
            db,
            keys,
            master_key,
            config,
            locks: ItemLocks::default(),
        }
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Replace the share's cached items with the verified remote state.
    ///
    /// Writes that land while the listing is in flight are kept: a cached
    /// revision never goes backwards, and items created or changed locally
    /// after the listing started are not removed.
    pub async fn refresh_items(&self, share_id: &str, cancel: &CancelToken) -> Result<RefreshReport> {
        let known = {
            let db = self.db.lock();
            ItemStorage::revisions(db.conn(), share_id)?
        };
        let mut revisions = Vec::new();
        let mut page = 0u32;
        loop {
            cancel.check()?;
            let list = self.api.get_items(share_id, page, self.config.page_size).await?;
            let received = list.revisions_data.len();
            revisions.extend(list.revisions_data);
            debug!("Fetched page {} of share {} ({} items)", page, share_id, received);
            if received == 0 || revisions.len() as i64 >= list.total {
                break;
            }
            page += 1;
        }
        let fetched = revisions.len();

        let rotations: BTreeSet<String> = revisions.iter().map(|r| r.rotation_id.clone()).collect();
        let mut keys = HashMap::new();
        let mut key_errors = HashMap::new();
        for rotation_id in rotations {
            cancel.check()?;
            match self.keys.resolve(share_id, &rotation_id).await {
                Ok(resolved) => {
                    keys.insert(rotation_id, resolved);
                }
                Err(e @ (Error::Transport(_) | Error::Cancelled)) => return Err(e),
                Err(e) => {
                    warn!("Cannot resolve rotation {} of share {}: {}", rotation_id, share_id, e);
                    key_errors.insert(rotation_id, (e.category(), e.to_string()));
                }
            }
        }

        let master_key = self.master_key.clone();
        let owned_share_id = share_id.to_string();
        let (items, rejected) = tokio::task::spawn_blocking(move || {
            open_revisions(&owned_share_id, revisions, &keys, &key_errors, &master_key)
        })
        .await??;

        cancel.check()?;
        let stored = {
            let db = self.db.lock();
            ItemStorage::replace_share_items(db.conn(), share_id, &items, &known)?
        };
        if stored < items.len() {
            debug!(
                "Kept {} newer local items of share {}",
                items.len() - stored,
                share_id
            );
        }

        info!(
            "Refreshed share {}: {} fetched, {} stored, {} rejected",
            share_id,
            fetched,
            stored,
            rejected.len()
        );
        Ok(RefreshReport {
            share_id: share_id.to_string(),
            fetched,
            stored,
            rejected,
        })
    }

    /// Item revisions of a share, local first with remote fallback
    pub async fn get_item_revisions(
        &self,
        share_id: &str,
        force_refresh: bool,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ItemRevision>> {
        if !force_refresh {
            let local = self.get_items(share_id, None)?;
            if !local.is_empty() {
                let size = page_size.max(1) as usize;
                return Ok(local
                    .into_iter()
                    .skip(page as usize * size)
                    .take(size)
                    .map(|i| i.item)
                    .collect());
            }
        }
        Ok(self.api.get_items(share_id, page, page_size).await?.revisions_data)
    }

    // ------------------------------------------------------------------
    // Local reads
    // ------------------------------------------------------------------

    /// Cached items of a share, optionally in one state
    pub fn get_items(&self, share_id: &str, state: Option<ItemState>) -> Result<Vec<SymmetricallyEncryptedItem>> {
        let db = self.db.lock();
        let items = match state {
            Some(state) => ItemStorage::get_items_by_state(db.conn(), share_id, state)?,
            None => ItemStorage::get_items(db.conn(), share_id)?,
        };
        Ok(items)
    }

    /// Cached item
    pub fn get_item(&self, share_id: &str, item_id: &str) -> Result<Option<SymmetricallyEncryptedItem>> {
        let db = self.db.lock();
        Ok(ItemStorage::get_item(db.conn(), share_id, item_id)?)
    }

    /// Decrypt cached content
    pub fn get_item_content(&self, item: &SymmetricallyEncryptedItem) -> Result<ItemContent> {
        Ok(item.decrypt_content(&self.master_key)?)
    }

    /// Active login items across shares
    pub fn get_active_log_in_items(&self) -> Result<Vec<SymmetricallyEncryptedItem>> {
        let db = self.db.lock();
        Ok(ItemStorage::get_active_log_in_items(db.conn())?)
    }

    /// Alias item by alias email
    pub fn get_alias_item(&self, email: &str) -> Result<Option<SymmetricallyEncryptedItem>> {
        let db = self.db.lock();
        Ok(ItemStorage::get_alias_item(db.conn(), email)?)
    }

    /// Pinned items across shares
    pub fn get_pinned_items(&self) -> Result<Vec<SymmetricallyEncryptedItem>> {
        let db = self.db.lock();
        Ok(ItemStorage::get_pinned_items(db.conn())?)
    }

    fn store(&self, item: &SymmetricallyEncryptedItem) -> Result<SymmetricallyEncryptedItem> {
        let db = self.db.lock();
        ItemStorage::upsert_many(db.conn(), std::slice::from_ref(item))?;
        ItemStorage::get_item(db.conn(), &item.share_id, item.item_id())?
            .ok_or_else(|| StorageError::NotFound(format!("item {}", item.item_id())).into())
    }

    /// Newest of the local row and the caller's copy
    fn latest_local(&self, item: &SymmetricallyEncryptedItem) -> Result<SymmetricallyEncryptedItem> {
        let local = self.get_item(&item.share_id, item.item_id())?;
        Ok(match local {
            Some(local) if local.item.revision >= item.item.revision => local,
            _ => item.clone(),
        })
    }

    /// Verify a remote revision and cache it
    async fn store_remote(
        &self,
        share_id: &str,
        revision: ItemRevision,
    ) -> Result<(SymmetricallyEncryptedItem, ItemContent)> {
        let keys = self.keys.resolve(share_id, &revision.rotation_id).await?;
        let content = decrypt_item(&revision, keys.open_keys())?;
        let sealed = SymmetricallyEncryptedItem::seal(share_id, revision, &content, &self.master_key)?;
        Ok((self.store(&sealed)?, content))
    }

    // ------------------------------------------------------------------
    // Create and update
    // ------------------------------------------------------------------

    /// Encrypt with the latest rotation and create remotely
    pub async fn create_item(&self, share_id: &str, content: &ItemContent) -> Result<SymmetricallyEncryptedItem> {
        let keys = self.keys.latest(share_id).await?;
        let sealed = encrypt_item(content, &keys.vault, &keys.item, self.keys.address())?;
        let revision = self
            .api
            .create_item(share_id, CreateItemRequest::new(&sealed))
            .await?;
        let item = SymmetricallyEncryptedItem::seal(share_id, revision, content, &self.master_key)?;
        info!("Created item {} in share {}", item.item_id(), share_id);
        self.store(&item)
    }

    async fn send_update(&self, base: &ItemRevision, share_id: &str, content: &ItemContent) -> Result<ItemRevision> {
        let keys = self.keys.latest(share_id).await?;
        let sealed = encrypt_item(content, &keys.vault, &keys.item, self.keys.address())?;
        self.api
            .update_item(share_id, &base.item_id, UpdateItemRequest::new(&sealed, base.revision))
            .await
    }

    /// Replace an item's content.
    ///
    /// On a revision conflict the item is refreshed once. Remote content equal
    /// to `content` means this edit already landed and the refreshed item is
    /// returned. The update is retried only if the remote content still equals
    /// the content this edit was based on, otherwise the conflict is returned
    /// and the cache holds the remote revision.
    pub async fn update_item(
        &self,
        item: &SymmetricallyEncryptedItem,
        content: &ItemContent,
    ) -> Result<SymmetricallyEncryptedItem> {
        let share_id = item.share_id.as_str();
        let _guard = self.locks.lock(share_id, item.item_id()).await;

        let current = self.latest_local(item)?;
        let base_content = current.decrypt_content(&self.master_key)?;

        let revision = match self.send_update(&current.item, share_id, content).await {
            Err(e) if e.is_conflict() => {
                warn!(
                    "Update of item {} at revision {} conflicted, refreshing",
                    current.item_id(),
                    current.item.revision
                );
                let remote = self.api.get_item(share_id, current.item_id()).await?;
                let (refreshed, remote_content) = self.store_remote(share_id, remote).await?;
                if remote_content == *content {
                    info!(
                        "Update of item {} already applied at revision {}",
                        refreshed.item_id(),
                        refreshed.item.revision
                    );
                    return Ok(refreshed);
                }
                if remote_content != base_content {
                    return Err(e);
                }
                debug!(
                    "Content of item {} unchanged remotely, retrying at revision {}",
                    refreshed.item_id(),
                    refreshed.item.revision
                );
                self.send_update(&refreshed.item, share_id, content).await?
            }
            result => result?,
        };

        let updated = SymmetricallyEncryptedItem::seal(share_id, revision, content, &self.master_key)?;
        self.store(&updated)
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Move items to the trash
    pub async fn trash_items(&self, items: &[SymmetricallyEncryptedItem], cancel: &CancelToken) -> Result<BatchOutcome> {
        self.transition_items(items, ItemAction::Trash, cancel).await
    }

    /// Restore items from the trash
    pub async fn untrash_items(
        &self,
        items: &[SymmetricallyEncryptedItem],
        cancel: &CancelToken,
    ) -> Result<BatchOutcome> {
        self.transition_items(items, ItemAction::Untrash, cancel).await
    }

    /// Permanently delete trashed items
    pub async fn delete_items(&self, items: &[SymmetricallyEncryptedItem], cancel: &CancelToken) -> Result<BatchOutcome> {
        self.transition_items(items, ItemAction::Delete, cancel).await
    }

    async fn transition_items(
        &self,
        items: &[SymmetricallyEncryptedItem],
        action: ItemAction,
        cancel: &CancelToken,
    ) -> Result<BatchOutcome> {
        let _guards = self
            .locks
            .lock_all(items.iter().map(|i| (i.share_id.as_str(), i.item_id())))
            .await;

        let mut by_share: BTreeMap<&str, Vec<&SymmetricallyEncryptedItem>> = BTreeMap::new();
        for item in items {
            by_share.entry(item.share_id.as_str()).or_default().push(item);
        }

        let mut outcome = BatchOutcome::default();
        for (share_id, share_items) in by_share {
            cancel.check()?;
            let mut requested = Vec::with_capacity(share_items.len());
            for item in share_items {
                let current = self.latest_local(item)?;
                match current.item.transition(action) {
                    Ok(_) => requested.push(current.item.revision_ref()),
                    Err(e) => outcome.failed.push(FailedItem {
                        item_id: current.item.item_id.clone(),
                        revision: current.item.revision,
                        reason: FailureReason::InvalidState(e.to_string()),
                    }),
                }
            }

            let mut first = self.send_transitions(share_id, &requested, action, cancel).await?;
            let (retried, retried_ids) = self.retry_stale(share_id, &first, action, cancel).await?;
            first.failed.retain(|f| !retried_ids.contains(&f.item_id));
            outcome.merge(first);
            outcome.merge(retried);
        }
        outcome.retain_unresolved_failures();

        info!(
            "{} of {} items: {} succeeded, {} deleted, {} failed",
            action,
            items.len(),
            outcome.succeeded.len(),
            outcome.deleted.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    async fn send_transitions(
        &self,
        share_id: &str,
        refs: &[ItemRevisionRef],
        action: ItemAction,
        cancel: &CancelToken,
    ) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for chunk in chunked(refs, self.config.batch_size) {
            cancel.check()?;
            let request = TrashItemsRequest { items: chunk.to_vec() };
            let chunk_outcome = match action {
                ItemAction::Trash | ItemAction::Untrash => {
                    let result = if action == ItemAction::Trash {
                        self.api.trash_items(share_id, request).await
                    } else {
                        self.api.untrash_items(share_id, request).await
                    };
                    match result {
                        Ok(returned) => BatchOutcome::reconcile(chunk, returned),
                        Err(e) => Self::chunk_failed(share_id, chunk, e)?,
                    }
                }
                ItemAction::Delete => match self.api.delete_items(share_id, request).await {
                    Ok(()) => BatchOutcome {
                        deleted: chunk.iter().map(|r| r.item_id.clone()).collect(),
                        ..Default::default()
                    },
                    Err(e) if e.is_not_found() || e.is_conflict() => {
                        warn!(
                            "Delete of {} items in share {} failed ({}), checking items one by one",
                            chunk.len(),
                            share_id,
                            e
                        );
                        self.split_delete(share_id, chunk, cancel).await?
                    }
                    Err(e) => Self::chunk_failed(share_id, chunk, e)?,
                },
            };
            self.apply_outcome(share_id, &chunk_outcome)?;
            outcome.merge(chunk_outcome);
        }
        Ok(outcome)
    }

    /// Delete is all-or-nothing remotely. Check each item of a failed chunk,
    /// report the ones that are gone, stale or not trashed, and resend the
    /// rest once.
    async fn split_delete(
        &self,
        share_id: &str,
        chunk: &[ItemRevisionRef],
        cancel: &CancelToken,
    ) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let mut valid = Vec::with_capacity(chunk.len());
        for item_ref in chunk {
            cancel.check()?;
            let reason = match self.api.get_item(share_id, &item_ref.item_id).await {
                Ok(remote) if remote.revision != item_ref.revision => Some(FailureReason::StaleRevision {
                    returned: remote.revision,
                }),
                Ok(remote) => remote
                    .transition(ItemAction::Delete)
                    .err()
                    .map(|e| FailureReason::InvalidState(e.to_string())),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => Some(FailureReason::Rejected(e.to_string())),
            };
            match reason {
                Some(reason) => outcome.failed.push(FailedItem {
                    item_id: item_ref.item_id.clone(),
                    revision: item_ref.revision,
                    reason,
                }),
                None => valid.push(item_ref.clone()),
            }
        }

        if valid.is_empty() {
            return Ok(outcome);
        }
        debug!(
            "Resending delete of {} items in share {} without {} failed",
            valid.len(),
            share_id,
            outcome.failed.len()
        );
        let request = TrashItemsRequest { items: valid.clone() };
        let resent = match self.api.delete_items(share_id, request).await {
            Ok(()) => BatchOutcome {
                deleted: valid.into_iter().map(|r| r.item_id).collect(),
                ..Default::default()
            },
            Err(e) => Self::chunk_failed(share_id, &valid, e)?,
        };
        outcome.merge(resent);
        Ok(outcome)
    }

    fn chunk_failed(share_id: &str, chunk: &[ItemRevisionRef], error: Error) -> Result<BatchOutcome> {
        if matches!(error, Error::Cancelled) {
            return Err(error);
        }
        warn!(
            "Batch of {} items in share {} failed: {}",
            chunk.len(),
            share_id,
            error
        );
        Ok(BatchOutcome::all_failed(chunk, FailureReason::Rejected(error.to_string())))
    }

    fn apply_outcome(&self, share_id: &str, outcome: &BatchOutcome) -> Result<()> {
        let db = self.db.lock();
        if !outcome.succeeded.is_empty() {
            ItemStorage::apply_modified(db.conn(), share_id, &outcome.succeeded)?;
        }
        if !outcome.deleted.is_empty() {
            ItemStorage::delete_items(db.conn(), share_id, &outcome.deleted)?;
        }
        Ok(())
    }

    /// Refresh items that failed because their revision moved on, and retry
    /// those that still allow the transition once. Items already in the
    /// target state remotely are reported as [`FailureReason::AlreadyApplied`].
    async fn retry_stale(
        &self,
        share_id: &str,
        first: &BatchOutcome,
        action: ItemAction,
        cancel: &CancelToken,
    ) -> Result<(BatchOutcome, HashSet<String>)> {
        let mut refs = Vec::new();
        let mut retried = HashSet::new();
        let mut applied = Vec::new();

        let stale = first.failed.iter().filter(|f| {
            matches!(
                f.reason,
                FailureReason::NotReturned | FailureReason::StaleRevision { .. }
            )
        });
        for failed in stale {
            cancel.check()?;
            let remote = match self.api.get_item(share_id, &failed.item_id).await {
                Ok(remote) => remote,
                Err(e) => {
                    debug!("Cannot refresh failed item {}: {}", failed.item_id, e);
                    continue;
                }
            };
            if remote.revision <= failed.revision {
                continue;
            }
            let allowed = remote.transition(action).is_ok();
            let done = action.target_state() == Some(remote.state);
            let item_ref = remote.revision_ref();
            if let Err(e) = self.store_remote(share_id, remote).await {
                warn!("Refreshed item {} did not verify: {}", failed.item_id, e);
                continue;
            }
            if done {
                debug!(
                    "{} of item {} already applied at revision {}",
                    action, failed.item_id, item_ref.revision
                );
                applied.push(FailedItem {
                    item_id: failed.item_id.clone(),
                    revision: failed.revision,
                    reason: FailureReason::AlreadyApplied {
                        revision: item_ref.revision,
                    },
                });
                retried.insert(failed.item_id.clone());
            } else if allowed {
                refs.push(item_ref);
                retried.insert(failed.item_id.clone());
            }
        }

        let mut outcome = BatchOutcome {
            failed: applied,
            ..Default::default()
        };
        if !refs.is_empty() {
            debug!("Retrying {} stale items in share {}", refs.len(), share_id);
            outcome.merge(self.send_transitions(share_id, &refs, action, cancel).await?);
        }
        Ok((outcome, retried))
    }

    // ------------------------------------------------------------------
    // Local metadata
    // ------------------------------------------------------------------

    /// Record a use remotely and locally
    pub async fn update_last_use_time(&self, item: &SymmetricallyEncryptedItem, time: i64) -> Result<()> {
        let _guard = self.locks.lock(&item.share_id, item.item_id()).await;
        let revision = self
            .api
            .update_last_use_time(&item.share_id, item.item_id(), time)
            .await?;
        let db = self.db.lock();
        ItemStorage::update_last_used_time(
            db.conn(),
            &item.share_id,
            item.item_id(),
            revision.last_use_time.unwrap_or(time),
        )?;
        ItemStorage::set_last_use_time(db.conn(), &item.share_id, item.item_id(), revision.last_use_time)?;
        Ok(())
    }

    /// Pin locally
    pub fn pin_item(&self, item: &SymmetricallyEncryptedItem) -> Result<SymmetricallyEncryptedItem> {
        self.set_pinned(item, Some(chrono::Utc::now().timestamp()))
    }

    /// Unpin locally
    pub fn unpin_item(&self, item: &SymmetricallyEncryptedItem) -> Result<SymmetricallyEncryptedItem> {
        self.set_pinned(item, None)
    }

    fn set_pinned(&self, item: &SymmetricallyEncryptedItem, pin_time: Option<i64>) -> Result<SymmetricallyEncryptedItem> {
        let db = self.db.lock();
        let missing = || StorageError::NotFound(format!("item {}", item.item_id()));
        if !ItemStorage::set_pinned(db.conn(), &item.share_id, item.item_id(), pin_time)? {
            return Err(missing().into());
        }
        ItemStorage::get_item(db.conn(), &item.share_id, item.item_id())?.ok_or_else(|| missing().into())
    }

    /// Drop cached items of one share, or of every share
    pub fn delete_all_items_locally(&self, share_id: Option<&str>) -> Result<usize> {
        let db = self.db.lock();
        let removed = match share_id {
            Some(share_id) => ItemStorage::delete_by_share(db.conn(), share_id)?,
            None => ItemStorage::delete_all(db.conn())?,
        };
        debug!("Deleted {} cached items", removed);
        Ok(removed)
    }
}
