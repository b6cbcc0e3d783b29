//! Reconciliation of batch state transitions
//!
//! The server answers a batch with the items that actually transitioned.
//! Everything else that was requested is a failure and must be reported,
//! never silently dropped.

use crate::revision::{ItemRevisionRef, ModifiedItem};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Maximum items per batch request accepted by the server
pub const MAX_BATCH_SIZE: usize = 100;

/// Why a requested item did not transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Server left the item out of its response
    NotReturned,
    /// Server returned the item without advancing its revision
    StaleRevision {
        /// Revision the server returned
        returned: i64,
    },
    /// Local state does not allow the action
    InvalidState(String),
    /// Request for this item failed outright
    Rejected(String),
    /// Server already holds the item in the requested state, changed
    /// elsewhere
    AlreadyApplied {
        /// Remote revision in that state
        revision: i64,
    },
}

/// Item that did not transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    /// Item ID
    pub item_id: String,
    /// Revision that was sent
    pub revision: i64,
    /// Reason
    pub reason: FailureReason,
}

/// Per-item outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Items that transitioned, with their new revisions
    pub succeeded: Vec<ModifiedItem>,
    /// Items removed for good (delete batches)
    pub deleted: Vec<String>,
    /// Items that did not transition
    pub failed: Vec<FailedItem>,
}

impl BatchOutcome {
    /// Split requested pairs by what the server returned
    pub fn reconcile(requested: &[ItemRevisionRef], returned: Vec<ModifiedItem>) -> Self {
        let wanted: HashMap<&str, i64> = requested
            .iter()
            .map(|r| (r.item_id.as_str(), r.revision))
            .collect();

        let mut outcome = BatchOutcome::default();
        let mut seen = HashSet::new();
        for item in returned {
            let Some(&sent) = wanted.get(item.item_id.as_str()) else {
                warn!("Ignoring unrequested item {} in batch response", item.item_id);
                continue;
            };
            if !seen.insert(item.item_id.clone()) {
                warn!("Ignoring duplicate item {} in batch response", item.item_id);
                continue;
            }
            if item.revision <= sent {
                outcome.failed.push(FailedItem {
                    item_id: item.item_id,
                    revision: sent,
                    reason: FailureReason::StaleRevision {
                        returned: item.revision,
                    },
                });
            } else {
                outcome.succeeded.push(item);
            }
        }

        for r in requested {
            if !seen.contains(&r.item_id) {
                outcome.failed.push(FailedItem {
                    item_id: r.item_id.clone(),
                    revision: r.revision,
                    reason: FailureReason::NotReturned,
                });
            }
        }

        debug!(
            "Batch reconciled: {} succeeded, {} failed",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        outcome
    }

    /// Mark every requested pair as failed with the same reason
    pub fn all_failed(requested: &[ItemRevisionRef], reason: FailureReason) -> Self {
        BatchOutcome {
            failed: requested
                .iter()
                .map(|r| FailedItem {
                    item_id: r.item_id.clone(),
                    revision: r.revision,
                    reason: reason.clone(),
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Fold another outcome into this one
    pub fn merge(&mut self, other: BatchOutcome) {
        self.succeeded.extend(other.succeeded);
        self.deleted.extend(other.deleted);
        self.failed.extend(other.failed);
    }

    /// Drop failures for items that later succeeded
    pub fn retain_unresolved_failures(&mut self) {
        let resolved: HashSet<String> = self
            .succeeded
            .iter()
            .map(|m| m.item_id.clone())
            .chain(self.deleted.iter().cloned())
            .collect();
        self.failed.retain(|f| !resolved.contains(&f.item_id));
    }

    /// True when nothing failed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// True when every failure was already applied elsewhere
    pub fn is_settled(&self) -> bool {
        self.failed
            .iter()
            .all(|f| matches!(f.reason, FailureReason::AlreadyApplied { .. }))
    }

    /// IDs of failed items
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.item_id.as_str()).collect()
    }
}

/// Split into request-sized chunks
pub fn chunked(items: &[ItemRevisionRef], size: usize) -> impl Iterator<Item = &[ItemRevisionRef]> {
    items.chunks(size.clamp(1, MAX_BATCH_SIZE))
}
