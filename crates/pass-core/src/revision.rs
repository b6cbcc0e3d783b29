//! Versioned item records and state transitions
//!
//! The server owns the revision counter. A client never bumps a revision
//! itself: it presents the last revision it knows and applies whatever the
//! server returns, as long as the returned revision moves forward.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Item state as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ItemState {
    /// Visible item
    Active = 1,
    /// Item in the trash
    Trashed = 2,
}

impl TryFrom<i64> for ItemState {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(ItemState::Active),
            2 => Ok(ItemState::Trashed),
            other => Err(Error::UnknownState(other)),
        }
    }
}

impl From<ItemState> for i64 {
    fn from(state: ItemState) -> i64 {
        state as i64
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::Active => write!(f, "Active"),
            ItemState::Trashed => write!(f, "Trashed"),
        }
    }
}

/// Revision-checked state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemAction {
    /// Active -> Trashed
    Trash,
    /// Trashed -> Active
    Untrash,
    /// Trashed -> removed
    Delete,
}

impl fmt::Display for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemAction::Trash => write!(f, "trash"),
            ItemAction::Untrash => write!(f, "untrash"),
            ItemAction::Delete => write!(f, "delete"),
        }
    }
}

impl ItemAction {
    /// State the item ends up in, `None` when it is removed
    pub fn target_state(self) -> Option<ItemState> {
        match self {
            ItemAction::Trash => Some(ItemState::Trashed),
            ItemAction::Untrash => Some(ItemState::Active),
            ItemAction::Delete => None,
        }
    }
}

/// Result of a legal transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTransition {
    /// Item moves to a new state
    To(ItemState),
    /// Item is removed for good
    Deleted,
}

impl ItemState {
    /// Apply an action, rejecting illegal moves
    pub fn apply(self, action: ItemAction) -> Result<ItemTransition> {
        match (self, action) {
            (ItemState::Active, ItemAction::Trash) => Ok(ItemTransition::To(ItemState::Trashed)),
            (ItemState::Trashed, ItemAction::Untrash) => Ok(ItemTransition::To(ItemState::Active)),
            (ItemState::Trashed, ItemAction::Delete) => Ok(ItemTransition::Deleted),
            (from, action) => Err(Error::InvalidTransition {
                item_id: String::new(),
                from: from.to_string(),
                action: action.to_string(),
            }),
        }
    }
}

/// Server-side item record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemRevision {
    /// Item ID
    #[serde(rename = "ItemID")]
    pub item_id: String,
    /// Server revision counter
    pub revision: i64,
    /// Envelope format version
    pub content_format_version: i64,
    /// Key rotation the content is encrypted for
    #[serde(rename = "RotationID")]
    pub rotation_id: String,
    /// Base64 `vaultKeyPacket || dataPacket`
    pub content: String,
    /// Base64 session-encrypted address signature
    pub user_signature: String,
    /// Base64 session-encrypted item key signature
    pub item_key_signature: String,
    /// Base64 item key signature over the vault key packet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_key_packet_signature: Option<String>,
    /// Item state
    pub state: ItemState,
    /// Email of the signing address
    pub signature_email: String,
    /// Alias address, for alias items
    #[serde(default)]
    pub alias_email: Option<String>,
    /// Creation time (unix seconds)
    pub create_time: i64,
    /// Last content or state change
    pub modify_time: i64,
    /// Time of this revision
    pub revision_time: i64,
    /// Last use, as recorded by the server
    #[serde(default)]
    pub last_use_time: Option<i64>,
}

impl ItemRevision {
    /// Check an action against the current state
    pub fn transition(&self, action: ItemAction) -> Result<ItemTransition> {
        self.state.apply(action).map_err(|err| match err {
            Error::InvalidTransition { from, action, .. } => Error::InvalidTransition {
                item_id: self.item_id.clone(),
                from,
                action,
            },
            other => other,
        })
    }

    /// `(itemID, revision)` pair for revision-checked requests
    pub fn revision_ref(&self) -> ItemRevisionRef {
        ItemRevisionRef {
            item_id: self.item_id.clone(),
            revision: self.revision,
        }
    }

    /// Apply a server result for this item.
    ///
    /// The result must name this item and carry a strictly greater revision.
    pub fn apply_modified(&mut self, modified: &ModifiedItem) -> Result<()> {
        if modified.item_id != self.item_id {
            return Err(Error::Conflict {
                item_id: self.item_id.clone(),
                detail: format!("result is for item {}", modified.item_id),
            });
        }
        if modified.revision <= self.revision {
            return Err(Error::Conflict {
                item_id: self.item_id.clone(),
                detail: format!(
                    "revision {} does not advance past {}",
                    modified.revision, self.revision
                ),
            });
        }
        self.revision = modified.revision;
        self.state = modified.state;
        self.modify_time = modified.modify_time;
        self.revision_time = modified.revision_time;
        Ok(())
    }
}

/// Page of item revisions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemRevisionList {
    /// Total items in the share
    pub total: i64,
    /// Revisions in this page
    pub revisions_data: Vec<ItemRevision>,
}

/// `(itemID, revision)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemRevisionRef {
    /// Item ID
    #[serde(rename = "ItemID")]
    pub item_id: String,
    /// Last known revision
    pub revision: i64,
}

/// Per-item result of a state-transition request. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifiedItem {
    /// Item ID
    #[serde(rename = "ItemID")]
    pub item_id: String,
    /// New revision
    pub revision: i64,
    /// New state
    pub state: ItemState,
    /// Modification time
    pub modify_time: i64,
    /// Revision time
    pub revision_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revision(item_id: &str, rev: i64, state: ItemState) -> ItemRevision {
        ItemRevision {
            item_id: item_id.into(),
            revision: rev,
            content_format_version: 1,
            rotation_id: "r1".into(),
            content: String::new(),
            user_signature: String::new(),
            item_key_signature: String::new(),
            vault_key_packet_signature: None,
            state,
            signature_email: "user@proton.me".into(),
            alias_email: None,
            create_time: 1,
            modify_time: 1,
            revision_time: 1,
            last_use_time: None,
        }
    }

    #[test]
    fn test_legal_transitions() {
        assert_eq!(
            ItemState::Active.apply(ItemAction::Trash).unwrap(),
            ItemTransition::To(ItemState::Trashed)
        );
        assert_eq!(
            ItemState::Trashed.apply(ItemAction::Untrash).unwrap(),
            ItemTransition::To(ItemState::Active)
        );
        assert_eq!(
            ItemState::Trashed.apply(ItemAction::Delete).unwrap(),
            ItemTransition::Deleted
        );
        assert_eq!(ItemAction::Trash.target_state(), Some(ItemState::Trashed));
        assert_eq!(ItemAction::Delete.target_state(), None);
    }

    #[test]
    fn test_illegal_transitions() {
        for (state, action) in [
            (ItemState::Active, ItemAction::Untrash),
            (ItemState::Active, ItemAction::Delete),
            (ItemState::Trashed, ItemAction::Trash),
        ] {
            assert!(matches!(state.apply(action), Err(Error::InvalidTransition { .. })));
        }
    }

    #[test]
    fn test_transition_names_item() {
        let item = revision("item-1", 1, ItemState::Active);
        let err = item.transition(ItemAction::Delete).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { ref item_id, .. } if item_id == "item-1"));
    }

    #[test]
    fn test_apply_modified() {
        let mut item = revision("item-1", 1, ItemState::Active);
        item.apply_modified(&ModifiedItem {
            item_id: "item-1".into(),
            revision: 2,
            state: ItemState::Trashed,
            modify_time: 5,
            revision_time: 5,
        })
        .unwrap();
        assert_eq!(item.revision, 2);
        assert_eq!(item.state, ItemState::Trashed);
    }

    #[test]
    fn test_apply_modified_rejects_stale() {
        let mut item = revision("item-1", 3, ItemState::Active);
        let stale = ModifiedItem {
            item_id: "item-1".into(),
            revision: 3,
            state: ItemState::Trashed,
            modify_time: 5,
            revision_time: 5,
        };
        assert!(item.apply_modified(&stale).unwrap_err().is_conflict());
        assert_eq!(item.state, ItemState::Active);

        let other = ModifiedItem {
            item_id: "item-2".into(),
            revision: 9,
            ..stale
        };
        assert!(item.apply_modified(&other).unwrap_err().is_conflict());
    }

    #[test]
    fn test_state_wire_integers() {
        assert_eq!(serde_json::to_string(&ItemState::Trashed).unwrap(), "2");
        assert_eq!(serde_json::from_str::<ItemState>("1").unwrap(), ItemState::Active);
        assert!(serde_json::from_str::<ItemState>("7").is_err());
    }

    #[test]
    fn test_revision_wire_casing() {
        let json = serde_json::to_value(revision("a", 1, ItemState::Active)).unwrap();
        assert!(json.get("ItemID").is_some());
        assert!(json.get("RotationID").is_some());
        assert!(json.get("SignatureEmail").is_some());
        assert!(json.get("VaultKeyPacketSignature").is_none());
    }
}
