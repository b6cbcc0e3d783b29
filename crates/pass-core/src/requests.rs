//! `/pass/v1` request and response bodies
//!
//! Field names are PascalCase on the wire. Responses carry the API `Code`
//! (1000 on success).

use crate::armor::encode_base64;
use crate::envelope::{SealedEnvelope, CONTENT_FORMAT_VERSION};
use crate::keys::{ItemKey, VaultKey};
use crate::revision::{ItemRevision, ItemRevisionList, ItemRevisionRef, ModifiedItem};
use crate::share::Share;
use serde::{Deserialize, Serialize};

/// API success code
pub const CODE_SUCCESS: i64 = 1000;
/// API code for a revision mismatch
pub const CODE_REVISION_MISMATCH: i64 = 2501;

/// `POST /pass/v1/share/{shareId}/item`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateItemRequest {
    /// Rotation of the encryption keys
    #[serde(rename = "RotationID")]
    pub rotation_id: String,
    /// Label IDs
    pub labels: Vec<String>,
    /// Base64 wrapped session key
    pub vault_key_packet: String,
    /// Base64 item key signature over the vault key packet
    pub vault_key_packet_signature: String,
    /// Envelope format version
    pub content_format_version: i64,
    /// Base64 data packet
    pub content: String,
    /// Base64 encrypted address signature
    pub user_signature: String,
    /// Base64 encrypted item key signature
    pub item_key_signature: String,
}

impl CreateItemRequest {
    /// Build from a sealed envelope. Key packet and data packet travel apart.
    pub fn new(sealed: &SealedEnvelope) -> Self {
        Self {
            rotation_id: sealed.rotation_id.clone(),
            labels: Vec::new(),
            vault_key_packet: encode_base64(&sealed.vault_key_packet),
            vault_key_packet_signature: encode_base64(&sealed.vault_key_packet_signature),
            content_format_version: CONTENT_FORMAT_VERSION,
            content: encode_base64(&sealed.data_packet),
            user_signature: encode_base64(&sealed.user_signature),
            item_key_signature: encode_base64(&sealed.item_key_signature),
        }
    }
}

/// `PUT /pass/v1/share/{shareId}/item/{itemId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemRequest {
    /// Rotation of the encryption keys
    #[serde(rename = "RotationID")]
    pub rotation_id: String,
    /// Revision the edit is based on
    pub last_revision: i64,
    /// Base64 `vaultKeyPacket || dataPacket`
    pub content: String,
    /// Envelope format version
    pub content_format_version: i64,
    /// Base64 encrypted address signature
    pub user_signature: String,
    /// Base64 encrypted item key signature
    pub item_key_signature: String,
}

impl UpdateItemRequest {
    /// Build from a sealed envelope
    pub fn new(sealed: &SealedEnvelope, last_revision: i64) -> Self {
        Self {
            rotation_id: sealed.rotation_id.clone(),
            last_revision,
            content: sealed.message_base64(),
            content_format_version: CONTENT_FORMAT_VERSION,
            user_signature: encode_base64(&sealed.user_signature),
            item_key_signature: encode_base64(&sealed.item_key_signature),
        }
    }
}

/// Body of trash, untrash and delete requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrashItemsRequest {
    /// Items and their last known revisions
    pub items: Vec<ItemRevisionRef>,
}

/// `PUT /pass/v1/share/{shareId}/item/{itemId}/lastuse`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateLastUseTimeRequest {
    /// Unix seconds
    pub last_use_time: i64,
}

/// Response of trash and untrash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyItemResponse {
    /// API code
    pub code: i64,
    /// Items that transitioned
    pub items: Vec<ModifiedItem>,
}

/// Response of `GET .../item`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemsResponse {
    /// API code
    pub code: i64,
    /// Page of revisions
    pub items: ItemRevisionList,
}

/// Response carrying one item revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemResponse {
    /// API code
    pub code: i64,
    /// Revision
    pub item: ItemRevision,
}

/// Response of `GET /pass/v1/share`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetSharesResponse {
    /// API code
    pub code: i64,
    /// Shares visible to the user
    pub shares: Vec<Share>,
}

/// Keys of one share
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShareKeysPage {
    /// Total key count
    pub total: i64,
    /// Vault keys
    pub vault_keys: Vec<VaultKey>,
    /// Item keys
    pub item_keys: Vec<ItemKey>,
}

/// Response of `GET .../key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetShareKeysResponse {
    /// API code
    pub code: i64,
    /// Keys
    pub keys: ShareKeysPage,
}

/// Response with no payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeOnlyResponse {
    /// API code
    pub code: i64,
}

/// Error body returned with a non-2xx status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorResponse {
    /// API code
    pub code: i64,
    /// Human-readable message
    #[serde(default)]
    pub error: String,
}
