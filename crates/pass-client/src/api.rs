//! Pass API endpoints
//!
//! [`PassApi`] is the seam between the repositories and the server.
//! [`HttpPassApi`] talks to `/pass/v1` over HTTPS with PascalCase JSON bodies.

use crate::config::ClientConfig;
use crate::retry::with_retry;
use crate::{Error, Result};
use async_trait::async_trait;
use pass_core::requests::{
    ApiErrorResponse, CodeOnlyResponse, GetItemsResponse, GetShareKeysResponse, GetSharesResponse,
    ItemResponse, ModifyItemResponse, UpdateLastUseTimeRequest, CODE_REVISION_MISMATCH,
    CODE_SUCCESS,
};
use pass_core::{
    CreateItemRequest, ItemRevision, ItemRevisionList, ModifiedItem, Share, ShareKeys,
    TrashItemsRequest, UpdateItemRequest,
};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

/// Pass API operations
#[async_trait]
pub trait PassApi: Send + Sync {
    /// Every share of the user
    async fn get_shares(&self) -> Result<Vec<Share>>;

    /// Every vault key and item key of a share
    async fn get_share_keys(&self, share_id: &str) -> Result<ShareKeys>;

    /// One page of the latest item revisions of a share
    async fn get_items(&self, share_id: &str, page: u32, page_size: u32) -> Result<ItemRevisionList>;

    /// Latest revision of one item
    async fn get_item(&self, share_id: &str, item_id: &str) -> Result<ItemRevision>;

    /// Create an item. The server assigns the ID and revision 1.
    async fn create_item(&self, share_id: &str, request: CreateItemRequest) -> Result<ItemRevision>;

    /// Replace an item's content. Fails with a conflict on a stale `LastRevision`.
    async fn update_item(
        &self,
        share_id: &str,
        item_id: &str,
        request: UpdateItemRequest,
    ) -> Result<ItemRevision>;

    /// Move items to the trash. Only items that transitioned are returned.
    async fn trash_items(&self, share_id: &str, request: TrashItemsRequest) -> Result<Vec<ModifiedItem>>;

    /// Restore items from the trash. Only items that transitioned are returned.
    async fn untrash_items(&self, share_id: &str, request: TrashItemsRequest)
        -> Result<Vec<ModifiedItem>>;

    /// Permanently delete trashed items. The whole request succeeds or fails.
    async fn delete_items(&self, share_id: &str, request: TrashItemsRequest) -> Result<()>;

    /// Record a use of the item
    async fn update_last_use_time(&self, share_id: &str, item_id: &str, time: i64) -> Result<ItemRevision>;
}

/// Authenticated API session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session UID, sent as `x-pm-uid`
    pub uid: String,
    /// Bearer access token
    pub access_token: String,
}

/// Map a non-success response to an error.
///
/// 409 and the revision-mismatch code are conflicts. 429 and 5xx are
/// transport failures and therefore retried.
pub fn map_error_response(status: StatusCode, body: &[u8]) -> Error {
    let parsed: Option<ApiErrorResponse> = serde_json::from_slice(body).ok();
    let (code, message) = match parsed {
        Some(r) => (r.code, r.error),
        None => (0, String::from_utf8_lossy(body).into_owned()),
    };

    if status == StatusCode::CONFLICT || code == CODE_REVISION_MISMATCH {
        return Error::Conflict(message);
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Error::Transport(format!("HTTP {}: {}", status, message));
    }
    Error::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Parse a success response, checking the API code
pub fn parse_response<R: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<R> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    match value.get("Code").and_then(|c| c.as_i64()) {
        Some(CODE_SUCCESS) | None => Ok(serde_json::from_value(value)?),
        Some(_) => Err(map_error_response(status, body)),
    }
}

/// reqwest-backed API client
pub struct HttpPassApi {
    config: ClientConfig,
    session: Session,
    client: reqwest::Client,
}

impl HttpPassApi {
    /// Create new API client
    pub fn new(config: ClientConfig, session: Session) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            session,
            client,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send<B, R>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.config.pass_url(path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("x-pm-uid", &self.session.uid)
            .header("x-pm-appversion", &self.config.app_version)
            .bearer_auth(&self.session.access_token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!("{} {} -> {}", method, path, status);

        if !status.is_success() {
            return Err(map_error_response(status, &bytes));
        }
        parse_response(status, &bytes)
    }

    async fn call<B, R>(&self, method: Method, path: &str, query: &[(&str, String)], body: Option<&B>) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        with_retry(&self.config.retry, || self.send(method.clone(), path, query, body)).await
    }
}

#[async_trait]
impl PassApi for HttpPassApi {
    async fn get_shares(&self) -> Result<Vec<Share>> {
        let response: GetSharesResponse = self.call::<(), _>(Method::GET, "/share", &[], None).await?;
        Ok(response.shares)
    }

    async fn get_share_keys(&self, share_id: &str) -> Result<ShareKeys> {
        let path = format!("/share/{}/key", share_id);
        let mut keys = ShareKeys::new(share_id);
        let mut page = 0u32;
        loop {
            let response: GetShareKeysResponse = self
                .call::<(), _>(Method::GET, &path, &[("Page", page.to_string())], None)
                .await?;
            let received = response.keys.vault_keys.len() + response.keys.item_keys.len();
            keys.vault_keys.extend(response.keys.vault_keys);
            keys.item_keys.extend(response.keys.item_keys);

            let fetched = (keys.vault_keys.len() + keys.item_keys.len()) as i64;
            if received == 0 || fetched >= response.keys.total {
                break;
            }
            page += 1;
        }
        Ok(keys)
    }

    async fn get_items(&self, share_id: &str, page: u32, page_size: u32) -> Result<ItemRevisionList> {
        let path = format!("/share/{}/item", share_id);
        let query = [("Page", page.to_string()), ("PageSize", page_size.to_string())];
        let response: GetItemsResponse = self.call::<(), _>(Method::GET, &path, &query, None).await?;
        Ok(response.items)
    }

    async fn get_item(&self, share_id: &str, item_id: &str) -> Result<ItemRevision> {
        let path = format!("/share/{}/item/{}", share_id, item_id);
        let response: ItemResponse = self.call::<(), _>(Method::GET, &path, &[], None).await?;
        Ok(response.item)
    }

    async fn create_item(&self, share_id: &str, request: CreateItemRequest) -> Result<ItemRevision> {
        // Not idempotent, so sent once
        let path = format!("/share/{}/item", share_id);
        let response: ItemResponse = self.send(Method::POST, &path, &[], Some(&request)).await?;
        Ok(response.item)
    }

    async fn update_item(
        &self,
        share_id: &str,
        item_id: &str,
        request: UpdateItemRequest,
    ) -> Result<ItemRevision> {
        let path = format!("/share/{}/item/{}", share_id, item_id);
        let response: ItemResponse = self.call(Method::PUT, &path, &[], Some(&request)).await?;
        Ok(response.item)
    }

    async fn trash_items(&self, share_id: &str, request: TrashItemsRequest) -> Result<Vec<ModifiedItem>> {
        let path = format!("/share/{}/item/trash", share_id);
        let response: ModifyItemResponse = self.call(Method::POST, &path, &[], Some(&request)).await?;
        Ok(response.items)
    }

    async fn untrash_items(
        &self,
        share_id: &str,
        request: TrashItemsRequest,
    ) -> Result<Vec<ModifiedItem>> {
        let path = format!("/share/{}/item/untrash", share_id);
        let response: ModifyItemResponse = self.call(Method::POST, &path, &[], Some(&request)).await?;
        Ok(response.items)
    }

    async fn delete_items(&self, share_id: &str, request: TrashItemsRequest) -> Result<()> {
        let path = format!("/share/{}/item", share_id);
        let _: CodeOnlyResponse = self.call(Method::DELETE, &path, &[], Some(&request)).await?;
        Ok(())
    }

    async fn update_last_use_time(&self, share_id: &str, item_id: &str, time: i64) -> Result<ItemRevision> {
        let path = format!("/share/{}/item/{}/lastuse", share_id, item_id);
        let body = UpdateLastUseTimeRequest { last_use_time: time };
        let response: ItemResponse = self.call(Method::PUT, &path, &[], Some(&body)).await?;
        Ok(response.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_mapping() {
        let body = br#"{"Code":2501,"Error":"Revision mismatch"}"#;
        assert!(matches!(
            map_error_response(StatusCode::UNPROCESSABLE_ENTITY, body),
            Error::Conflict(message) if message == "Revision mismatch"
        ));
        assert!(map_error_response(StatusCode::CONFLICT, b"").is_conflict());
    }

    #[test]
    fn test_transport_mapping() {
        assert!(map_error_response(StatusCode::SERVICE_UNAVAILABLE, b"down").is_retryable());
        assert!(map_error_response(StatusCode::TOO_MANY_REQUESTS, b"{}").is_retryable());
        let rejected = map_error_response(StatusCode::UNPROCESSABLE_ENTITY, br#"{"Code":2011,"Error":"Nope"}"#);
        assert!(matches!(rejected, Error::Api { status: 422, code: 2011, .. }));
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_parse_checks_code() {
        let ok: CodeOnlyResponse = parse_response(StatusCode::OK, br#"{"Code":1000}"#).unwrap();
        assert_eq!(ok.code, 1000);
        let err = parse_response::<CodeOnlyResponse>(StatusCode::OK, br#"{"Code":2501,"Error":"stale"}"#);
        assert!(err.unwrap_err().is_conflict());
    }

    #[test]
    fn test_missing_revision_fails_parse() {
        let body = br#"{"Code":1000,"Items":[
            {"ItemID":"a","Revision":2,"State":2,"ModifyTime":1,"RevisionTime":1},
            {"ItemID":"b","State":2,"ModifyTime":1,"RevisionTime":1}
        ]}"#;
        let err = parse_response::<ModifyItemResponse>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_new_validates_config() {
        let session = Session {
            uid: "uid".into(),
            access_token: "token".into(),
        };
        let bad = ClientConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(HttpPassApi::new(bad, session.clone()).is_err());
        assert!(HttpPassApi::new(ClientConfig::default(), session).is_ok());
    }
}
