//! Live API smoke tests
//!
//! Run with `--features live_api -- --ignored` and `PASS_API_UID`,
//! `PASS_API_TOKEN` set. `PASS_API_URL` overrides the endpoint.

#![cfg(feature = "live_api")]

use pass_client::{ClientConfig, HttpPassApi, PassApi, Session};

fn api() -> HttpPassApi {
    let session = Session {
        uid: std::env::var("PASS_API_UID").expect("PASS_API_UID"),
        access_token: std::env::var("PASS_API_TOKEN").expect("PASS_API_TOKEN"),
    };
    HttpPassApi::new(ClientConfig::from_env(), session).unwrap()
}

#[tokio::test]
#[ignore]
async fn test_live_shares_and_keys() {
    let api = api();
    let shares = api.get_shares().await.unwrap();
    for share in shares.iter().take(3) {
        let keys = api.get_share_keys(&share.share_id).await.unwrap();
        keys.validate().unwrap();
        println!(
            "share {}: {} vault keys, {} item keys",
            share.share_id,
            keys.vault_keys.len(),
            keys.item_keys.len()
        );
    }
}

#[tokio::test]
#[ignore]
async fn test_live_item_pages() {
    let api = api();
    let shares = api.get_shares().await.unwrap();
    let Some(share) = shares.first() else {
        return;
    };
    let page = api.get_items(&share.share_id, 0, 10).await.unwrap();
    assert!(page.revisions_data.len() <= 10);
    assert!(page.total >= page.revisions_data.len() as i64);
}
