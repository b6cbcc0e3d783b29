//! Property-based tests for pass-core
//!
//! Uses proptest to verify envelope invariants across randomized inputs

use pass_core::armor::{decode_base64, encode_base64};
use pass_core::content::{ExtraField, ExtraText, extra_field};
use pass_core::fixtures::TestKeys;
use pass_core::{decrypt_item, BatchOutcome, ItemContent, ItemRevision, ItemRevisionRef, ItemState, ModifiedItem};
use proptest::prelude::*;
use std::sync::OnceLock;

fn keys() -> &'static TestKeys {
    static KEYS: OnceLock<TestKeys> = OnceLock::new();
    KEYS.get_or_init(|| TestKeys::new("share-1", "r1"))
}

// ============================================================================
// Property Test Strategies
// ============================================================================

fn text_strategy(max: usize) -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[a-zA-Z0-9 @._-]{{0,{}}}", max)).unwrap()
}

fn content_strategy() -> impl Strategy<Value = ItemContent> {
    (
        text_strategy(40),
        text_strategy(40),
        text_strategy(64),
        prop::collection::vec(text_strategy(30), 0..4),
        prop::option::of(text_strategy(60)),
        any::<bool>(),
    )
        .prop_map(|(name, username, password, urls, extra, is_login)| {
            let mut content = if is_login {
                ItemContent::login(&name, &username, &password, urls)
            } else {
                ItemContent::note(&name, &password)
            };
            if let Some(extra) = extra {
                content.extra_fields.push(ExtraField {
                    field_name: "extra".into(),
                    value: Some(extra_field::Value::Text(ExtraText { content: extra })),
                });
            }
            content
        })
}

#[derive(Debug, Clone, Copy)]
enum TamperField {
    Content,
    UserSignature,
    ItemKeySignature,
}

fn tamper_strategy() -> impl Strategy<Value = TamperField> {
    prop_oneof![
        Just(TamperField::Content),
        Just(TamperField::UserSignature),
        Just(TamperField::ItemKeySignature),
    ]
}

fn flip_bit(value: &str, field: &str, index: usize, bit: u8) -> String {
    let mut bytes = decode_base64(value, field).unwrap();
    let i = index % bytes.len();
    bytes[i] ^= 1 << (bit % 8);
    encode_base64(&bytes)
}

// ============================================================================
// Envelope Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: decode(encode(C)) == C
    #[test]
    fn prop_envelope_roundtrip(content in content_strategy()) {
        let keys = keys();
        let revision = keys.revision("item-1", 1, &content);
        let decrypted = decrypt_item(&revision, keys.open_keys()).unwrap();
        prop_assert_eq!(decrypted, content);
    }

    /// Property: any flipped bit in content or signatures is rejected
    #[test]
    fn prop_tamper_rejected(
        content in content_strategy(),
        field in tamper_strategy(),
        index in any::<usize>(),
        bit in any::<u8>(),
    ) {
        let keys = keys();
        let mut revision: ItemRevision = keys.revision("item-1", 1, &content);
        match field {
            TamperField::Content => {
                revision.content = flip_bit(&revision.content, "content", index, bit);
            }
            TamperField::UserSignature => {
                revision.user_signature = flip_bit(&revision.user_signature, "userSignature", index, bit);
            }
            TamperField::ItemKeySignature => {
                revision.item_key_signature =
                    flip_bit(&revision.item_key_signature, "itemKeySignature", index, bit);
            }
        }
        prop_assert!(decrypt_item(&revision, keys.open_keys()).is_err());
    }
}

// ============================================================================
// Batch Properties
// ============================================================================

proptest! {
    /// Property: every requested item is either succeeded or failed, never dropped
    #[test]
    fn prop_batch_accounts_for_every_item(
        revisions in prop::collection::vec(1i64..50, 1..40),
        returned_mask in prop::collection::vec(any::<bool>(), 40),
    ) {
        let requested: Vec<ItemRevisionRef> = revisions
            .iter()
            .enumerate()
            .map(|(i, rev)| ItemRevisionRef { item_id: format!("item-{}", i), revision: *rev })
            .collect();
        let returned: Vec<ModifiedItem> = requested
            .iter()
            .zip(returned_mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(r, _)| ModifiedItem {
                item_id: r.item_id.clone(),
                revision: r.revision + 1,
                state: ItemState::Trashed,
                modify_time: 0,
                revision_time: 0,
            })
            .collect();
        let expected_ok = returned.len();

        let outcome = BatchOutcome::reconcile(&requested, returned);
        prop_assert_eq!(outcome.succeeded.len(), expected_ok);
        prop_assert_eq!(outcome.succeeded.len() + outcome.failed.len(), requested.len());
    }
}
