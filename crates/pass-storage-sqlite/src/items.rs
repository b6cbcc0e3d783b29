//! Local item cache

use crate::database::immediate;
use crate::models::{ItemRow, ITEM_COLUMNS};
use crate::Result;
use pass_core::{ItemState, ModifiedItem, SymmetricallyEncryptedItem};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};

/// Item storage operations
pub struct ItemStorage;

impl ItemStorage {
    /// Insert or update one item.
    ///
    /// A stored row with a higher revision is kept as is. Returns whether the
    /// row was written.
    pub fn upsert(conn: &Connection, item: &SymmetricallyEncryptedItem) -> Result<bool> {
        let row = ItemRow::from_item(item);
        let written = conn.execute(
            &format!(
                r#"
                INSERT INTO items ({}) VALUES
                    (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
                ON CONFLICT(share_id, item_id) DO UPDATE SET
                    revision = excluded.revision,
                    content_format_version = excluded.content_format_version,
                    rotation_id = excluded.rotation_id,
                    content = excluded.content,
                    user_signature = excluded.user_signature,
                    item_key_signature = excluded.item_key_signature,
                    vault_key_packet_signature = excluded.vault_key_packet_signature,
                    state = excluded.state,
                    signature_email = excluded.signature_email,
                    alias_email = excluded.alias_email,
                    create_time = excluded.create_time,
                    modify_time = excluded.modify_time,
                    revision_time = excluded.revision_time,
                    symmetrically_encrypted_content = excluded.symmetrically_encrypted_content,
                    last_used_time = excluded.last_used_time,
                    is_log_in_item = excluded.is_log_in_item,
                    pinned = excluded.pinned,
                    pin_time = excluded.pin_time,
                    last_use_time = excluded.last_use_time
                WHERE items.revision IS NULL OR excluded.revision >= items.revision
                "#,
                ITEM_COLUMNS
            ),
            params![
                row.item_id,
                row.share_id,
                row.revision,
                row.content_format_version,
                row.rotation_id,
                row.content,
                row.user_signature,
                row.item_key_signature,
                row.vault_key_packet_signature,
                row.state,
                row.signature_email,
                row.alias_email,
                row.create_time,
                row.modify_time,
                row.revision_time,
                row.symmetrically_encrypted_content,
                row.last_used_time,
                row.is_log_in_item,
                row.pinned,
                row.pin_time,
                row.last_use_time,
            ],
        )?;
        if written == 0 {
            tracing::debug!(
                "Kept newer local revision of {}/{} over revision {:?}",
                row.share_id,
                row.item_id,
                row.revision
            );
        }
        Ok(written > 0)
    }

    /// Insert or update many items in one transaction.
    ///
    /// Local pin flags survive the write.
    pub fn upsert_many(conn: &Connection, items: &[SymmetricallyEncryptedItem]) -> Result<()> {
        immediate(conn, |conn| {
            for item in items {
                let mut item = item.clone();
                if let Some((pinned, pin_time)) = Self::pin_state(conn, &item.share_id, item.item_id())? {
                    item.pinned = pinned;
                    item.pin_time = pin_time;
                }
                Self::upsert(conn, &item)?;
            }
            Ok(())
        })
    }

    /// Revision of every cached item of a share
    pub fn revisions(conn: &Connection, share_id: &str) -> Result<HashMap<String, i64>> {
        let mut stmt = conn.prepare(
            "SELECT item_id, revision FROM items WHERE share_id = ?1 AND revision IS NOT NULL",
        )?;
        let revisions = stmt
            .query_map(params![share_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(revisions)
    }

    /// Make the cached share match a full remote listing.
    ///
    /// `known` is the result of [`ItemStorage::revisions`] taken before the
    /// listing was fetched. A local row missing from `items` is only removed
    /// when `known` holds it at its current revision or later, so rows written
    /// while the listing was in flight survive. Rows present in both follow the
    /// [`ItemStorage::upsert`] revision rule. Returns how many rows were written.
    pub fn replace_share_items(
        conn: &Connection,
        share_id: &str,
        items: &[SymmetricallyEncryptedItem],
        known: &HashMap<String, i64>,
    ) -> Result<usize> {
        immediate(conn, |conn| {
            let returned: HashSet<&str> = items.iter().map(|item| item.item_id()).collect();
            let mut removed = 0;
            for (item_id, revision) in Self::revisions(conn, share_id)? {
                if returned.contains(item_id.as_str()) {
                    continue;
                }
                match known.get(&item_id) {
                    Some(&seen) if seen >= revision => {
                        removed += conn.execute(
                            "DELETE FROM items WHERE share_id = ?1 AND item_id = ?2",
                            params![share_id, item_id],
                        )?;
                    }
                    _ => tracing::debug!(
                        "Keeping {}/{} written during refresh",
                        share_id,
                        item_id
                    ),
                }
            }

            let pins = Self::pins_for_share(conn, share_id)?;
            let mut written = 0;
            for item in items {
                let mut item = item.clone();
                if let Some(&(pinned, pin_time)) = pins.get(item.item_id()) {
                    item.pinned = pinned;
                    item.pin_time = pin_time;
                }
                if Self::upsert(conn, &item)? {
                    written += 1;
                }
            }
            tracing::debug!(
                "Replaced share {}: {} written, {} removed",
                share_id,
                written,
                removed
            );
            Ok(written)
        })
    }

    fn pin_state(conn: &Connection, share_id: &str, item_id: &str) -> Result<Option<(bool, Option<i64>)>> {
        let pin = conn
            .query_row(
                "SELECT pinned, pin_time FROM items WHERE share_id = ?1 AND item_id = ?2",
                params![share_id, item_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(pin)
    }

    fn pins_for_share(conn: &Connection, share_id: &str) -> Result<HashMap<String, (bool, Option<i64>)>> {
        let mut stmt = conn.prepare("SELECT item_id, pinned, pin_time FROM items WHERE share_id = ?1")?;
        let pins = stmt
            .query_map(params![share_id], |row| Ok((row.get(0)?, (row.get(1)?, row.get(2)?))))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(pins)
    }

    /// Apply server transition results.
    ///
    /// A result is only written when its revision is greater than the stored
    /// one. Returns how many rows changed.
    pub fn apply_modified(conn: &Connection, share_id: &str, modified: &[ModifiedItem]) -> Result<usize> {
        immediate(conn, |conn| {
            let mut changed = 0;
            for item in modified {
                let state: i64 = item.state.into();
                changed += conn.execute(
                    r#"
                    UPDATE items SET
                        revision = ?1,
                        state = ?2,
                        modify_time = ?3,
                        revision_time = ?4
                    WHERE share_id = ?5 AND item_id = ?6 AND revision < ?1
                    "#,
                    params![
                        item.revision,
                        state,
                        item.modify_time,
                        item.revision_time,
                        share_id,
                        item.item_id,
                    ],
                )?;
            }
            if changed < modified.len() {
                tracing::debug!(
                    "Skipped {} stale transition results for share {}",
                    modified.len() - changed,
                    share_id
                );
            }
            Ok(changed)
        })
    }

    fn query(conn: &Connection, filter: &str, params: impl rusqlite::Params) -> Result<Vec<SymmetricallyEncryptedItem>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM items {}", ITEM_COLUMNS, filter))?;
        let rows = stmt
            .query_map(params, ItemRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|row| row.into_item().map_err(Into::into))
            .collect()
    }

    /// Item by share and ID
    pub fn get_item(conn: &Connection, share_id: &str, item_id: &str) -> Result<Option<SymmetricallyEncryptedItem>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM items WHERE share_id = ?1 AND item_id = ?2",
                    ITEM_COLUMNS
                ),
                params![share_id, item_id],
                ItemRow::from_row,
            )
            .optional()?;
        row.map(|r| r.into_item().map_err(Into::into)).transpose()
    }

    /// Items of a share
    pub fn get_items(conn: &Connection, share_id: &str) -> Result<Vec<SymmetricallyEncryptedItem>> {
        Self::query(conn, "WHERE share_id = ?1 ORDER BY create_time", params![share_id])
    }

    /// Items of a share in one state
    pub fn get_items_by_state(
        conn: &Connection,
        share_id: &str,
        state: ItemState,
    ) -> Result<Vec<SymmetricallyEncryptedItem>> {
        let state: i64 = state.into();
        Self::query(
            conn,
            "WHERE share_id = ?1 AND state = ?2 ORDER BY create_time",
            params![share_id, state],
        )
    }

    /// Every cached item
    pub fn get_all_items(conn: &Connection) -> Result<Vec<SymmetricallyEncryptedItem>> {
        Self::query(conn, "ORDER BY share_id, create_time", [])
    }

    /// Active login items, most recently used first
    pub fn get_active_log_in_items(conn: &Connection) -> Result<Vec<SymmetricallyEncryptedItem>> {
        let active: i64 = ItemState::Active.into();
        Self::query(
            conn,
            "WHERE is_log_in_item = 1 AND state = ?1 ORDER BY last_used_time DESC",
            params![active],
        )
    }

    /// Pinned items, most recently pinned first
    pub fn get_pinned_items(conn: &Connection) -> Result<Vec<SymmetricallyEncryptedItem>> {
        Self::query(conn, "WHERE pinned = 1 ORDER BY pin_time DESC", [])
    }

    /// Alias item by alias email
    pub fn get_alias_item(conn: &Connection, email: &str) -> Result<Option<SymmetricallyEncryptedItem>> {
        Ok(Self::query(conn, "WHERE alias_email = ?1 LIMIT 1", params![email])?
            .into_iter()
            .next())
    }

    /// Number of items in a state, across shares
    pub fn count_by_state(conn: &Connection, state: ItemState) -> Result<i64> {
        let state: i64 = state.into();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE state = ?1",
            params![state],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Record a local use
    pub fn update_last_used_time(conn: &Connection, share_id: &str, item_id: &str, time: i64) -> Result<()> {
        conn.execute(
            "UPDATE items SET last_used_time = ?1 WHERE share_id = ?2 AND item_id = ?3",
            params![time, share_id, item_id],
        )?;
        Ok(())
    }

    /// Record the last use reported by the server
    pub fn set_last_use_time(conn: &Connection, share_id: &str, item_id: &str, time: Option<i64>) -> Result<()> {
        conn.execute(
            "UPDATE items SET last_use_time = ?1 WHERE share_id = ?2 AND item_id = ?3",
            params![time, share_id, item_id],
        )?;
        Ok(())
    }

    /// Pin or unpin locally
    pub fn set_pinned(conn: &Connection, share_id: &str, item_id: &str, pin_time: Option<i64>) -> Result<bool> {
        let rows = conn.execute(
            "UPDATE items SET pinned = ?1, pin_time = ?2 WHERE share_id = ?3 AND item_id = ?4",
            params![pin_time.is_some(), pin_time, share_id, item_id],
        )?;
        Ok(rows > 0)
    }

    /// Delete every item
    pub fn delete_all(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM items", [])?)
    }

    /// Delete items of a share
    pub fn delete_by_share(conn: &Connection, share_id: &str) -> Result<usize> {
        Ok(conn.execute("DELETE FROM items WHERE share_id = ?1", params![share_id])?)
    }

    /// Delete items by ID within a share
    pub fn delete_items(conn: &Connection, share_id: &str, item_ids: &[String]) -> Result<usize> {
        if item_ids.is_empty() {
            return Ok(0);
        }
        let placeholders = (0..item_ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "DELETE FROM items WHERE share_id = ?1 AND item_id IN ({})",
            placeholders
        );
        let values = std::iter::once(share_id).chain(item_ids.iter().map(String::as_str));
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }
}
