//! Local share cache

use crate::database::immediate;
use crate::models::{ShareRow, SHARE_COLUMNS};
use crate::Result;
use pass_core::Share;
use rusqlite::{params, Connection, OptionalExtension};

/// Share storage operations
pub struct ShareStorage;

impl ShareStorage {
    /// Insert or replace a share
    pub fn upsert(conn: &Connection, share: &Share) -> Result<()> {
        let row = ShareRow::from_share(share);
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO shares ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                SHARE_COLUMNS
            ),
            params![
                row.share_id,
                row.vault_id,
                row.address_id,
                row.target_type,
                row.target_id,
                row.permission,
                row.content,
                row.content_key_rotation,
                row.content_format_version,
                row.expire_time,
                row.create_time,
            ],
        )?;
        Ok(())
    }

    /// Replace the share set. Shares no longer present are removed with
    /// their items and keys. Returns the removed share IDs.
    pub fn replace_all(conn: &Connection, shares: &[Share]) -> Result<Vec<String>> {
        immediate(conn, |conn| {
            let existing = Self::share_ids(conn)?;
            let removed: Vec<String> = existing
                .into_iter()
                .filter(|id| !shares.iter().any(|s| &s.share_id == id))
                .collect();
            for share_id in &removed {
                Self::delete_with_children(conn, share_id)?;
            }
            for share in shares {
                Self::upsert(conn, share)?;
            }
            Ok(removed)
        })
    }

    fn delete_with_children(conn: &Connection, share_id: &str) -> Result<()> {
        conn.execute("DELETE FROM items WHERE share_id = ?1", params![share_id])?;
        conn.execute("DELETE FROM share_keys WHERE share_id = ?1", params![share_id])?;
        conn.execute("DELETE FROM vault_keys WHERE share_id = ?1", params![share_id])?;
        conn.execute("DELETE FROM shares WHERE share_id = ?1", params![share_id])?;
        Ok(())
    }

    /// IDs of cached shares
    pub fn share_ids(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT share_id FROM shares ORDER BY share_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Share by ID
    pub fn get(conn: &Connection, share_id: &str) -> Result<Option<Share>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM shares WHERE share_id = ?1", SHARE_COLUMNS),
                params![share_id],
                ShareRow::from_row,
            )
            .optional()?;
        row.map(|r| r.into_share().map_err(Into::into)).transpose()
    }

    /// Every cached share
    pub fn get_all(conn: &Connection) -> Result<Vec<Share>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shares ORDER BY create_time",
            SHARE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], ShareRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|r| r.into_share().map_err(Into::into))
            .collect()
    }

    /// Remove a share with its items and keys
    pub fn delete(conn: &Connection, share_id: &str) -> Result<()> {
        immediate(conn, |conn| Self::delete_with_children(conn, share_id))
    }
}
