//! Local vault key and item key cache
//!
//! Keys are stored as received: locked, with their signatures. They are
//! verified and unlocked again on every load.

use crate::database::immediate;
use crate::models::{KeyRow, KEY_COLUMNS};
use crate::Result;
use pass_core::{ItemKey, ShareKeys, VaultKey};
use rusqlite::{params, Connection};

/// Key storage operations
pub struct KeyStorage;

impl KeyStorage {
    fn upsert_row(conn: &Connection, table: &str, row: &KeyRow) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                table, KEY_COLUMNS
            ),
            params![
                row.share_id,
                row.rotation_id,
                row.rotation,
                row.key,
                row.key_passphrase,
                row.key_signature,
                row.create_time,
            ],
        )?;
        Ok(())
    }

    /// Store every key of a share
    pub fn upsert_share_keys(conn: &Connection, keys: &ShareKeys) -> Result<()> {
        immediate(conn, |conn| {
            for key in &keys.vault_keys {
                Self::upsert_row(conn, "vault_keys", &KeyRow::from_vault_key(&keys.share_id, key))?;
            }
            for key in &keys.item_keys {
                Self::upsert_row(conn, "share_keys", &KeyRow::from_item_key(&keys.share_id, key))?;
            }
            Ok(())
        })
    }

    fn rows(conn: &Connection, table: &str, share_id: &str) -> Result<Vec<KeyRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE share_id = ?1 ORDER BY rotation",
            KEY_COLUMNS, table
        ))?;
        let rows = stmt
            .query_map(params![share_id], KeyRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Vault keys of a share
    pub fn get_vault_keys(conn: &Connection, share_id: &str) -> Result<Vec<VaultKey>> {
        Self::rows(conn, "vault_keys", share_id)?
            .into_iter()
            .map(|r| r.into_vault_key().map_err(Into::into))
            .collect()
    }

    /// Item keys of a share
    pub fn get_item_keys(conn: &Connection, share_id: &str) -> Result<Vec<ItemKey>> {
        Self::rows(conn, "share_keys", share_id)?
            .into_iter()
            .map(|r| r.into_item_key().map_err(Into::into))
            .collect()
    }

    /// Every key of a share
    pub fn get_share_keys(conn: &Connection, share_id: &str) -> Result<ShareKeys> {
        Ok(ShareKeys {
            share_id: share_id.to_string(),
            vault_keys: Self::get_vault_keys(conn, share_id)?,
            item_keys: Self::get_item_keys(conn, share_id)?,
        })
    }

    /// Remove every key of a share
    pub fn delete_share_keys(conn: &Connection, share_id: &str) -> Result<()> {
        immediate(conn, |conn| {
            conn.execute("DELETE FROM vault_keys WHERE share_id = ?1", params![share_id])?;
            conn.execute("DELETE FROM share_keys WHERE share_id = ?1", params![share_id])?;
            Ok(())
        })
    }
}
