//! Database schema migrations
//!
//! String columns are nullable on purpose: a partial write must stay
//! readable so row mapping can name the missing field.

use crate::{Error, Result};
use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 3;

/// Run all migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::debug!(
        "Running migrations: current_version={}, target_version={}",
        current_version,
        SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < 3 {
        migrate_v3(conn)?;
    }

    if current_version != SCHEMA_VERSION {
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Current schema version, 0 for a fresh database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    match result {
        Ok(v) => Ok(v),
        Err(_) => Ok(0),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    if inserted > 0 {
        tracing::debug!("Inserted schema version {}", version);
    }
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            item_id TEXT NOT NULL,
            share_id TEXT NOT NULL,
            revision INTEGER,
            content_format_version INTEGER,
            rotation_id TEXT,
            content TEXT,
            user_signature TEXT,
            item_key_signature TEXT,
            vault_key_packet_signature TEXT,
            state INTEGER,
            signature_email TEXT,
            alias_email TEXT,
            create_time INTEGER,
            modify_time INTEGER,
            revision_time INTEGER,
            symmetrically_encrypted_content TEXT,
            last_used_time INTEGER,
            is_log_in_item INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (share_id, item_id)
        );

        CREATE TABLE IF NOT EXISTS shares (
            share_id TEXT PRIMARY KEY NOT NULL,
            vault_id TEXT,
            address_id TEXT,
            target_type INTEGER,
            target_id TEXT,
            permission INTEGER,
            content TEXT,
            content_key_rotation INTEGER,
            content_format_version INTEGER,
            expire_time INTEGER,
            create_time INTEGER
        );

        CREATE TABLE IF NOT EXISTS share_keys (
            share_id TEXT NOT NULL,
            rotation_id TEXT NOT NULL,
            rotation INTEGER,
            key TEXT,
            key_passphrase TEXT,
            key_signature TEXT,
            create_time INTEGER,
            PRIMARY KEY (share_id, rotation_id)
        );

        CREATE TABLE IF NOT EXISTS vault_keys (
            share_id TEXT NOT NULL,
            rotation_id TEXT NOT NULL,
            rotation INTEGER,
            key TEXT,
            key_passphrase TEXT,
            key_signature TEXT,
            create_time INTEGER,
            PRIMARY KEY (share_id, rotation_id)
        );

        CREATE TABLE IF NOT EXISTS feature_flags (
            user_id TEXT PRIMARY KEY NOT NULL,
            flags TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_items_share_state ON items(share_id, state);
        CREATE INDEX IF NOT EXISTS idx_items_alias_email ON items(alias_email);
        "#,
    )
    .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE items ADD COLUMN pinned INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE items ADD COLUMN pin_time INTEGER;
        CREATE INDEX IF NOT EXISTS idx_items_pinned ON items(pinned);
        "#,
    )
    .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}

/// Server-reported last use, kept apart from the local `last_used_time`
fn migrate_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch("ALTER TABLE items ADD COLUMN last_use_time INTEGER;")
        .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}
