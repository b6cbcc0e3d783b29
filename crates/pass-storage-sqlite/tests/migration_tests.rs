//! Migration tests
//!
//! Tests database schema migrations against a plain connection.

use pass_storage_sqlite::migrations;
use rusqlite::Connection;
use tempfile::NamedTempFile;

#[test]
fn test_fresh_migration() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();

    verify_schema(&conn);
}

#[test]
fn test_migration_idempotency() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();
    migrations::run_migrations(&conn).unwrap();

    verify_schema(&conn);
}

#[test]
fn test_schema_version_tracking() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    assert_eq!(migrations::get_schema_version(&conn).unwrap(), 0);
    migrations::run_migrations(&conn).unwrap();
    assert_eq!(migrations::get_schema_version(&conn).unwrap(), 3);
}

#[test]
fn test_item_columns_are_nullable() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();

    // A partial write keeps only the keys
    conn.execute(
        "INSERT INTO items (item_id, share_id) VALUES ('item-1', 'share-1')",
        [],
    )
    .unwrap();

    let (pinned, rotation_id): (bool, Option<String>) = conn
        .query_row(
            "SELECT pinned, rotation_id FROM items WHERE item_id = 'item-1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert!(!pinned);
    assert!(rotation_id.is_none());
}

#[test]
fn test_server_last_use_column_added_to_existing_items() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();
    conn.execute(
        "INSERT INTO items (item_id, share_id, last_used_time) VALUES ('item-1', 'share-1', 5)",
        [],
    )
    .unwrap();

    let last_use_time: Option<i64> = conn
        .query_row(
            "SELECT last_use_time FROM items WHERE item_id = 'item-1'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(last_use_time.is_none());
}

#[test]
fn test_key_primary_keys() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();

    conn.execute(
        "INSERT INTO vault_keys (share_id, rotation_id, rotation) VALUES ('s', 'r1', 1)",
        [],
    )
    .unwrap();
    let result = conn.execute(
        "INSERT INTO vault_keys (share_id, rotation_id, rotation) VALUES ('s', 'r1', 2)",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn test_indexes_exist() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();

    let indexes: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert!(indexes.contains(&"idx_items_share_state".to_string()));
    assert!(indexes.contains(&"idx_items_alias_email".to_string()));
    assert!(indexes.contains(&"idx_items_pinned".to_string()));
}

fn verify_schema(conn: &Connection) {
    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    for table in ["items", "shares", "share_keys", "vault_keys", "feature_flags", "schema_version"] {
        assert!(tables.contains(&table.to_string()), "missing table {}", table);
    }
}
