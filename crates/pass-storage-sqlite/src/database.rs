//! Database connection and initialization

use crate::{encryption::EncryptionKey, migrations, security::MasterKey, Error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
    master_key: MasterKey,
}

impl Database {
    /// Open database with encryption
    pub fn open<P: AsRef<Path>>(path: P, key: &EncryptionKey, master_key: MasterKey) -> Result<Self> {
        let db_exists = path.as_ref().exists();
        let path_buf = path.as_ref().to_path_buf();

        let conn = Connection::open_with_flags(
            &path_buf,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // PRAGMA key must be the first statement on the connection, otherwise
        // SQLCipher creates the file unencrypted.
        let key_hex = hex::encode(key.as_bytes());
        if let Err(e) = conn.execute(&format!("PRAGMA key = \"x'{}'\";", key_hex), []) {
            if !e.to_string().contains("Execute returned results") {
                return Err(Error::Encryption(format!(
                    "Failed to set database encryption key: {}",
                    e
                )));
            }
        }

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let cipher_version: std::result::Result<String, rusqlite::Error> =
            conn.query_row("PRAGMA cipher_version", [], |row| row.get(0));
        match cipher_version {
            Ok(version) if !version.is_empty() => {
                tracing::debug!("SQLCipher version: {}", version);
            }
            Ok(_) | Err(_) => {
                return Err(Error::Encryption(
                    "SQLCipher encryption verification failed. Database may not be encrypted."
                        .to_string(),
                ));
            }
        }

        if db_exists {
            let readable: std::result::Result<i64, rusqlite::Error> =
                conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0));
            if readable.is_err() {
                return Err(Error::Encryption(
                    "Cannot read encrypted database. It may have been created with a different key."
                        .to_string(),
                ));
            }
        }

        migrations::run_migrations(&conn)?;
        tracing::info!("Opened item cache at {}", path_buf.display());

        Ok(Self { conn, master_key })
    }

    /// Get connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get main key for content re-encryption
    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    /// Run `f` inside `BEGIN IMMEDIATE`, committing on success and rolling back on error
    pub fn immediate<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        immediate(&self.conn, f)
    }
}

/// Run `f` inside `BEGIN IMMEDIATE` on a bare connection
pub fn immediate<T>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    conn.execute_batch("BEGIN IMMEDIATE")?;
    let result = f(conn);
    if result.is_err() {
        let _ = conn.execute_batch("ROLLBACK");
    } else {
        conn.execute_batch("COMMIT")?;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::EncryptionAlgorithm;
    use tempfile::NamedTempFile;

    fn key() -> EncryptionKey {
        EncryptionKey::from_bytes([9u8; 32])
    }

    #[test]
    fn test_open_database() {
        let file = NamedTempFile::new().unwrap();
        let master_key = MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305);
        assert!(Database::open(file.path(), &key(), master_key).is_ok());
    }

    #[test]
    fn test_wrong_database_key_fails() {
        let file = NamedTempFile::new().unwrap();
        let master_key = MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305);
        drop(Database::open(file.path(), &key(), master_key.clone()).unwrap());

        let wrong = EncryptionKey::from_bytes([1u8; 32]);
        assert!(Database::open(file.path(), &wrong, master_key).is_err());
    }

    #[test]
    fn test_database_file_is_encrypted() {
        let file = NamedTempFile::new().unwrap();
        let master_key = MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305);
        let db = Database::open(file.path(), &key(), master_key).unwrap();
        db.conn()
            .execute(
                "INSERT INTO feature_flags (user_id, flags) VALUES ('u', 'sensitive data')",
                [],
            )
            .unwrap();
        drop(db);

        let contents = std::fs::read(file.path()).unwrap();
        assert!(!String::from_utf8_lossy(&contents).contains("sensitive data"));
    }

    #[test]
    fn test_immediate_rolls_back() {
        let file = NamedTempFile::new().unwrap();
        let master_key = MasterKey::generate(EncryptionAlgorithm::AesGcm);
        let db = Database::open(file.path(), &key(), master_key).unwrap();

        let result: Result<()> = db.immediate(|conn| {
            conn.execute("INSERT INTO feature_flags (user_id, flags) VALUES ('u', '{}')", [])?;
            Err(Error::Storage("abort".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM feature_flags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
