//! Per-user feature flags, stored as a JSON blob

use crate::Result;
use pass_core::Error as CoreError;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

/// Feature flag storage operations
pub struct FeatureFlagStorage;

impl FeatureFlagStorage {
    /// Store flags for a user
    pub fn set<T: Serialize>(conn: &Connection, user_id: &str, flags: &T) -> Result<()> {
        let json = serde_json::to_string(flags)?;
        conn.execute(
            "INSERT OR REPLACE INTO feature_flags (user_id, flags) VALUES (?1, ?2)",
            params![user_id, json],
        )?;
        Ok(())
    }

    /// Load flags for a user, `None` when never stored
    pub fn get<T: DeserializeOwned>(conn: &Connection, user_id: &str) -> Result<Option<T>> {
        let row: Option<Option<String>> = conn
            .query_row(
                "SELECT flags FROM feature_flags WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some(None) => Err(CoreError::corrupted("FeatureFlagsEntity", "flags").into()),
            Some(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
        }
    }

    /// Remove flags for a user
    pub fn delete(conn: &Connection, user_id: &str) -> Result<()> {
        conn.execute("DELETE FROM feature_flags WHERE user_id = ?1", params![user_id])?;
        Ok(())
    }
}
