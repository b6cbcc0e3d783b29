//! Pass API client
//!
//! Talks to `/pass/v1` and keeps the encrypted local cache in step with it:
//! share and key resolution, item refresh with envelope verification, and
//! revision-checked writes with per-item reconciliation of batch results.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::result_large_err)]

pub mod api;
pub mod cancel;
pub mod config;
pub mod error;
pub mod items;
pub mod keys;
pub mod memory_server;
pub mod retry;
pub mod shares;

use pass_storage_sqlite::Database;
use std::sync::Arc;

/// Database handle shared by the repositories. Never held across an await.
pub type SharedDatabase = Arc<parking_lot::Mutex<Database>>;

pub use api::{HttpPassApi, PassApi, Session};
pub use cancel::CancelToken;
pub use config::{ClientConfig, RetryConfig, API_URL_ENV, DEFAULT_API_URL};
pub use error::{Error, Result};
pub use items::{ItemRepository, RefreshReport, RejectedItem};
pub use keys::{ResolvedKeys, ShareKeyRepository};
pub use memory_server::InMemoryPassServer;
pub use retry::with_retry;
pub use shares::ShareRepository;

/// Wrap a database for sharing between repositories
pub fn shared(db: Database) -> SharedDatabase {
    Arc::new(parking_lot::Mutex::new(db))
}
