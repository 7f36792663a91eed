//! Local backend: one SQLite file standing in for the hosted document store,
//! realtime store and auth provider, plus a disk-backed blob store.

pub mod auth;
pub mod blobs;
pub mod documents;
pub mod local;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod realtime;
pub mod settings;
pub mod watch;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use tracing::info;

use adotely_types::{SnapshotCallback, StoreError, ValueCallback};

pub use auth::{AuthSettings, LocalAuth};
pub use blobs::DiskBlobStore;
pub use local::{LocalBackend, LocalConfig};

use crate::watch::WatchRegistry;

pub struct Database {
    conn: Mutex<Connection>,
    doc_watchers: Arc<WatchRegistry<SnapshotCallback>>,
    node_watchers: Arc<WatchRegistry<ValueCallback>>,
    push_seq: AtomicU64,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self::from_connection(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database, gone when dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            doc_watchers: Arc::new(WatchRegistry::new()),
            node_watchers: Arc::new(WatchRegistry::new()),
            push_seq: AtomicU64::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

/// SQLite failures surface to callers as a transient backend failure.
pub(crate) fn backend(err: anyhow::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}
