//! Composition of the local backend from environment configuration.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::{AuthSettings, Database, DiskBlobStore, LocalAuth};

#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub db_path: PathBuf,
    pub blob_dir: PathBuf,
    /// Defaults to a `file://` URL of `blob_dir`.
    pub blob_base_url: Option<String>,
    pub auth: AuthSettings,
}

impl LocalConfig {
    /// Read `ADOTELY_DB_PATH`, `ADOTELY_BLOB_DIR`, `ADOTELY_BLOB_BASE_URL`
    /// and `ADOTELY_JWT_SECRET`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            db_path: non_empty("ADOTELY_DB_PATH")
                .unwrap_or_else(|| "adotely.db".into())
                .into(),
            blob_dir: non_empty("ADOTELY_BLOB_DIR")
                .unwrap_or_else(|| "./blobs".into())
                .into(),
            blob_base_url: non_empty("ADOTELY_BLOB_BASE_URL"),
            auth: AuthSettings::checked(&lookup("ADOTELY_JWT_SECRET").unwrap_or_default())?,
        })
    }
}

/// The local collaborators, ready to be bundled into the application's
/// backend. The database serves as document, realtime and preference store.
pub struct LocalBackend {
    pub db: Arc<Database>,
    pub auth: Arc<LocalAuth>,
    pub blobs: Arc<DiskBlobStore>,
}

impl LocalBackend {
    /// Open the database and blob directory, then resume the session left by
    /// the previous run.
    pub fn open(config: &LocalConfig) -> anyhow::Result<Self> {
        let db = Arc::new(Database::open(&config.db_path)?);
        let blobs = Arc::new(DiskBlobStore::new(
            config.blob_dir.clone(),
            config.blob_base_url.clone(),
        )?);
        let auth = Arc::new(LocalAuth::new(db.clone(), config.auth.clone()));

        if auth.resume()?.is_none() {
            info!("No stored session, starting signed out");
        }
        Ok(Self { db, auth, blobs })
    }
}
