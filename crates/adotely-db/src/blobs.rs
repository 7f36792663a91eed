use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use adotely_types::paths;
use adotely_types::{BlobHandle, BlobStore, StoreError, StoreResult};

/// 20 MB upload limit per blob
const MAX_BLOB_SIZE: usize = 20 * 1024 * 1024;

/// Blob storage on local disk.
///
/// Each blob is stored as a flat file at `{dir}/{path}`. URLs are built from a
/// base URL and carry a short content digest so a replaced photo gets a new URL.
pub struct DiskBlobStore {
    dir: PathBuf,
    base_url: String,
}

impl DiskBlobStore {
    /// `base_url` defaults to a `file://` URL of the storage directory.
    pub fn new(dir: PathBuf, base_url: Option<String>) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir)?;
        let dir = dir.canonicalize()?;
        let base_url = base_url.unwrap_or_else(|| format!("file://{}", dir.display()));

        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir, base_url })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path on disk for a blob path. Rejects anything that could escape `dir`.
    pub fn file_path(&self, path: &str) -> StoreResult<PathBuf> {
        let segments = paths::segments(path)?;
        if segments.iter().any(|s| s.contains('\\')) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(segments.iter().fold(self.dir.clone(), |acc, s| acc.join(s)))
    }
}

impl BlobStore for DiskBlobStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> StoreResult<BlobHandle> {
        if bytes.is_empty() {
            return Err(StoreError::InvalidDocument("empty upload".into()));
        }
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(StoreError::PermissionDenied(format!(
                "upload of {} bytes exceeds the {} byte limit",
                bytes.len(),
                MAX_BLOB_SIZE
            )));
        }

        let file_path = self.file_path(path)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("create {}: {}", parent.display(), e)))?;
        }
        fs::write(&file_path, bytes)
            .map_err(|e| StoreError::Unavailable(format!("write {}: {}", file_path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = hex::encode(hasher.finalize());

        debug!("Blob stored: {} ({} bytes)", path, bytes.len());
        Ok(BlobHandle {
            path: path.to_string(),
            size: bytes.len() as u64,
            sha256,
        })
    }

    fn download_url(&self, handle: &BlobHandle) -> StoreResult<String> {
        let file_path = self.file_path(&handle.path)?;
        if !file_path.is_file() {
            return Err(StoreError::NotFound(handle.path.clone()));
        }

        let version = handle.sha256.get(..12).unwrap_or(&handle.sha256);
        Ok(format!(
            "{}/{}?v={}",
            self.base_url.trim_end_matches('/'),
            handle.path,
            version
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DiskBlobStore {
        let dir = std::env::temp_dir().join(format!("adotely_blobs_{}", uuid::Uuid::new_v4()));
        DiskBlobStore::new(dir, Some("https://cdn.example.com/".into())).unwrap()
    }

    #[test]
    fn test_upload_and_url() {
        let store = store();
        let handle = store.upload("pets/s1_1700000000000.jpg", b"jpeg bytes").unwrap();
        assert_eq!(handle.size, 10);
        assert_eq!(handle.sha256.len(), 64);

        let url = store.download_url(&handle).unwrap();
        assert!(url.starts_with("https://cdn.example.com/pets/s1_1700000000000.jpg?v="));
        assert_eq!(
            fs::read(store.dir().join("pets").join("s1_1700000000000.jpg")).unwrap(),
            b"jpeg bytes"
        );
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_rejects_traversal_and_empty() {
        let store = store();
        assert!(store.upload("../escape.jpg", b"x").is_err());
        assert!(store.upload("/etc/passwd", b"x").is_err());
        assert!(store.upload("pets/a.jpg", b"").is_err());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_missing_blob_has_no_url() {
        let store = store();
        let handle = BlobHandle {
            path: "pets/ghost.jpg".into(),
            size: 1,
            sha256: "abc".into(),
        };
        assert!(matches!(store.download_url(&handle), Err(StoreError::NotFound(_))));
        let _ = fs::remove_dir_all(store.dir());
    }
}
