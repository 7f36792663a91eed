use std::sync::Arc;

use adotely_types::{AuthProvider, BlobStore, DocumentStore, RealtimeStore};

/// Handles to the four external collaborators, built once at the composition
/// root and passed by reference everywhere else.
#[derive(Clone)]
pub struct Backend {
    pub docs: Arc<dyn DocumentStore>,
    pub realtime: Arc<dyn RealtimeStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backend {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        realtime: Arc<dyn RealtimeStore>,
        auth: Arc<dyn AuthProvider>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            docs,
            realtime,
            auth,
            blobs,
        }
    }

    /// Upload bytes and return the public URL.
    pub fn store_blob(&self, path: &str, bytes: &[u8]) -> crate::AppResult<String> {
        let handle = self.blobs.upload(path, bytes)?;
        Ok(self.blobs.download_url(&handle)?)
    }
}
