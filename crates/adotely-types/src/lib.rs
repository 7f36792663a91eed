pub mod api;
pub mod error;
pub mod events;
pub mod models;
pub mod paths;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use events::{AuthState, Snapshot, Subscription};
pub use store::{
    AuthCallback, AuthProvider, BlobHandle, BlobStore, Document, DocumentStore, Fields,
    Predicate, PreferenceStore, RealtimeStore, SnapshotCallback, ValueCallback, to_fields,
};
