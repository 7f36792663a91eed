use thiserror::Error;

/// Failures reported by a storage collaborator (document store, realtime
/// store, auth provider, blob store).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error("password too weak: {0}")]
    WeakPassword(String),

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
