//! Capability interfaces for the external collaborators the application is a
//! thin client over. Every backend (hosted or local) implements these.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api::{Preferences, Session};
use crate::error::{StoreError, StoreResult};
use crate::events::{AuthState, Snapshot, Subscription, ValueSnapshot};

/// Opaque field map stored verbatim by the document store.
pub type Fields = Map<String, Value>;

pub type SnapshotCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;
pub type ValueCallback = Arc<dyn Fn(ValueSnapshot) + Send + Sync>;
pub type AuthCallback = Arc<dyn Fn(AuthState) + Send + Sync>;

/// A document read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub path: String,
    pub fields: Fields,
}

impl Document {
    /// Decode the fields into a typed model.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

/// Serialize a model into a field map. Fails for anything that is not a JSON object.
pub fn to_fields<T: Serialize>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Equality filter used by [`DocumentStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub value: Value,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

/// Key-path addressed document store with live subscriptions.
pub trait DocumentStore: Send + Sync {
    fn get(&self, path: &str) -> StoreResult<Option<Document>>;

    /// Create or overwrite. With `merge`, existing fields not named in `fields` survive.
    fn set(&self, path: &str, fields: Fields, merge: bool) -> StoreResult<()>;

    /// Partial update of an existing document. `NotFound` if it is absent.
    fn update(&self, path: &str, fields: Fields) -> StoreResult<()>;

    /// Deleting an absent document is not an error.
    fn delete(&self, path: &str) -> StoreResult<()>;

    /// Create a document with a generated id and return the id.
    fn add(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// All documents of `collection` matching every predicate, in insertion order.
    fn query(&self, collection: &str, predicates: &[Predicate]) -> StoreResult<Vec<Document>>;

    /// Watch a document or a collection. The callback fires once with the
    /// current state, then after every change.
    fn subscribe(&self, path: &str, callback: SnapshotCallback) -> StoreResult<Subscription>;
}

/// Append-friendly JSON tree with live subscriptions.
pub trait RealtimeStore: Send + Sync {
    /// Append `value` under a fresh child key of `path`. Keys sort by creation time.
    fn push(&self, path: &str, value: Value) -> StoreResult<String>;

    /// Replace the subtree at `path`.
    fn set(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Remove the subtree at `path`.
    fn remove(&self, path: &str) -> StoreResult<()>;

    fn get_once(&self, path: &str) -> StoreResult<Option<Value>>;

    fn subscribe(&self, path: &str, callback: ValueCallback) -> StoreResult<Subscription>;
}

/// Issues stable user identifiers and tracks the session.
pub trait AuthProvider: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> StoreResult<Session>;

    /// Create an account and sign it in. Returns the new user id.
    fn sign_up(&self, email: &str, password: &str) -> StoreResult<String>;

    fn sign_out(&self) -> StoreResult<()>;

    fn send_password_reset(&self, email: &str) -> StoreResult<()>;

    fn delete_current_user(&self) -> StoreResult<()>;

    fn current_user_id(&self) -> Option<String>;

    /// The callback fires once with the current state, then on every change.
    fn on_auth_state_change(&self, callback: AuthCallback) -> StoreResult<Subscription>;
}

/// Reference to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

pub trait BlobStore: Send + Sync {
    fn upload(&self, path: &str, bytes: &[u8]) -> StoreResult<BlobHandle>;

    fn download_url(&self, handle: &BlobHandle) -> StoreResult<String>;
}

/// Device-local preferences (theme, onboarding).
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> StoreResult<Preferences>;

    fn save(&self, prefs: &Preferences) -> StoreResult<()>;
}
