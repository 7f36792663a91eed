use serde_json::Value;

use crate::store::Document;

/// Full state pushed to a document-store subscriber.
///
/// Every delivery replaces whatever the subscriber derived from the previous
/// one; snapshots are never deltas.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// Watched a single document. `None` means it does not exist (yet, or anymore).
    Document(Option<Document>),

    /// Watched a collection. Documents are in insertion order.
    Collection(Vec<Document>),
}

impl Snapshot {
    /// Documents carried by this snapshot, regardless of target kind.
    pub fn documents(&self) -> Vec<&Document> {
        match self {
            Self::Document(doc) => doc.iter().collect(),
            Self::Collection(docs) => docs.iter().collect(),
        }
    }
}

/// Realtime-store subscribers receive the value at the watched path, or `None`
/// once it has been removed.
pub type ValueSnapshot = Option<Value>;

/// Emitted by an auth provider whenever the signed-in user changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn { user_id: String, email: String },
    SignedOut,
}

/// Registration guard returned by every `subscribe` call.
///
/// The watch is released exactly once: on [`Subscription::unsubscribe`] or
/// when the guard is dropped.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard with nothing to release.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
