use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use adotely_types::Subscription;

/// Registered watchers keyed by registration id.
///
/// Callbacks are cloned out under the lock and invoked by the caller after
/// the lock is released, so a callback may freely read or write the store.
pub struct WatchRegistry<C> {
    next_id: AtomicU64,
    watchers: Mutex<HashMap<u64, (String, C)>>,
}

impl<C> WatchRegistry<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Register `callback` against `target`. The returned guard unregisters it.
    pub fn register(self: &Arc<Self>, target: &str, callback: C) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (target.to_string(), callback));

        let registry = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.unregister(id);
            }
        })
    }

    fn unregister(&self, id: u64) {
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// `(target, callback)` of every watcher whose target satisfies `affected`,
    /// in registration order.
    pub fn matching(&self, affected: impl Fn(&str) -> bool) -> Vec<(String, C)> {
        let watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut hits: Vec<(u64, String, C)> = watchers
            .iter()
            .filter(|(_, (target, _))| affected(target))
            .map(|(id, (target, cb))| (*id, target.clone(), cb.clone()))
            .collect();
        hits.sort_by_key(|(id, _, _)| *id);
        hits.into_iter().map(|(_, target, cb)| (target, cb)).collect()
    }

    pub fn len(&self) -> usize {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> Default for WatchRegistry<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_drop() {
        let registry: Arc<WatchRegistry<u32>> = Arc::new(WatchRegistry::new());
        let a = registry.register("pets", 1);
        let b = registry.register("pets/p1", 2);
        assert_eq!(registry.len(), 2);

        let hits = registry.matching(|t| t == "pets");
        assert_eq!(hits, vec![("pets".to_string(), 1)]);

        drop(a);
        assert_eq!(registry.len(), 1);
        b.unsubscribe();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_guard_outliving_registry_is_harmless() {
        let registry: Arc<WatchRegistry<u32>> = Arc::new(WatchRegistry::new());
        let sub = registry.register("chats/a-b", 7);
        drop(registry);
        drop(sub);
    }
}
