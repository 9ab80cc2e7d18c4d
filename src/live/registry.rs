//! Set of currently connected live-update subscribers

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Registry-assigned handle of one accepted connection. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub struct ConnectionRegistry<S> {
    subscribers: Mutex<HashMap<SubscriberId, Arc<S>>>,
    next_id: AtomicU64,
}

impl<S> ConnectionRegistry<S> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add an accepted connection. Every call yields a fresh id.
    pub fn register(&self, subscriber: Arc<S>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().insert(id, subscriber);
        id
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().remove(&id).is_some()
    }

    /// Copy of the active set. The lock is released before this returns.
    pub fn snapshot(&self) -> Vec<(SubscriberId, Arc<S>)> {
        self.subscribers
            .lock()
            .iter()
            .map(|(id, sub)| (*id, Arc::clone(sub)))
            .collect()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

impl<S> Default for ConnectionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_register_and_unregister() {
        let registry = ConnectionRegistry::new();
        let a = registry.register(Arc::new("a"));
        let b = registry.register(Arc::new("b"));

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        assert!(registry.unregister(a));
        assert!(!registry.contains(a));
        assert!(registry.contains(b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = ConnectionRegistry::new();
        let a = registry.register(Arc::new(()));

        assert!(registry.unregister(a));
        assert!(!registry.unregister(a));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let registry = ConnectionRegistry::new();
        let mut seen = HashSet::new();

        for _ in 0..50 {
            let id = registry.register(Arc::new(()));
            assert!(seen.insert(id));
            registry.unregister(id);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_changes() {
        let registry = ConnectionRegistry::new();
        let a = registry.register(Arc::new("a"));
        let snapshot = registry.snapshot();

        registry.unregister(a);
        registry.register(Arc::new("late"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, a);
        assert_eq!(*snapshot[0].1, "a");
    }

    #[test]
    fn test_concurrent_register_unregister() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                let mut kept = Vec::new();
                for i in 0..200 {
                    let id = registry.register(Arc::new((t, i)));
                    if i % 2 == 0 {
                        registry.unregister(id);
                        registry.unregister(id);
                    } else {
                        kept.push(id);
                    }
                }
                kept
            }));
        }

        let kept: Vec<SubscriberId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(registry.len(), 8 * 100);
        assert!(kept.iter().all(|id| registry.contains(*id)));
    }
}
