//! Weakly held registry of tracked futures
//!
//! Only the resolver loop touches the registry. Entries hold weak
//! handles, so membership can shrink at any time when callers drop their
//! futures; every lookup is best effort.

use std::collections::{BTreeSet, HashMap};

use crate::future::{RemoteFuture, WeakFuture, WorkKey};

#[derive(Debug, Default)]
pub(crate) struct FutureRegistry {
    entries: HashMap<WorkKey, WeakFuture>,
}

impl FutureRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, future: &RemoteFuture) {
        self.entries.insert(future.key(), future.downgrade());
    }

    /// Live future for `key`, if one is still held somewhere
    pub(crate) fn get(&self, key: &WorkKey) -> Option<RemoteFuture> {
        self.entries.get(key).and_then(WeakFuture::upgrade)
    }

    pub(crate) fn remove(&mut self, key: &WorkKey) {
        self.entries.remove(key);
    }

    /// Drops entries whose futures were released by every holder
    pub(crate) fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, future| future.is_alive());
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Job ids of the futures still alive
    pub(crate) fn job_ids(&self) -> BTreeSet<u64> {
        self.entries
            .iter()
            .filter(|(_, future)| future.is_alive())
            .map(|(key, _)| key.job_id)
            .collect()
    }

    /// Empties the registry, returning the futures still alive
    pub(crate) fn drain_live(&mut self) -> Vec<RemoteFuture> {
        self.entries
            .drain()
            .filter_map(|(_, future)| future.upgrade())
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_futures_are_pruned() {
        let mut registry = FutureRegistry::new();
        let kept = RemoteFuture::new(1, 0);
        let dropped = RemoteFuture::new(2, 0);

        registry.insert(&kept);
        registry.insert(&dropped);
        drop(dropped);

        assert_eq!(registry.job_ids(), BTreeSet::from([1]));
        assert!(registry.get(&WorkKey::new(2, 0)).is_none());

        assert_eq!(registry.prune(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&WorkKey::new(1, 0)).is_some());
    }

    #[test]
    fn test_abandoned_futures_do_not_accumulate() {
        let mut registry = FutureRegistry::new();
        for work_id in 0..1000 {
            let future = RemoteFuture::new(5, work_id);
            registry.insert(&future);
        }

        registry.prune();
        assert!(registry.is_empty());
        assert!(registry.job_ids().is_empty());
    }

    #[test]
    fn test_registry_does_not_own_futures() {
        let mut registry = FutureRegistry::new();
        let future = RemoteFuture::new(1, 1);
        registry.insert(&future);

        let weak = future.downgrade();
        drop(future);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_drain_live_skips_dead_entries() {
        let mut registry = FutureRegistry::new();
        let live = RemoteFuture::new(1, 0);
        registry.insert(&live);
        registry.insert(&RemoteFuture::new(1, 1));

        let drained = registry.drain_live();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].key(), live.key());
        assert!(registry.is_empty());
    }
}
