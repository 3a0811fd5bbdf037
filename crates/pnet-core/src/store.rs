// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Group FN Store
// ─────────────────────────────────────────────────────────────────────
//! Write-once, read-many cache of estimated group FN sets.
//!
//! Keys combine a cohort label with the configuration fingerprint and the
//! spatial graph identity, so a changed K, seed, normalization or graph
//! never reuses stale maps. Entries are handed out as `Arc` clones and are
//! never mutated or replaced.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use pnet_data::SpatialGraph;
use pnet_types::{GroupFnSet, PnetConfig, PnetResult};

#[derive(Default)]
pub struct GroupFnStore {
    sets: RwLock<HashMap<String, Arc<GroupFnSet>>>,
}

impl GroupFnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a cohort under a configuration and optional graph.
    pub fn key(label: &str, config: &PnetConfig, graph: Option<&SpatialGraph>) -> String {
        let graph = graph.map_or_else(|| "nograph".to_string(), SpatialGraph::fingerprint);
        format!("{label}|{}|{graph}", config.group_fingerprint())
    }

    pub fn get(&self, key: &str) -> Option<Arc<GroupFnSet>> {
        self.sets.read().get(key).cloned()
    }

    /// Store `set` under `key` unless the key is taken; either way the
    /// stored entry is returned.
    pub fn insert(&self, key: &str, set: GroupFnSet) -> Arc<GroupFnSet> {
        let mut sets = self.sets.write();
        if let Some(existing) = sets.get(key) {
            log::warn!("group FN set {key} already stored, keeping the first");
            return existing.clone();
        }
        let set = Arc::new(set);
        sets.insert(key.to_string(), set.clone());
        set
    }

    /// Return the set stored under `key`, running `estimate` first if
    /// there is none. Concurrent callers for one key estimate once.
    ///
    /// The upgradable read lock is held while `estimate` runs: plain
    /// readers (`get`, `len`, `keys`) proceed, but estimations for other
    /// keys and `insert` wait until it finishes. Cohort-level estimation
    /// is rare enough that serializing it is acceptable.
    pub fn get_or_estimate<F>(&self, key: &str, estimate: F) -> PnetResult<Arc<GroupFnSet>>
    where
        F: FnOnce() -> PnetResult<GroupFnSet>,
    {
        if let Some(set) = self.get(key) {
            log::debug!("group FN store hit: {key}");
            return Ok(set);
        }
        let guard = self.sets.upgradable_read();
        if let Some(set) = guard.get(key) {
            return Ok(set.clone());
        }
        let set = Arc::new(estimate()?);
        let mut sets = RwLockUpgradableReadGuard::upgrade(guard);
        sets.insert(key.to_string(), set.clone());
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sets.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pnet_types::{Matrix, PnetError};

    fn set(value: f64) -> GroupFnSet {
        GroupFnSet::from_maps(Matrix::filled(4, 2, value)).unwrap()
    }

    #[test]
    fn test_key_includes_config() {
        let a = PnetConfig::default();
        let mut b = PnetConfig::default();
        b.decomposition.k = 9;
        assert_ne!(GroupFnStore::key("study", &a, None), GroupFnStore::key("study", &b, None));
        assert_ne!(GroupFnStore::key("x", &a, None), GroupFnStore::key("y", &a, None));
    }

    #[test]
    fn test_key_includes_graph() {
        let config = PnetConfig::default();
        let chain = SpatialGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        let star = SpatialGraph::from_edges(3, &[(0, 1), (0, 2)]).unwrap();
        let plain = GroupFnStore::key("study", &config, None);
        assert_ne!(plain, GroupFnStore::key("study", &config, Some(&chain)));
        assert_ne!(
            GroupFnStore::key("study", &config, Some(&chain)),
            GroupFnStore::key("study", &config, Some(&star))
        );
    }

    #[test]
    fn test_insert_is_write_once() {
        let store = GroupFnStore::new();
        store.insert("k", set(0.1));
        let kept = store.insert("k", set(0.9));
        assert_eq!(kept.maps().get(0, 0), 0.1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_or_estimate_runs_once() {
        let store = GroupFnStore::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let got = store
                .get_or_estimate("k", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(set(0.5))
                })
                .unwrap();
            assert_eq!(got.k(), 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_callers_share_one_estimate() {
        let store = Arc::new(GroupFnStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let calls = calls.clone();
                std::thread::spawn(move || {
                    store
                        .get_or_estimate("shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(set(0.5))
                        })
                        .unwrap()
                })
            })
            .collect();
        let sets: Vec<Arc<GroupFnSet>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sets.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_readers_not_blocked_during_estimate() {
        let store = GroupFnStore::new();
        store.insert("ready", set(0.3));
        let got = store
            .get_or_estimate("pending", || {
                assert_eq!(store.len(), 1);
                assert!(store.get("ready").is_some());
                assert!(store.get("pending").is_none());
                Ok(set(0.5))
            })
            .unwrap();
        assert_eq!(got.maps().get(0, 0), 0.5);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_failed_estimate_not_cached() {
        let store = GroupFnStore::new();
        let err = store.get_or_estimate("k", || Err(PnetError::Config("bad".into())));
        assert!(err.is_err());
        assert!(store.is_empty());
        assert!(store.get_or_estimate("k", || Ok(set(0.5))).is_ok());
        assert_eq!(store.keys(), vec!["k".to_string()]);
    }
}
