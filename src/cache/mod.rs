//! Resource caches.
//!
//! Thread-safe in-memory caches of provider resources that go stale once the
//! reaper deletes what they describe. Invalidation is idempotent: removing an
//! absent entry is a no-op.


use crate::provider::{Credentials, RegionAndName, SecurityGroup};
use dashmap::DashMap;
use std::sync::Arc;

/// Cache keyed by `(region, name)`.
///
/// # Examples
///
/// ```
/// use stratus::cache::ResourceCache;
/// use stratus::provider::RegionAndName;
///
/// let cache = ResourceCache::new();
/// let key = RegionAndName::new("us-east-1", "stratus#web");
/// cache.insert(key.clone(), 7u32);
///
/// assert_eq!(cache.get(&key), Some(7));
/// assert!(cache.invalidate(&key));
/// assert!(!cache.invalidate(&key));
/// ```
#[derive(Debug)]
pub struct ResourceCache<V> {
    entries: DashMap<RegionAndName, V>,
}

impl<V> Default for ResourceCache<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V: Clone> ResourceCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: RegionAndName, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &RegionAndName) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &RegionAndName) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop an entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &RegionAndName) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            tracing::trace!(key = %key, "Cache entry invalidated");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Login credentials keyed by free-form ids such as `node#<id>`.
#[derive(Debug, Default)]
pub struct CredentialStore {
    entries: DashMap<String, Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key under which a node's login credentials are stored.
    pub fn node_key(node_id: &str) -> String {
        format!("node#{node_id}")
    }

    pub fn insert(&self, key: impl Into<String>, credentials: Credentials) {
        self.entries.insert(key.into(), credentials);
    }

    pub fn get(&self, key: &str) -> Option<Credentials> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the removed credentials, if any were stored.
    pub fn remove(&self, key: &str) -> Option<Credentials> {
        self.entries.remove(key).map(|(_, credentials)| credentials)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The caches shared by the compute facade and the reaper.
#[derive(Debug, Clone, Default)]
pub struct Caches {
    /// Security groups by `(region, shared group name)`
    pub security_groups: Arc<ResourceCache<SecurityGroup>>,
    /// Generated key pair credentials by `(region, key name)` and `(region, group)`
    pub credentials: Arc<ResourceCache<Credentials>>,
    pub credential_store: Arc<CredentialStore>,
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }
}
