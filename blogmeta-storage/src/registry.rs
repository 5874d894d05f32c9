//! Registry of option names mirrored into the overlay.
//!
//! The registry starts from the configured static list, passed once through a
//! [`KeyFilter`], and then only grows as per-tenant derived keys are
//! discovered. Nothing is ever removed.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use blogmeta_core::ManagedKey;

/// Extension point that can narrow or extend the static key list.
///
/// Any `Fn(Vec<ManagedKey>) -> Vec<ManagedKey>` closure is a filter.
pub trait KeyFilter: Send + Sync {
    fn filter(&self, keys: Vec<ManagedKey>) -> Vec<ManagedKey>;
}

impl<F> KeyFilter for F
where
    F: Fn(Vec<ManagedKey>) -> Vec<ManagedKey> + Send + Sync,
{
    fn filter(&self, keys: Vec<ManagedKey>) -> Vec<ManagedKey> {
        self(keys)
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    members: HashSet<ManagedKey>,
    /// Registration order: static keys first, then derived keys.
    order: Vec<ManagedKey>,
}

impl RegistryInner {
    fn insert(&mut self, key: ManagedKey) -> bool {
        if self.members.contains(key.as_str()) {
            return false;
        }
        self.members.insert(key.clone());
        self.order.push(key);
        true
    }
}

/// Append-only set of managed option names.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    inner: RwLock<RegistryInner>,
    static_len: usize,
}

impl KeyRegistry {
    /// Build from a static list. Duplicates keep their first position.
    pub fn new(static_keys: impl IntoIterator<Item = ManagedKey>) -> Self {
        let mut inner = RegistryInner::default();
        for key in static_keys {
            inner.insert(key);
        }
        let static_len = inner.order.len();
        Self {
            inner: RwLock::new(inner),
            static_len,
        }
    }

    /// Build from a static list after running it through `filter`.
    pub fn with_filter(static_keys: Vec<ManagedKey>, filter: &dyn KeyFilter) -> Self {
        Self::new(filter.filter(static_keys))
    }

    // The set is append-only, so a poisoned lock still holds a valid set.
    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_managed(&self, key: &str) -> bool {
        self.read().members.contains(key)
    }

    /// Every managed key in registration order.
    pub fn all_managed_keys(&self) -> Vec<ManagedKey> {
        self.read().order.clone()
    }

    /// Keys registered after construction.
    pub fn derived_keys(&self) -> Vec<ManagedKey> {
        self.read().order[self.static_len..].to_vec()
    }

    /// Add a derived key. Returns `false` if it was already managed.
    pub fn register_derived_key(&self, key: ManagedKey) -> bool {
        if self.is_managed(key.as_str()) {
            return false;
        }
        self.write().insert(key)
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
