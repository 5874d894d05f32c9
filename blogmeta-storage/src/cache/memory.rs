//! In-memory overlay store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use blogmeta_core::{ManagedKey, MetaResult, StorageError, TenantId};
use chrono::Utc;

use super::traits::{OverlayEntry, OverlayStats, OverlayStore, WriteOutcome};

/// Overlay store backed by a process-local map.
///
/// Used by tests and by hosts that rebuild the overlay on every start.
#[derive(Debug, Default)]
pub struct InMemoryOverlayStore {
    entries: RwLock<BTreeMap<(TenantId, ManagedKey), OverlayEntry>>,
    stats: RwLock<OverlayStats>,
}

impl InMemoryOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry with its write timestamp.
    pub fn entry(&self, tenant: TenantId, key: &str) -> MetaResult<Option<OverlayEntry>> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(&(tenant, ManagedKey::from(key))).cloned())
    }

    /// Total number of entries across tenants.
    pub fn len(&self) -> MetaResult<usize> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> MetaResult<bool> {
        Ok(self.len()? == 0)
    }

    fn bump(&self, update: impl FnOnce(&mut OverlayStats)) {
        let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
        update(&mut stats);
    }

    fn stored(payload: &str) -> OverlayEntry {
        OverlayEntry {
            payload: payload.to_string(),
            stored_at: Utc::now(),
        }
    }
}

impl OverlayStore for InMemoryOverlayStore {
    fn get(&self, tenant: TenantId, key: &str) -> MetaResult<Option<String>> {
        let found = self
            .entries
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .get(&(tenant, ManagedKey::from(key)))
            .map(|entry| entry.payload.clone());

        if found.is_some() {
            self.bump(|s| s.hits += 1);
        } else {
            self.bump(|s| s.misses += 1);
        }
        Ok(found)
    }

    fn set(
        &self,
        tenant: TenantId,
        key: &str,
        payload: &str,
        previous: Option<&str>,
    ) -> MetaResult<WriteOutcome> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        let slot = (tenant, ManagedKey::from(key));

        let stale = match (entries.get(&slot), previous) {
            (Some(current), Some(prev)) => current.payload != prev,
            _ => false,
        };
        if stale {
            drop(entries);
            self.bump(|s| s.conflicts += 1);
            return Ok(WriteOutcome::Conflict);
        }

        let is_new = entries.insert(slot, Self::stored(payload)).is_none();
        drop(entries);
        if is_new {
            self.bump(|s| s.entry_count += 1);
        }
        Ok(WriteOutcome::Written)
    }

    fn add(&self, tenant: TenantId, key: &str, payload: &str) -> MetaResult<bool> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        let slot = (tenant, ManagedKey::from(key));
        if entries.contains_key(&slot) {
            return Ok(false);
        }
        entries.insert(slot, Self::stored(payload));
        drop(entries);
        self.bump(|s| s.entry_count += 1);
        Ok(true)
    }

    fn delete(&self, tenant: TenantId, key: &str) -> MetaResult<bool> {
        let removed = self
            .entries
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .remove(&(tenant, ManagedKey::from(key)))
            .is_some();
        if removed {
            self.bump(|s| s.entry_count = s.entry_count.saturating_sub(1));
        }
        Ok(removed)
    }

    fn tenant_keys(&self, tenant: TenantId) -> MetaResult<Vec<ManagedKey>> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries
            .keys()
            .filter(|(owner, _)| *owner == tenant)
            .map(|(_, key)| key.clone())
            .collect())
    }

    fn stats(&self) -> MetaResult<OverlayStats> {
        Ok(self.stats.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}
