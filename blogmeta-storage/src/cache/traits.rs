//! Overlay store trait and statistics.
//!
//! The overlay store is the host's per-tenant key/value store ("blog meta").
//! The sync engine only ever talks to it through [`OverlayStore`].

use blogmeta_core::{ManagedKey, MetaResult, TenantId};
use chrono::{DateTime, Utc};

/// Result of a [`OverlayStore::set`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value was stored.
    Written,
    /// A previous-value hint was given and did not match the stored value.
    /// Nothing was written.
    Conflict,
}

/// A stored overlay payload with the time it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    pub payload: String,
    pub stored_at: DateTime<Utc>,
}

/// Per-tenant key/value store addressed by (tenant, key).
///
/// Implementations must make each single call atomic for one (tenant, key)
/// pair. The sync engine performs no locking of its own.
///
/// # Set semantics
///
/// `set` follows the host's metadata update rules:
/// - no entry yet: the value is inserted, whatever the hint
/// - entry present, `previous` is `Some` and differs from the stored
///   payload: [`WriteOutcome::Conflict`], nothing changes
/// - otherwise the stored payload is replaced
pub trait OverlayStore: Send + Sync {
    /// Read the payload stored for (tenant, key).
    fn get(&self, tenant: TenantId, key: &str) -> MetaResult<Option<String>>;

    /// Store a payload, optionally guarded by the previous payload.
    fn set(
        &self,
        tenant: TenantId,
        key: &str,
        payload: &str,
        previous: Option<&str>,
    ) -> MetaResult<WriteOutcome>;

    /// Insert only if no entry exists. Returns whether it was inserted.
    fn add(&self, tenant: TenantId, key: &str, payload: &str) -> MetaResult<bool>;

    /// Remove (tenant, key). Returns whether an entry existed.
    fn delete(&self, tenant: TenantId, key: &str) -> MetaResult<bool>;

    /// All keys currently stored for a tenant, sorted by name.
    fn tenant_keys(&self, tenant: TenantId) -> MetaResult<Vec<ManagedKey>>;

    /// Usage statistics.
    fn stats(&self) -> MetaResult<OverlayStats>;
}

/// Statistics about overlay usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayStats {
    /// Number of reads that found an entry.
    pub hits: u64,
    /// Number of reads that found nothing.
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Number of guarded writes rejected by a stale hint.
    pub conflicts: u64,
}

impl OverlayStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
