//! Write-through mirroring of option mutations.

use blogmeta_core::{encode_payload, ManagedKey, MetaResult, OptionValue, TenantId};

use super::BlogMetaSync;
use crate::cache::{OverlayStore, WriteOutcome};
use crate::context::TenantContext;
use crate::host::{OptionSource, TenantDirectory};

/// What a write-through call did to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The key is not managed. Nothing was touched.
    Skipped,
    /// The overlay changed.
    Applied,
    /// The overlay was already in the requested state (existing entry on add,
    /// missing entry on delete).
    Unchanged,
    /// The previous-value hint was stale. The store kept its value.
    Conflict,
}

impl<O, S, D, C> BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    /// Mirror an option update.
    ///
    /// `old_value` goes to the store as a previous-value hint. A stale hint is
    /// resolved by the store; it is logged and reported, never retried.
    pub fn on_updated(
        &self,
        tenant: TenantId,
        key: &str,
        new_value: &OptionValue,
        old_value: &OptionValue,
    ) -> MetaResult<SyncOutcome> {
        if !self.registry.is_managed(key) {
            return Ok(SyncOutcome::Skipped);
        }

        let managed = ManagedKey::from(key);
        let payload = encode_payload(&managed, new_value)?;
        let previous = encode_payload(&managed, old_value)?;

        match self.overlay.set(tenant, key, &payload, Some(&previous))? {
            WriteOutcome::Written => Ok(SyncOutcome::Applied),
            WriteOutcome::Conflict => {
                tracing::warn!(
                    tenant = %tenant,
                    key,
                    "Blog meta changed since option was read, update not mirrored"
                );
                Ok(SyncOutcome::Conflict)
            }
        }
    }

    /// Mirror an option add. Never overwrites an existing entry.
    pub fn on_added(
        &self,
        tenant: TenantId,
        key: &str,
        value: &OptionValue,
    ) -> MetaResult<SyncOutcome> {
        if !self.registry.is_managed(key) {
            return Ok(SyncOutcome::Skipped);
        }

        let payload = encode_payload(&ManagedKey::from(key), value)?;
        if self.overlay.add(tenant, key, &payload)? {
            Ok(SyncOutcome::Applied)
        } else {
            Ok(SyncOutcome::Unchanged)
        }
    }

    /// Mirror an option delete. Deleting a missing entry is fine.
    pub fn on_deleted(&self, tenant: TenantId, key: &str) -> MetaResult<SyncOutcome> {
        if !self.registry.is_managed(key) {
            return Ok(SyncOutcome::Skipped);
        }

        if self.overlay.delete(tenant, key)? {
            Ok(SyncOutcome::Applied)
        } else {
            Ok(SyncOutcome::Unchanged)
        }
    }

    /// Record the host schema version for a tenant.
    ///
    /// Written to the configured version key whether or not it is managed.
    pub fn on_schema_upgrade(&self, tenant: TenantId, version: &OptionValue) -> MetaResult<()> {
        let key = &self.config.version_key;
        let payload = encode_payload(key, version)?;
        self.overlay.set(tenant, key.as_str(), &payload, None)?;
        tracing::info!(tenant = %tenant, version = %version, "Schema version mirrored to blog meta");
        Ok(())
    }
}
