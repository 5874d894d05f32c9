//! Hook traits the host adapter wires to its own event points.
//!
//! The host fires option and tenant events; the adapter forwards them through
//! these traits. [`BlogMetaSync`] implements all three.

use blogmeta_core::{MetaResult, OptionValue, TenantId};

use crate::cache::OverlayStore;
use crate::context::TenantContext;
use crate::host::{OptionSource, TenantDirectory, TenantRecord};
use crate::sync::{BlogMetaSync, MigrationReport, PendingPopulation, ReadOutcome, SyncOutcome};

/// Pre-read and post-read interception of option lookups.
pub trait ReadInterceptor {
    /// Called before the host resolves `key`.
    fn before_read(&self, tenant: TenantId, key: &str) -> MetaResult<ReadOutcome>;

    /// Called with the value the host resolved after a miss.
    fn after_read(&self, pending: PendingPopulation, resolved: &OptionValue) -> MetaResult<bool>;
}

/// Observer of successful option mutations.
pub trait WriteObserver {
    fn updated(
        &self,
        tenant: TenantId,
        key: &str,
        old_value: &OptionValue,
        new_value: &OptionValue,
    ) -> MetaResult<SyncOutcome>;

    fn added(&self, tenant: TenantId, key: &str, value: &OptionValue) -> MetaResult<SyncOutcome>;

    fn deleted(&self, tenant: TenantId, key: &str) -> MetaResult<SyncOutcome>;

    fn schema_upgraded(&self, tenant: TenantId, version: &OptionValue) -> MetaResult<()>;
}

/// Observer of tenant lifecycle events.
///
/// `T` is the record type the host's tenant listing returns.
pub trait TenantLifecycleObserver<T: TenantRecord = TenantId> {
    fn tenant_created(&self, tenant: TenantId) -> MetaResult<MigrationReport>;

    fn context_switched(&self, tenant: TenantId);

    /// Sees a listing result on its way back to the caller, which gets it
    /// back unchanged.
    fn tenants_listed(&self, tenants: Vec<T>) -> Vec<T>;
}

impl<O, S, D, C> ReadInterceptor for BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    fn before_read(&self, tenant: TenantId, key: &str) -> MetaResult<ReadOutcome> {
        self.intercept_read(tenant, key)
    }

    fn after_read(&self, pending: PendingPopulation, resolved: &OptionValue) -> MetaResult<bool> {
        self.on_underlying_read_resolved(pending, resolved)
    }
}

impl<O, S, D, C> WriteObserver for BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    fn updated(
        &self,
        tenant: TenantId,
        key: &str,
        old_value: &OptionValue,
        new_value: &OptionValue,
    ) -> MetaResult<SyncOutcome> {
        self.on_updated(tenant, key, new_value, old_value)
    }

    fn added(&self, tenant: TenantId, key: &str, value: &OptionValue) -> MetaResult<SyncOutcome> {
        self.on_added(tenant, key, value)
    }

    fn deleted(&self, tenant: TenantId, key: &str) -> MetaResult<SyncOutcome> {
        self.on_deleted(tenant, key)
    }

    fn schema_upgraded(&self, tenant: TenantId, version: &OptionValue) -> MetaResult<()> {
        self.on_schema_upgrade(tenant, version)
    }
}

impl<O, S, D, C, T> TenantLifecycleObserver<T> for BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
    T: TenantRecord,
{
    fn tenant_created(&self, tenant: TenantId) -> MetaResult<MigrationReport> {
        self.on_tenant_created(tenant)
    }

    fn context_switched(&self, tenant: TenantId) {
        self.on_context_switched(tenant);
    }

    fn tenants_listed(&self, tenants: Vec<T>) -> Vec<T> {
        self.on_tenants_listed(tenants)
    }
}
