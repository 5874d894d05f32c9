//! Bulk migration of a tenant's resident options into the overlay.

use blogmeta_core::{encode_payload, is_empty_value, ManagedKey, MetaError, MetaResult, TenantId};

use super::BlogMetaSync;
use crate::cache::OverlayStore;
use crate::context::{ScopedTenant, TenantContext};
use crate::host::{OptionSource, TenantDirectory};

/// Keys written for one tenant, in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub tenant: TenantId,
    pub written: Vec<ManagedKey>,
}

/// Outcome of a batch activation.
#[derive(Debug, Default)]
pub struct ActivationReport {
    pub migrated: Vec<MigrationReport>,
    pub failed: Vec<(TenantId, MetaError)>,
}

impl ActivationReport {
    /// True when every listed tenant migrated.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn tenant_count(&self) -> usize {
        self.migrated.len() + self.failed.len()
    }
}

impl<O, S, D, C> BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    /// Copy every managed, non-empty option of `tenant` into the overlay.
    ///
    /// Runs inside a scoped switch to `tenant`. Entries are overwritten
    /// unconditionally. The previous tenant context is back in place when this
    /// returns, whether or not it succeeded.
    pub fn migrate(&self, tenant: TenantId) -> MetaResult<MigrationReport> {
        let _scope = ScopedTenant::enter(self.host.context.as_ref(), tenant)?;
        self.on_context_switched(tenant);

        let snapshot = self.host.options.load_all(tenant)?;
        let mut written = Vec::new();

        for key in self.registry.all_managed_keys() {
            let Some(value) = snapshot.get(key.as_str()) else {
                continue;
            };
            if is_empty_value(value) {
                continue;
            }
            let payload = encode_payload(&key, value)?;
            self.overlay.set(tenant, key.as_str(), &payload, None)?;
            written.push(key);
        }

        tracing::info!(tenant = %tenant, keys = written.len(), "Tenant options migrated to blog meta");
        Ok(MigrationReport { tenant, written })
    }

    /// Seed the overlay of a freshly created tenant.
    pub fn on_tenant_created(&self, tenant: TenantId) -> MetaResult<MigrationReport> {
        self.migrate(tenant).inspect_err(|e| {
            tracing::warn!(tenant = %tenant, error = %e, "Migration of new tenant failed");
        })
    }

    /// Administrative install entry point.
    ///
    /// Network-wide activation does nothing. Otherwise every tenant in the
    /// directory is migrated in turn; a failing tenant is recorded and the
    /// batch moves on.
    pub fn activate(&self, network_wide: bool) -> MetaResult<ActivationReport> {
        let mut report = ActivationReport::default();
        if network_wide {
            tracing::debug!("Network-wide activation, no migration run");
            return Ok(report);
        }

        for tenant in self.host.directory.list_tenant_ids()? {
            match self.migrate(tenant) {
                Ok(migrated) => report.migrated.push(migrated),
                Err(e) => {
                    tracing::warn!(tenant = %tenant, error = %e, "Tenant migration failed, continuing");
                    report.failed.push((tenant, e));
                }
            }
        }

        tracing::info!(
            migrated = report.migrated.len(),
            failed = report.failed.len(),
            "Activation finished"
        );
        Ok(report)
    }
}
