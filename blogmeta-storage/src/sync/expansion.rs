//! Per-tenant derived keys.
//!
//! Each non-primary tenant keeps its roles under its own option name
//! (`wp_7_user_roles`). The name is registered the first time the tenant is
//! visited, after which it goes through the same read-through and
//! write-through paths as the static keys.

use blogmeta_core::TenantId;

use super::BlogMetaSync;
use crate::cache::OverlayStore;
use crate::context::TenantContext;
use crate::host::{OptionSource, TenantDirectory, TenantRecord};

impl<O, S, D, C> BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    /// Register the derived role key of `tenant`.
    ///
    /// Returns whether the registry grew. The primary tenant already uses the
    /// base role key and never derives one.
    pub fn on_context_switched(&self, tenant: TenantId) -> bool {
        if tenant == self.config.primary_tenant {
            return false;
        }

        let key = self.config.derived_role_key(tenant);
        let added = self.registry.register_derived_key(key.clone());
        if added {
            tracing::info!(tenant = %tenant, key = %key, "Derived key registered");
        }
        added
    }

    /// Expand keys for every tenant in a listing result. The list is returned
    /// untouched.
    pub fn on_tenants_listed<T: TenantRecord>(&self, tenants: Vec<T>) -> Vec<T> {
        for record in &tenants {
            self.on_context_switched(record.tenant_id());
        }
        tenants
    }
}
