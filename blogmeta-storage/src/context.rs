//! Ambient tenant context and its scoped switch guard.
//!
//! The host keeps a "current tenant" that its option API reads implicitly.
//! Migration has to run inside the target tenant, so it switches the context
//! through [`ScopedTenant`], which puts the previous tenant back when it goes
//! out of scope, on success, on error and on unwind alike.

use blogmeta_core::{MetaResult, TenantId};

/// The host's current-tenant context.
pub trait TenantContext: Send + Sync {
    /// Tenant the host is currently operating on.
    fn current_tenant(&self) -> TenantId;

    /// Make `tenant` the current tenant.
    fn switch_to(&self, tenant: TenantId) -> MetaResult<()>;
}

/// Scoped switch into a tenant. Restores the previous tenant on drop.
#[must_use = "the previous tenant is restored as soon as the guard is dropped"]
pub struct ScopedTenant<'a, C: TenantContext + ?Sized> {
    context: &'a C,
    previous: TenantId,
    tenant: TenantId,
}

impl<'a, C: TenantContext + ?Sized> ScopedTenant<'a, C> {
    /// Switch to `tenant`.
    ///
    /// If the switch itself fails the guard is dropped before returning, so
    /// any partial switch is rolled back too.
    pub fn enter(context: &'a C, tenant: TenantId) -> MetaResult<Self> {
        let guard = Self {
            context,
            previous: context.current_tenant(),
            tenant,
        };
        context.switch_to(tenant)?;
        Ok(guard)
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn previous(&self) -> TenantId {
        self.previous
    }
}

impl<C: TenantContext + ?Sized> Drop for ScopedTenant<'_, C> {
    fn drop(&mut self) {
        if self.context.current_tenant() == self.previous {
            return;
        }
        if let Err(e) = self.context.switch_to(self.previous) {
            tracing::warn!(
                tenant = %self.tenant,
                previous = %self.previous,
                error = %e,
                "Failed to restore tenant context"
            );
        }
    }
}
