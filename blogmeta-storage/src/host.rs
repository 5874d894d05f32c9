//! Host collaborators the sync engine reads from.
//!
//! These are implemented by the host adapter. The engine never writes to the
//! underlying option store; it only observes its events and, during
//! migration, reads a full snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use blogmeta_core::{MetaResult, OptionValue, TenantId};

use crate::context::TenantContext;

/// Every option currently loaded for a tenant, keyed by option name.
pub type OptionSnapshot = HashMap<String, OptionValue>;

/// The host's default option store.
pub trait OptionSource: Send + Sync {
    /// Load the full resident option snapshot of a tenant.
    fn load_all(&self, tenant: TenantId) -> MetaResult<OptionSnapshot>;
}

/// The host's tenant listing.
pub trait TenantDirectory: Send + Sync {
    /// Ids of every tenant in the network.
    fn list_tenant_ids(&self) -> MetaResult<Vec<TenantId>>;
}

/// Anything a tenant listing can return.
pub trait TenantRecord {
    fn tenant_id(&self) -> TenantId;
}

impl TenantRecord for TenantId {
    fn tenant_id(&self) -> TenantId {
        *self
    }
}

/// Handles to the host services the engine needs for migration.
pub struct HostServices<S, D, C>
where
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    pub options: Arc<S>,
    pub directory: Arc<D>,
    pub context: Arc<C>,
}

impl<S, D, C> HostServices<S, D, C>
where
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    pub fn new(options: Arc<S>, directory: Arc<D>, context: Arc<C>) -> Self {
        Self {
            options,
            directory,
            context,
        }
    }
}

impl<S, D, C> Clone for HostServices<S, D, C>
where
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            directory: Arc::clone(&self.directory),
            context: Arc::clone(&self.context),
        }
    }
}
