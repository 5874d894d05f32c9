//! The option-to-blog-meta sync engine.
//!
//! [`BlogMetaSync`] owns the key registry and handles to the overlay store and
//! host services. Its behaviour is split by concern:
//!
//! - [`read_through`]: serve managed reads from the overlay, populate on miss
//! - [`write_through`]: mirror option updates, adds and deletes
//! - [`migration`]: seed a tenant's overlay from its option snapshot
//! - [`expansion`]: register per-tenant role keys as tenants are visited
//!
//! The engine is explicitly constructed and passed by reference. There is no
//! global instance.

pub mod expansion;
pub mod migration;
pub mod read_through;
pub mod write_through;

use std::sync::Arc;

use blogmeta_core::{MetaResult, SyncConfig};

use crate::cache::OverlayStore;
use crate::context::TenantContext;
use crate::host::{HostServices, OptionSource, TenantDirectory};
use crate::registry::{KeyFilter, KeyRegistry};

pub use migration::{ActivationReport, MigrationReport};
pub use read_through::{PendingPopulation, ReadOutcome};
pub use write_through::SyncOutcome;

/// Read-through / write-through sync between host options and blog meta.
///
/// # Type Parameters
///
/// - `O`: the overlay store
/// - `S`: the host option source (snapshots for migration)
/// - `D`: the host tenant directory
/// - `C`: the host tenant context
pub struct BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    overlay: Arc<O>,
    host: HostServices<S, D, C>,
    registry: KeyRegistry,
    config: SyncConfig,
}

impl<O, S, D, C> BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    /// Create an engine managing the configured static keys.
    pub fn new(overlay: Arc<O>, host: HostServices<S, D, C>, config: SyncConfig) -> MetaResult<Self> {
        config.validate()?;
        let registry = KeyRegistry::new(config.static_keys.iter().cloned());
        Ok(Self::assemble(overlay, host, registry, config))
    }

    /// Create an engine whose static keys pass through `filter` first.
    pub fn with_key_filter(
        overlay: Arc<O>,
        host: HostServices<S, D, C>,
        config: SyncConfig,
        filter: &dyn KeyFilter,
    ) -> MetaResult<Self> {
        config.validate()?;
        let registry = KeyRegistry::with_filter(config.static_keys.clone(), filter);
        Ok(Self::assemble(overlay, host, registry, config))
    }

    /// Create an engine only if the host provides an overlay store.
    ///
    /// Returns `Ok(None)` when it does not. The host adapter then wires no
    /// hooks at all and option reads and writes run unmodified.
    pub fn bootstrap(
        overlay: Option<Arc<O>>,
        host: HostServices<S, D, C>,
        config: SyncConfig,
    ) -> MetaResult<Option<Self>> {
        match overlay {
            Some(overlay) => Self::new(overlay, host, config).map(Some),
            None => {
                tracing::warn!("Blog meta store unavailable, option sync disabled");
                Ok(None)
            }
        }
    }

    fn assemble(
        overlay: Arc<O>,
        host: HostServices<S, D, C>,
        registry: KeyRegistry,
        config: SyncConfig,
    ) -> Self {
        tracing::info!(managed_keys = registry.len(), "Blog meta sync initialized");
        Self {
            overlay,
            host,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn is_managed(&self, key: &str) -> bool {
        self.registry.is_managed(key)
    }
}
