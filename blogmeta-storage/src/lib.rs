//! Blog Meta Storage - Option Sync Engine
//!
//! Mirrors a fixed set of tenant options into the per-tenant blog meta store
//! and serves reads of those options from it.
//! The host adapter implements the traits in [`host`] and [`context`] and
//! wires the observers in [`hooks`] to its own event points.

pub mod cache;
pub mod context;
pub mod hooks;
pub mod host;
pub mod registry;
pub mod search;
pub mod sync;

pub use cache::{
    InMemoryOverlayStore, LmdbOverlayError, LmdbOverlayStore, OverlayEntry, OverlayKey,
    OverlayStats, OverlayStore, WriteOutcome,
};
pub use context::{ScopedTenant, TenantContext};
pub use hooks::{ReadInterceptor, TenantLifecycleObserver, WriteObserver};
pub use host::{HostServices, OptionSnapshot, OptionSource, TenantDirectory, TenantRecord};
pub use registry::{KeyFilter, KeyRegistry};
pub use search::{augment_site_search, prime_site_query_defaults, SiteQueryClauses};
pub use sync::{
    ActivationReport, BlogMetaSync, MigrationReport, PendingPopulation, ReadOutcome, SyncOutcome,
};
