//! Overlay stores with per-tenant isolation.
//!
//! The overlay ("blog meta") is a (tenant, key) -> payload store that the
//! sync engine treats as the fast read path for managed options. This module
//! defines the [`OverlayStore`] contract and two backends:
//!
//! - [`InMemoryOverlayStore`]: a process-local map
//! - [`LmdbOverlayStore`]: a persistent LMDB environment keyed by
//!   [`OverlayKey`]
//!
//! The store owns its data. The engine never keeps a payload beyond the call
//! that read or wrote it.

pub mod lmdb_backend;
pub mod memory;
pub mod tenant_key;
pub mod traits;

pub use lmdb_backend::{LmdbOverlayError, LmdbOverlayStore};
pub use memory::InMemoryOverlayStore;
pub use tenant_key::OverlayKey;
pub use traits::{OverlayEntry, OverlayStats, OverlayStore, WriteOutcome};
