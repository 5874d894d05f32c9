//! Blog Meta Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - In-memory host fakes (option source, tenant directory, tenant context)
//! - A recording overlay wrapper that counts writes
//! - Proptest generators for tenants, keys and option values
//! - Fixtures that assemble a ready engine
//! - Custom assertions for blog meta results

pub use blogmeta_core::{
    ConfigError, ContextError, ManagedKey, MetaError, MetaResult, OptionValue, StorageError,
    SyncConfig, TenantId,
};
pub use blogmeta_storage::{
    BlogMetaSync, HostServices, InMemoryOverlayStore, OptionSnapshot, OptionSource,
    OverlayStats, OverlayStore, TenantContext, TenantDirectory, TenantRecord, WriteOutcome,
};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Once};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// HOST FAKES
// ============================================================================

/// Option source backed by per-tenant snapshots.
#[derive(Debug, Default)]
pub struct InMemoryOptionSource {
    snapshots: Mutex<HashMap<TenantId, OptionSnapshot>>,
    failing: Mutex<HashSet<TenantId>>,
    loads: Mutex<Vec<TenantId>>,
}

impl InMemoryOptionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one option of a tenant's snapshot.
    pub fn set_option(&self, tenant: TenantId, key: &str, value: OptionValue) {
        lock(&self.snapshots)
            .entry(tenant)
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Make `load_all` fail for a tenant.
    pub fn fail_for(&self, tenant: TenantId) {
        lock(&self.failing).insert(tenant);
    }

    /// Tenants whose snapshots were loaded, in call order.
    pub fn loads(&self) -> Vec<TenantId> {
        lock(&self.loads).clone()
    }
}

impl OptionSource for InMemoryOptionSource {
    fn load_all(&self, tenant: TenantId) -> MetaResult<OptionSnapshot> {
        lock(&self.loads).push(tenant);
        if lock(&self.failing).contains(&tenant) {
            return Err(MetaError::Storage(StorageError::SnapshotFailed {
                tenant,
                reason: "options table unavailable".to_string(),
            }));
        }
        Ok(lock(&self.snapshots).get(&tenant).cloned().unwrap_or_default())
    }
}

/// Tenant directory with a fixed listing.
#[derive(Debug, Default)]
pub struct StaticTenantDirectory {
    tenants: Vec<TenantId>,
    unavailable: bool,
}

impl StaticTenantDirectory {
    pub fn new(tenants: impl IntoIterator<Item = u64>) -> Self {
        Self {
            tenants: tenants.into_iter().map(TenantId::new).collect(),
            unavailable: false,
        }
    }

    /// A directory whose listing always fails.
    pub fn unavailable() -> Self {
        Self {
            tenants: Vec::new(),
            unavailable: true,
        }
    }
}

impl TenantDirectory for StaticTenantDirectory {
    fn list_tenant_ids(&self) -> MetaResult<Vec<TenantId>> {
        if self.unavailable {
            return Err(MetaError::Storage(StorageError::ListingFailed {
                reason: "blogs table unavailable".to_string(),
            }));
        }
        Ok(self.tenants.clone())
    }
}

/// How [`SwitchableContext`] fails a switch into a given tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchFailure {
    /// Refuse before changing anything.
    Refuse,
    /// Change the current tenant, then report an error.
    AfterSwitch,
}

/// Tenant context that records every switch.
#[derive(Debug)]
pub struct SwitchableContext {
    current: Mutex<TenantId>,
    switches: Mutex<Vec<TenantId>>,
    failures: Mutex<HashMap<TenantId, SwitchFailure>>,
}

impl SwitchableContext {
    pub fn new(current: TenantId) -> Self {
        Self {
            current: Mutex::new(current),
            switches: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail_on(&self, tenant: TenantId, failure: SwitchFailure) {
        lock(&self.failures).insert(tenant, failure);
    }

    /// Every successful or partial switch, in order.
    pub fn switches(&self) -> Vec<TenantId> {
        lock(&self.switches).clone()
    }
}

impl Default for SwitchableContext {
    fn default() -> Self {
        Self::new(TenantId::PRIMARY)
    }
}

impl TenantContext for SwitchableContext {
    fn current_tenant(&self) -> TenantId {
        *lock(&self.current)
    }

    fn switch_to(&self, tenant: TenantId) -> MetaResult<()> {
        let failure = lock(&self.failures).get(&tenant).copied();
        if failure == Some(SwitchFailure::Refuse) {
            return Err(MetaError::Context(ContextError::UnknownTenant { tenant }));
        }

        *lock(&self.current) = tenant;
        lock(&self.switches).push(tenant);

        if failure == Some(SwitchFailure::AfterSwitch) {
            return Err(MetaError::Context(ContextError::SwitchFailed {
                tenant,
                reason: "tenant tables missing".to_string(),
            }));
        }
        Ok(())
    }
}

/// A site row as a tenant listing returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub blog_id: TenantId,
    pub domain: String,
    pub path: String,
}

impl Site {
    pub fn new(blog_id: u64, domain: &str) -> Self {
        Self {
            blog_id: TenantId::new(blog_id),
            domain: domain.to_string(),
            path: "/".to_string(),
        }
    }
}

impl TenantRecord for Site {
    fn tenant_id(&self) -> TenantId {
        self.blog_id
    }
}

// ============================================================================
// RECORDING OVERLAY
// ============================================================================

/// A mutating call made against the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayWrite {
    Set {
        tenant: TenantId,
        key: String,
        payload: String,
        previous: Option<String>,
    },
    Add {
        tenant: TenantId,
        key: String,
        payload: String,
    },
    Delete {
        tenant: TenantId,
        key: String,
    },
}

/// Wraps an overlay store and records every mutating call.
#[derive(Debug)]
pub struct RecordingOverlayStore<O> {
    inner: O,
    writes: Mutex<Vec<OverlayWrite>>,
}

impl<O: OverlayStore> RecordingOverlayStore<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn writes(&self) -> Vec<OverlayWrite> {
        lock(&self.writes).clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.writes).len()
    }

    pub fn clear_writes(&self) {
        lock(&self.writes).clear();
    }
}

impl<O: OverlayStore> OverlayStore for RecordingOverlayStore<O> {
    fn get(&self, tenant: TenantId, key: &str) -> MetaResult<Option<String>> {
        self.inner.get(tenant, key)
    }

    fn set(
        &self,
        tenant: TenantId,
        key: &str,
        payload: &str,
        previous: Option<&str>,
    ) -> MetaResult<WriteOutcome> {
        lock(&self.writes).push(OverlayWrite::Set {
            tenant,
            key: key.to_string(),
            payload: payload.to_string(),
            previous: previous.map(str::to_string),
        });
        self.inner.set(tenant, key, payload, previous)
    }

    fn add(&self, tenant: TenantId, key: &str, payload: &str) -> MetaResult<bool> {
        lock(&self.writes).push(OverlayWrite::Add {
            tenant,
            key: key.to_string(),
            payload: payload.to_string(),
        });
        self.inner.add(tenant, key, payload)
    }

    fn delete(&self, tenant: TenantId, key: &str) -> MetaResult<bool> {
        lock(&self.writes).push(OverlayWrite::Delete {
            tenant,
            key: key.to_string(),
        });
        self.inner.delete(tenant, key)
    }

    fn tenant_keys(&self, tenant: TenantId) -> MetaResult<Vec<ManagedKey>> {
        self.inner.tenant_keys(tenant)
    }

    fn stats(&self) -> MetaResult<OverlayStats> {
        self.inner.stats()
    }
}

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a test subscriber once per process. Honors `RUST_LOG`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for blog meta types.

    use super::*;
    use proptest::prelude::*;

    /// Any tenant, primary included.
    pub fn arb_tenant_id() -> impl Strategy<Value = TenantId> {
        (1u64..10_000).prop_map(TenantId::new)
    }

    /// Any tenant other than the primary one.
    pub fn arb_secondary_tenant_id() -> impl Strategy<Value = TenantId> {
        (2u64..10_000).prop_map(TenantId::new)
    }

    /// One of the default static keys.
    pub fn arb_managed_key() -> impl Strategy<Value = ManagedKey> {
        prop::sample::select(blogmeta_core::DEFAULT_STATIC_KEYS).prop_map(ManagedKey::from)
    }

    /// An option name that is never managed by default.
    pub fn arb_unmanaged_key() -> impl Strategy<Value = String> {
        "[a-z]{3,12}_custom"
    }

    /// A value the host would consider non-empty.
    pub fn arb_present_value() -> impl Strategy<Value = OptionValue> {
        prop_oneof![
            "[A-Za-z][A-Za-z0-9 ]{0,24}".prop_map(OptionValue::String),
            (1i64..1_000_000).prop_map(OptionValue::from),
            Just(OptionValue::Bool(true)),
            prop::collection::vec("[a-z]{1,8}/[a-z]{1,8}\\.php", 1..4)
                .prop_map(OptionValue::from),
        ]
    }

    /// A value the host treats as empty.
    pub fn arb_empty_value() -> impl Strategy<Value = OptionValue> {
        prop_oneof![
            Just(OptionValue::Null),
            Just(OptionValue::Bool(false)),
            Just(OptionValue::from(0)),
            Just(OptionValue::String(String::new())),
            Just(OptionValue::String("0".to_string())),
            Just(OptionValue::Array(Vec::new())),
        ]
    }

    /// A site URL, optionally with trailing slashes.
    pub fn arb_site_url() -> impl Strategy<Value = (String, String)> {
        ("[a-z]{3,10}", 0usize..3).prop_map(|(host, slashes)| {
            let base = format!("https://{host}.example.com");
            let stored = format!("{base}{}", "/".repeat(slashes));
            (stored, base)
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-assembled engines over the host fakes.

    use super::*;

    /// Engine type used throughout the workspace tests.
    pub type TestEngine<O = InMemoryOverlayStore> = BlogMetaSync<
        RecordingOverlayStore<O>,
        InMemoryOptionSource,
        StaticTenantDirectory,
        SwitchableContext,
    >;

    /// An engine plus handles to every fake behind it.
    pub struct TestHarness<O: OverlayStore = InMemoryOverlayStore> {
        pub engine: TestEngine<O>,
        pub overlay: Arc<RecordingOverlayStore<O>>,
        pub options: Arc<InMemoryOptionSource>,
        pub directory: Arc<StaticTenantDirectory>,
        pub context: Arc<SwitchableContext>,
    }

    /// Host services over fresh fakes.
    pub fn host_services(
        directory: StaticTenantDirectory,
    ) -> HostServices<InMemoryOptionSource, StaticTenantDirectory, SwitchableContext> {
        HostServices::new(
            Arc::new(InMemoryOptionSource::new()),
            Arc::new(directory),
            Arc::new(SwitchableContext::default()),
        )
    }

    /// Default configuration over an in-memory overlay.
    pub fn harness() -> MetaResult<TestHarness> {
        harness_with(
            InMemoryOverlayStore::new(),
            StaticTenantDirectory::new([1]),
            SyncConfig::default(),
        )
    }

    /// A harness over any overlay backend.
    pub fn harness_with<O: OverlayStore>(
        overlay: O,
        directory: StaticTenantDirectory,
        config: SyncConfig,
    ) -> MetaResult<TestHarness<O>> {
        init_test_tracing();
        let host = host_services(directory);
        let overlay = Arc::new(RecordingOverlayStore::new(overlay));
        let engine = BlogMetaSync::new(Arc::clone(&overlay), host.clone(), config)?;
        Ok(TestHarness {
            engine,
            overlay,
            options: host.options,
            directory: host.directory,
            context: host.context,
        })
    }

    /// A network of sites `1..=count` as a listing returns them.
    pub fn network(count: u64) -> Vec<Site> {
        (1..=count)
            .map(|id| Site::new(id, &format!("site{id}.example.com")))
            .collect()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for blog meta results.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &MetaResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &MetaResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &MetaResult<T>) {
        match result {
            Err(MetaError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_context_error<T: std::fmt::Debug>(result: &MetaResult<T>) {
        match result {
            Err(MetaError::Context(_)) => {}
            other => panic!("Expected Context error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &MetaResult<T>) {
        match result {
            Err(MetaError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert the decoded overlay value stored for (tenant, key).
    #[track_caller]
    pub fn assert_overlay_value<O: OverlayStore>(
        overlay: &O,
        tenant: TenantId,
        key: &str,
        expected: &OptionValue,
    ) {
        let stored = overlay
            .get(tenant, key)
            .unwrap_or_else(|e| panic!("Overlay read for {key} failed: {e}"));
        match stored {
            Some(payload) => assert_eq!(
                &blogmeta_core::decode_payload(&payload),
                expected,
                "Wrong overlay value for tenant {tenant} key {key}"
            ),
            None => panic!("No overlay entry for tenant {tenant} key {key}"),
        }
    }

    #[track_caller]
    pub fn assert_overlay_absent<O: OverlayStore>(overlay: &O, tenant: TenantId, key: &str) {
        let stored = overlay
            .get(tenant, key)
            .unwrap_or_else(|e| panic!("Overlay read for {key} failed: {e}"));
        assert!(
            stored.is_none(),
            "Expected no overlay entry for tenant {tenant} key {key}, found {:?}",
            stored
        );
    }
}
