//! Property-Based Tests for the Option Sync Engine
//!
//! Drives the full engine through the host fakes:
//! - overlay authority after write-through
//! - one population write per cold read, then hits
//! - idempotent delete and add-only semantics
//! - migration completeness and context restoration
//! - derived key expansion

use std::cell::Cell;

use blogmeta_storage::{ReadInterceptor, ReadOutcome, SyncOutcome, TenantLifecycleObserver, WriteObserver};
use blogmeta_test_utils::assertions::*;
use blogmeta_test_utils::fixtures::*;
use blogmeta_test_utils::generators::*;
use blogmeta_test_utils::*;
use proptest::prelude::*;
use serde_json::json;

fn test_harness() -> Result<TestHarness, TestCaseError> {
    harness().map_err(|e| TestCaseError::fail(format!("Failed to build engine: {}", e)))
}

// ============================================================================
// READ-THROUGH / WRITE-THROUGH PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_write_through_is_read_authority(
        tenant in arb_tenant_id(),
        key in arb_managed_key(),
        value in arb_present_value(),
    ) {
        let h = test_harness()?;
        let outcome = h
            .engine
            .on_updated(tenant, key.as_str(), &value, &OptionValue::Null)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(outcome, SyncOutcome::Applied);

        let consulted = Cell::new(false);
        let read = h
            .engine
            .read_through(tenant, key.as_str(), || {
                consulted.set(true);
                Ok(None)
            })
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert!(!consulted.get(), "host store consulted on an overlay hit");
        prop_assert_eq!(read, Some(value));
    }

    #[test]
    fn prop_cold_read_populates_once(
        tenant in arb_tenant_id(),
        key in arb_managed_key(),
        value in arb_present_value(),
    ) {
        let h = test_harness()?;
        let calls = Cell::new(0u32);
        let fallback = || {
            calls.set(calls.get() + 1);
            Ok(Some(value.clone()))
        };

        let first = h.engine.read_through(tenant, key.as_str(), fallback)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(first.as_ref(), Some(&value));
        prop_assert_eq!(h.overlay.write_count(), 1);

        let second = h.engine.read_through(tenant, key.as_str(), fallback)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(second.as_ref(), Some(&value));
        prop_assert_eq!(calls.get(), 1);
        prop_assert_eq!(h.overlay.write_count(), 1);
    }

    #[test]
    fn prop_empty_values_never_populate(
        tenant in arb_tenant_id(),
        key in arb_managed_key(),
        empty in arb_empty_value(),
    ) {
        let h = test_harness()?;
        for _ in 0..2 {
            let read = h.engine.read_through(tenant, key.as_str(), || Ok(Some(empty.clone())))
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(read.as_ref(), Some(&empty));
        }
        prop_assert_eq!(h.overlay.write_count(), 0);
    }

    #[test]
    fn prop_unmanaged_keys_are_never_touched(
        tenant in arb_tenant_id(),
        key in arb_unmanaged_key(),
        value in arb_present_value(),
    ) {
        let h = test_harness()?;
        let read = h.engine.intercept_read(tenant, &key)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(read, ReadOutcome::Declined);

        let outcomes = [
            h.engine.on_added(tenant, &key, &value),
            h.engine.on_updated(tenant, &key, &value, &OptionValue::Null),
            h.engine.on_deleted(tenant, &key),
        ];
        for outcome in outcomes {
            prop_assert_eq!(outcome, Ok(SyncOutcome::Skipped));
        }
        prop_assert_eq!(h.overlay.write_count(), 0);
    }

    #[test]
    fn prop_delete_is_idempotent(
        tenant in arb_tenant_id(),
        key in arb_managed_key(),
        value in arb_present_value(),
    ) {
        let h = test_harness()?;
        h.engine.on_added(tenant, key.as_str(), &value)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(h.engine.on_deleted(tenant, key.as_str()), Ok(SyncOutcome::Applied));
        let after_one = h.overlay.tenant_keys(tenant);
        prop_assert_eq!(h.engine.on_deleted(tenant, key.as_str()), Ok(SyncOutcome::Unchanged));
        prop_assert_eq!(h.overlay.tenant_keys(tenant), after_one);
    }

    #[test]
    fn prop_add_never_overwrites(
        tenant in arb_tenant_id(),
        key in arb_managed_key(),
        first in arb_present_value(),
        second in arb_present_value(),
    ) {
        let h = test_harness()?;
        prop_assert_eq!(h.engine.on_added(tenant, key.as_str(), &first), Ok(SyncOutcome::Applied));
        prop_assert_eq!(h.engine.on_added(tenant, key.as_str(), &second), Ok(SyncOutcome::Unchanged));
        assert_overlay_value(h.overlay.as_ref(), tenant, key.as_str(), &first);
    }

    #[test]
    fn prop_url_keys_lose_trailing_slashes((stored, expected) in arb_site_url(), tenant in arb_tenant_id()) {
        let h = test_harness()?;
        h.engine.on_added(tenant, "siteurl", &json!(stored))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let read = h.engine.intercept_read(tenant, "siteurl")
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(read, ReadOutcome::Hit(json!(expected)));
    }

    #[test]
    fn prop_expansion_adds_one_key_per_tenant(tenant in arb_secondary_tenant_id()) {
        let h = test_harness()?;
        let before = h.engine.registry().len();

        prop_assert!(h.engine.on_context_switched(tenant));
        prop_assert!(!h.engine.on_context_switched(tenant));
        prop_assert!(!h.engine.on_context_switched(TenantId::PRIMARY));

        prop_assert_eq!(h.engine.registry().len(), before + 1);
        let expected = format!("wp_{}_user_roles", tenant);
        prop_assert!(h.engine.is_managed(&expected));
        prop_assert_eq!(h.engine.registry().derived_keys(), vec![ManagedKey::from(expected)]);
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_url_normalization_only_for_url_keys() {
    let h = harness().unwrap();
    let tenant = TenantId::new(2);
    h.engine.on_added(tenant, "home", &json!("https://example.com/")).unwrap();
    h.engine.on_added(tenant, "blogname", &json!("https://example.com/")).unwrap();

    assert_eq!(
        h.engine.intercept_read(tenant, "home").unwrap(),
        ReadOutcome::Hit(json!("https://example.com"))
    );
    assert_eq!(
        h.engine.intercept_read(tenant, "blogname").unwrap(),
        ReadOutcome::Hit(json!("https://example.com/"))
    );
}

#[test]
fn test_population_is_a_plain_set() {
    let h = harness().unwrap();
    let tenant = TenantId::new(2);
    h.engine
        .read_through(tenant, "blogdescription", || Ok(Some(json!("Just another site"))))
        .unwrap();

    assert_eq!(
        h.overlay.writes(),
        vec![OverlayWrite::Set {
            tenant,
            key: "blogdescription".to_string(),
            payload: "Just another site".to_string(),
            previous: None,
        }]
    );
}

#[test]
fn test_update_passes_old_value_as_hint() {
    let h = harness().unwrap();
    let tenant = TenantId::new(3);
    h.engine.on_added(tenant, "blog_public", &json!(1)).unwrap();
    h.overlay.clear_writes();

    let outcome = h.engine.on_updated(tenant, "blog_public", &json!(0), &json!(1)).unwrap();
    assert_eq!(outcome, SyncOutcome::Applied);
    assert_eq!(
        h.overlay.writes(),
        vec![OverlayWrite::Set {
            tenant,
            key: "blog_public".to_string(),
            payload: "json:0".to_string(),
            previous: Some("json:1".to_string()),
        }]
    );
}

#[test]
fn test_stale_hint_reports_conflict_without_retry() {
    let h = harness().unwrap();
    let tenant = TenantId::new(3);
    h.engine.on_added(tenant, "blogname", &json!("Original")).unwrap();
    h.overlay.clear_writes();

    let outcome = h
        .engine
        .on_updated(tenant, "blogname", &json!("Mine"), &json!("Someone else's"))
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Conflict);
    assert_eq!(h.overlay.write_count(), 1);
    assert_overlay_value(h.overlay.as_ref(), tenant, "blogname", &json!("Original"));
    assert_eq!(h.overlay.stats().unwrap().conflicts, 1);
}

#[test]
fn test_migration_writes_exactly_present_managed_keys() {
    let h = harness().unwrap();
    let tenant = TenantId::new(9);
    let present = [
        ("blogname", json!("Nine")),
        ("siteurl", json!("https://nine.example.com")),
        ("home", json!("https://nine.example.com")),
        ("admin_email", json!("admin@nine.example.com")),
        ("active_plugins", json!(["akismet/akismet.php"])),
    ];
    for (key, value) in &present {
        h.options.set_option(tenant, key, value.clone());
    }
    h.options.set_option(tenant, "blog_public", json!("0"));
    h.options.set_option(tenant, "blogdescription", json!(""));
    h.options.set_option(tenant, "permalink_structure", json!("/%postname%/"));
    h.options.set_option(tenant, "cron", json!({"1700000000": {}}));

    let report = h.engine.migrate(tenant).unwrap();

    assert_eq!(report.tenant, tenant);
    assert_eq!(report.written.len(), 5);
    let stored = h.overlay.tenant_keys(tenant).unwrap();
    assert_eq!(stored.len(), 5);
    for (key, value) in &present {
        assert_overlay_value(h.overlay.as_ref(), tenant, key, value);
    }
    assert_overlay_absent(h.overlay.as_ref(), tenant, "permalink_structure");
    assert_overlay_absent(h.overlay.as_ref(), tenant, "blog_public");
}

#[test]
fn test_migration_overwrites_existing_entries() {
    let h = harness().unwrap();
    let tenant = TenantId::new(4);
    h.engine.on_added(tenant, "blogname", &json!("Stale")).unwrap();
    h.options.set_option(tenant, "blogname", json!("Fresh"));

    h.engine.migrate(tenant).unwrap();
    assert_overlay_value(h.overlay.as_ref(), tenant, "blogname", &json!("Fresh"));
}

#[test]
fn test_migration_includes_tenant_role_key() {
    let h = harness().unwrap();
    let tenant = TenantId::new(12);
    h.options
        .set_option(tenant, "wp_12_user_roles", json!({"editor": {"name": "Editor"}}));

    let report = h.engine.migrate(tenant).unwrap();

    assert_eq!(report.written, vec![ManagedKey::from("wp_12_user_roles")]);
    assert!(h.engine.is_managed("wp_12_user_roles"));
}

#[test]
fn test_migration_restores_context_when_snapshot_fails() {
    let h = harness().unwrap();
    let tenant = TenantId::new(5);
    h.context.switch_to(TenantId::new(3)).unwrap();
    h.options.fail_for(tenant);

    let result = h.engine.migrate(tenant);

    assert_storage_error(&result);
    assert_eq!(h.context.current_tenant(), TenantId::new(3));
    assert_eq!(
        h.context.switches(),
        vec![TenantId::new(3), tenant, TenantId::new(3)]
    );
}

#[test]
fn test_migration_restores_context_after_partial_switch() {
    let h = harness().unwrap();
    let tenant = TenantId::new(6);
    h.context.fail_on(tenant, SwitchFailure::AfterSwitch);

    let result = h.engine.migrate(tenant);

    assert_context_error(&result);
    assert_eq!(h.context.current_tenant(), TenantId::PRIMARY);
    assert!(h.options.loads().is_empty());
    assert_eq!(h.overlay.write_count(), 0);
}

#[test]
fn test_activation_migrates_every_tenant() {
    let h = harness_with(
        InMemoryOverlayStore::new(),
        StaticTenantDirectory::new([1, 2, 3]),
        SyncConfig::default(),
    )
    .unwrap();
    for id in 1..=3 {
        h.options
            .set_option(TenantId::new(id), "blogname", json!(format!("Site {id}")));
    }

    let report = h.engine.activate(false).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.migrated.len(), 3);
    for id in 1..=3 {
        assert_overlay_value(
            h.overlay.as_ref(),
            TenantId::new(id),
            "blogname",
            &json!(format!("Site {id}")),
        );
    }
    assert_eq!(h.context.current_tenant(), TenantId::PRIMARY);
}

#[test]
fn test_activation_continues_past_failed_tenant() {
    let h = harness_with(
        InMemoryOverlayStore::new(),
        StaticTenantDirectory::new([1, 2, 3]),
        SyncConfig::default(),
    )
    .unwrap();
    h.options.set_option(TenantId::new(1), "blogname", json!("One"));
    h.options.set_option(TenantId::new(3), "blogname", json!("Three"));
    h.context.fail_on(TenantId::new(2), SwitchFailure::Refuse);

    let report = h.engine.activate(false).unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.tenant_count(), 3);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, TenantId::new(2));
    assert_overlay_value(h.overlay.as_ref(), TenantId::new(3), "blogname", &json!("Three"));
    assert_eq!(h.context.current_tenant(), TenantId::PRIMARY);
}

#[test]
fn test_network_wide_activation_is_a_no_op() {
    let h = harness_with(
        InMemoryOverlayStore::new(),
        StaticTenantDirectory::unavailable(),
        SyncConfig::default(),
    )
    .unwrap();

    let report = h.engine.activate(true).unwrap();
    assert_eq!(report.tenant_count(), 0);
    assert!(h.context.switches().is_empty());

    assert_storage_error(&h.engine.activate(false));
}

#[test]
fn test_bootstrap_without_overlay_disables_sync() {
    init_test_tracing();
    let engine: Option<TestEngine> = BlogMetaSync::bootstrap(
        None,
        host_services(StaticTenantDirectory::new([1])),
        SyncConfig::default(),
    )
    .unwrap();
    assert!(engine.is_none());
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = SyncConfig {
        static_keys: Vec::new(),
        ..SyncConfig::default()
    };
    let result = harness_with(
        InMemoryOverlayStore::new(),
        StaticTenantDirectory::new([1]),
        config,
    );
    assert!(matches!(result, Err(MetaError::Config(_))));
}

#[test]
fn test_schema_upgrade_is_unconditional() {
    let h = harness().unwrap();
    let tenant = TenantId::new(8);

    h.engine.on_schema_upgrade(tenant, &json!(57155)).unwrap();
    h.engine.on_schema_upgrade(tenant, &json!(58975)).unwrap();

    assert!(!h.engine.is_managed("wp_db_version"));
    assert_overlay_value(h.overlay.as_ref(), tenant, "wp_db_version", &json!(58975));
}

#[test]
fn test_tenant_listing_expands_keys_and_returns_list() {
    let h = harness().unwrap();
    let sites = network(4);

    let listed = h.engine.on_tenants_listed(sites.clone());

    assert_eq!(listed, sites);
    let derived: Vec<String> = h
        .engine
        .registry()
        .derived_keys()
        .into_iter()
        .map(ManagedKey::into_inner)
        .collect();
    assert_eq!(derived, vec!["wp_2_user_roles", "wp_3_user_roles", "wp_4_user_roles"]);
}

#[test]
fn test_expanded_key_is_read_through() {
    let h = harness().unwrap();
    let tenant = TenantId::new(7);
    let roles = json!({"administrator": {"name": "Administrator"}});

    assert_eq!(
        h.engine.intercept_read(tenant, "wp_7_user_roles").unwrap(),
        ReadOutcome::Declined
    );
    h.engine.on_context_switched(tenant);

    let read = h
        .engine
        .read_through(tenant, "wp_7_user_roles", || Ok(Some(roles.clone())))
        .unwrap();
    assert_eq!(read, Some(roles.clone()));
    assert_overlay_value(h.overlay.as_ref(), tenant, "wp_7_user_roles", &roles);
}

#[test]
fn test_hooks_dispatch_to_engine() {
    let h = harness().unwrap();
    let tenant = TenantId::new(2);
    let reads: &dyn ReadInterceptor = &h.engine;
    let writes: &dyn WriteObserver = &h.engine;
    let lifecycle: &dyn TenantLifecycleObserver = &h.engine;

    let ReadOutcome::Miss(pending) = reads.before_read(tenant, "template").unwrap() else {
        panic!("expected a miss on a cold overlay");
    };
    assert!(reads.after_read(pending, &json!("twentytwentyfour")).unwrap());
    assert!(reads.before_read(tenant, "template").unwrap().served_from_overlay());

    assert_eq!(
        writes
            .updated(tenant, "template", &json!("twentytwentyfour"), &json!("astra"))
            .unwrap(),
        SyncOutcome::Applied
    );
    assert_eq!(writes.deleted(tenant, "template").unwrap(), SyncOutcome::Applied);
    assert_eq!(
        writes.added(tenant, "template", &json!("astra")).unwrap(),
        SyncOutcome::Applied
    );
    writes.schema_upgraded(tenant, &json!(57155)).unwrap();

    let listing = vec![TenantId::new(5), TenantId::new(6)];
    assert_eq!(lifecycle.tenants_listed(listing.clone()), listing);
    lifecycle.context_switched(TenantId::new(7));
    assert_eq!(h.engine.registry().derived_keys().len(), 3);

    h.options.set_option(TenantId::new(10), "blogname", json!("Ten"));
    let report = lifecycle.tenant_created(TenantId::new(10)).unwrap();
    assert_eq!(report.written, vec![ManagedKey::from("blogname")]);
}

#[test]
fn test_listing_hook_passes_site_records_through() {
    let h = harness().unwrap();
    let listing: &dyn TenantLifecycleObserver<Site> = &h.engine;
    let sites = network(3);

    let returned = listing.tenants_listed(sites.clone());

    assert_eq!(returned, sites);
    assert!(h.engine.is_managed("wp_2_user_roles"));
    assert!(h.engine.is_managed("wp_3_user_roles"));
}

#[test]
fn test_host_written_payloads_keep_their_type() {
    let h = harness().unwrap();
    let tenant = TenantId::new(2);
    h.overlay.set(tenant, "blog_public", "1", None).unwrap();
    h.overlay.set(tenant, "blogname", "null", None).unwrap();

    assert_eq!(
        h.engine.intercept_read(tenant, "blog_public").unwrap(),
        ReadOutcome::Hit(json!("1"))
    );
    assert_eq!(
        h.engine.intercept_read(tenant, "blogname").unwrap(),
        ReadOutcome::Hit(json!("null"))
    );

    let outcome = h
        .engine
        .on_updated(tenant, "blog_public", &json!("0"), &json!("1"))
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Applied);
    assert_eq!(
        h.engine.intercept_read(tenant, "blog_public").unwrap(),
        ReadOutcome::Hit(json!("0"))
    );
}

#[test]
fn test_key_filter_extends_static_keys() {
    let filter = |mut keys: Vec<ManagedKey>| {
        keys.push(ManagedKey::from("permalink_structure"));
        keys
    };
    let engine: TestEngine = BlogMetaSync::with_key_filter(
        std::sync::Arc::new(RecordingOverlayStore::new(InMemoryOverlayStore::new())),
        host_services(StaticTenantDirectory::new([1])),
        SyncConfig::default(),
        &filter,
    )
    .unwrap();

    assert!(engine.is_managed("permalink_structure"));
    assert!(engine.is_managed("blogname"));
}
