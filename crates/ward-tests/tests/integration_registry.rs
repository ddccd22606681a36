// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Registry Integration Tests
//!
//! Scope lookups, mirrors and the maintenance passes.
//!
//! ## Test Categories
//!
//! - `test_mirror_*`: shared tables between scopes
//! - `test_lookup_*`: fallback chain and client lookups
//! - `test_purge_*` / `test_save_*` / `test_reload_*`: maintenance passes

use ward_config::{load_config_str, ConfigFormat, MirrorEntry};
use ward_core::{PermissionEntry, TableKind};
use ward_registry::{RegistryError, ScopeRegistryBuilder};
use ward_store::StoreError;

use ward_tests::common::fixtures::GroupFixtures;
use ward_tests::common::harness::TestHarness;

fn mirror(source: &str, target: &str, groups: bool, users: bool) -> MirrorEntry {
    MirrorEntry {
        source: source.to_string(),
        target: target.to_string(),
        groups,
        users,
    }
}

// =============================================================================
// Mirrors
// =============================================================================

#[test]
fn test_mirror_full_shares_the_same_table() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let registry = harness
        .registry()
        .mirrors(vec![mirror("world", "world_nether", true, true)])
        .build()
        .unwrap();
    registry.reset().unwrap();

    let world = registry.scope("world").unwrap();
    world
        .update_group("Default", |g| g.add_permission(PermissionEntry::parse("fly")))
        .unwrap();

    let nether = registry.resolve_scope("world_nether").unwrap();
    assert!(nether.shares_groups_with(&world));
    assert!(nether.get_group("Default").unwrap().permissions.contains("fly"));
    assert!(registry
        .resolve_permissions("World_Nether", "steve")
        .unwrap()
        .has("fly"));

    assert!(!registry.has_own_data("world_nether"));
    assert!(registry.is_in_list("world_nether"));
    assert!(!harness.scopes_path().join("world_nether").join("users.yml").exists());
}

#[test]
fn test_mirror_partial_initializes_own_half() {
    let harness = TestHarness::new();
    let registry = harness
        .registry()
        .mirrors(vec![mirror("world", "creative", true, false)])
        .build()
        .unwrap();
    registry.reset().unwrap();

    assert!(registry.has_groups_mirror("creative"));
    assert!(!registry.has_users_mirror("creative"));
    assert!(registry.has_own_data("creative"));
    assert!(harness.users_path("creative").exists());
    assert!(!harness.groups_path("creative").exists());

    let world = registry.scope("world").unwrap();
    let creative = registry.scope("creative").unwrap();
    assert!(creative.shares_groups_with(&world));
    assert!(!creative.shares_users_with(&world));

    creative.create_user("steve").unwrap();
    assert!(world.get_user("steve").is_none());
}

#[test]
fn test_mirror_of_default_scope_is_rejected() {
    let harness = TestHarness::new();
    let registry = harness
        .registry()
        .mirrors(vec![mirror("lobby", "world", true, true)])
        .build()
        .unwrap();
    registry.reset().unwrap();

    assert!(registry.has_own_data("world"));
    assert!(!registry.is_in_list("lobby"));
    assert!(!registry.has_groups_mirror("world"));
}

#[test]
fn test_mirror_from_config() {
    let harness = TestHarness::new();
    let yaml = format!(
        "data:\n  root: {}\nmirrors:\n  world:\n    - world_nether\n  survival:\n    hardcore: [groups, users]\n    creative: [groups]\n",
        harness.root().display()
    );
    let config = load_config_str(&yaml, ConfigFormat::Yaml).unwrap();
    let registry = ScopeRegistryBuilder::from_config(&config)
        .unwrap()
        .build()
        .unwrap();
    registry.reset().unwrap();

    let mut names = registry.scope_names();
    names.sort();
    assert_eq!(
        names,
        vec!["creative", "hardcore", "survival", "world", "world_nether"]
    );

    // full mirrors are represented by their source
    let list: Vec<String> = registry
        .all_scopes_data_list()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(list, vec!["creative", "survival", "world"]);
}

// =============================================================================
// Lookups
// =============================================================================

#[test]
fn test_lookup_falls_back_to_default() {
    let harness = TestHarness::new();
    let registry = harness.loaded_registry();
    assert_eq!(registry.resolve_scope("nowhere").unwrap().name(), "world");
    assert!(registry.scope("nowhere").is_none());
}

#[test]
fn test_lookup_prefers_catch_all() {
    let harness = TestHarness::with_active_scopes(["arena"]);
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let registry = harness
        .registry()
        .mirrors(vec![mirror("world", "all_unnamed_scopes", true, false)])
        .build()
        .unwrap();
    registry.reset().unwrap();

    let catch_all = registry.resolve_scope("nowhere").unwrap();
    assert_eq!(catch_all.name(), "all_unnamed_scopes");

    // host scopes inherit the catch-all scope's mirrors
    let world = registry.scope("world").unwrap();
    let arena = registry.scope("arena").unwrap();
    assert!(arena.shares_groups_with(&world));
    assert!(!arena.shares_users_with(&world));
    assert!(!harness.groups_path("arena").exists());

    let names: Vec<String> = registry
        .all_scopes_data_list()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert!(!names.contains(&"all_unnamed_scopes".to_string()));
}

#[test]
fn test_lookup_by_client() {
    let harness = TestHarness::new();
    harness.write_groups("nether", &GroupFixtures::single("Demon", "burn"));
    let registry = harness.loaded_registry();

    harness.host().connect("steve", "Steve", "nether");
    harness.host().connect("stefan", "Stefan", "world");
    harness.host().connect("alex", "Alex", "world");

    assert_eq!(
        registry.resolve_scope_for_client("STEVE").unwrap().name(),
        "nether"
    );
    assert!(registry.resolve_scope_for_client("offline").is_none());
    assert_eq!(
        registry.resolve_scope_by_client_name("al").unwrap().name(),
        "world"
    );
    // "ste" matches both Steve and Stefan
    assert!(registry.resolve_scope_by_client_name("ste").is_none());
}

// =============================================================================
// Maintenance
// =============================================================================

#[test]
fn test_purge_notifies_affected_users_only() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    harness.write_users(
        "world",
        "users:\n  steve:\n    group: Default\n    permissions: ['vip|1', home]\n  alex:\n    group: Default\n    permissions: [home]\n",
    );
    let registry = harness
        .registry()
        .mirrors(vec![mirror("world", "nether", true, true)])
        .build()
        .unwrap();
    registry.reset().unwrap();

    harness.host().connect("steve", "Steve", "world");
    harness.host().connect("alex", "Alex", "nether");

    assert!(registry.purge_expired_permissions());
    assert_eq!(harness.notifier().users(), vec!["steve"]);
    let steve = registry.scope("world").unwrap().get_user("steve").unwrap();
    assert!(!steve.permissions.contains("vip"));

    harness.notifier().clear();
    assert!(!registry.purge_expired_permissions());
    assert_eq!(harness.notifier().count(), 0);
}

#[test]
fn test_save_conflict_does_not_block_other_scopes() {
    let harness = TestHarness::new();
    harness.write_groups("arena", &GroupFixtures::single("Fighter", "pvp"));
    let registry = harness.loaded_registry();

    for scope in ["world", "arena"] {
        let data = registry.scope(scope).unwrap();
        data.create_user("steve").unwrap();
        data.update_user("steve", |u| u.add_permission(PermissionEntry::parse("home")))
            .unwrap();
    }
    harness.edit_externally(&harness.users_path("arena"), "users: {}\n");

    let report = registry.save_changes(false);
    assert!(!report.is_success());
    assert_eq!(report.conflicts().count(), 1);
    assert!(report.get("arena", TableKind::Users).unwrap().result.is_err());
    assert!(report.get("world", TableKind::Users).unwrap().changed());

    assert!(harness.read(&harness.users_path("world")).contains("steve"));
    assert_eq!(harness.read(&harness.users_path("arena")), "users: {}\n");
    assert!(report.into_result().unwrap_err().is_conflict());

    // forcing the pass writes the remaining table
    let report = registry.save_changes(true);
    assert!(report.is_success());
    assert!(harness.read(&harness.users_path("arena")).contains("steve"));
}

#[test]
fn test_save_reloads_newer_file_and_notifies() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let registry = harness.loaded_registry();
    harness.host().connect("steve", "Steve", "world");

    harness.edit_externally(
        &harness.users_path("world"),
        "users:\n  steve:\n    group: Default\n    permissions: [fly]\n",
    );

    let report = registry.save_changes(false);
    assert!(report.is_success());
    assert!(report.get("world", TableKind::Users).unwrap().reloaded());
    assert!(registry.resolve_permissions("world", "steve").unwrap().has("fly"));
    assert!(harness.notifier().was_notified("steve"));
}

#[test]
fn test_reload_all_and_loaded_flag() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let registry = harness.loaded_registry();
    assert!(registry.is_loaded());

    harness.write_groups("world", &GroupFixtures::single("Default", "run"));
    let reports = registry.reload_all().unwrap();
    // global groups, world groups, world users
    assert_eq!(reports.len(), 3);
    assert!(registry.is_loaded());
    assert!(registry.resolve_permissions("world", "anyone").unwrap().has("run"));
}

#[test]
fn test_reload_failure_keeps_live_state() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let registry = harness.loaded_registry();

    harness.write_groups("world", GroupFixtures::NO_DEFAULT);
    assert!(registry.reload_scope("world").is_err());
    assert!(registry.is_loaded());
    assert!(registry.resolve_permissions("world", "anyone").unwrap().has("walk"));
}

#[test]
fn test_reload_duplicate_user_keeps_live_users() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    harness.write_users(
        "world",
        "users:\n  steve:\n    group: Default\n    permissions: [fly]\n",
    );
    let registry = harness.loaded_registry();

    harness.write_users(
        "world",
        "users:\n  Steve:\n    permissions: [a]\n  steve:\n    permissions: [b]\n",
    );
    let err = registry.reload_scope("world").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Store(StoreError::DuplicateEntity { .. })
    ));

    assert!(registry.is_loaded());
    assert!(registry.resolve_permissions("world", "steve").unwrap().has("fly"));
    assert!(!registry.scope("world").unwrap().users().read().is_changed());
}

#[test]
fn test_reset_skips_broken_scope_folders() {
    let harness = TestHarness::new();
    harness.write_groups("broken", GroupFixtures::NO_DEFAULT);
    harness.write_groups("fine", &GroupFixtures::single("Default", "walk"));
    let registry = harness.loaded_registry();

    assert!(registry.scope("fine").is_some());
    assert!(registry.scope("broken").is_none());
    assert_eq!(registry.resolve_scope("broken").unwrap().name(), "world");
}
