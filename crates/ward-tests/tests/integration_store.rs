// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Store Integration Tests
//!
//! Loading documents and the save/reload consistency protocol.
//!
//! ## Test Categories
//!
//! - `test_load_*`: load rules and warnings
//! - `test_sync_*`: the save/reload protocol
//! - `test_roundtrip_*`: save then reload

use std::thread;
use std::time::Duration;

use ward_core::{now_millis, GlobalGroups, GroupRef, PermissionEntry, ScopeData, TableKind};
use ward_store::{LoadWarning, StoreError, SyncOutcome};

use ward_tests::common::fixtures::{
    GlobalFixtures, GroupFixtures, UserFixtures, EXPIRED_AT, FAR_FUTURE,
};
use ward_tests::common::harness::TestHarness;

fn loaded_scope(harness: &TestHarness, scope: &str) -> (ScopeData, GlobalGroups) {
    let source = harness.source();
    let global = GlobalGroups::new();
    source.init_global().unwrap();
    source.reload_global(&global).unwrap();
    source.init_scope(scope, false, false).unwrap();
    let data = ScopeData::new(scope);
    source.reload_groups(&data, &global).unwrap();
    source.reload_users(&data, &global).unwrap();
    (data, global)
}

// =============================================================================
// Load rules
// =============================================================================

#[test]
fn test_load_zero_defaults_is_fatal() {
    let harness = TestHarness::new();
    harness.write_groups("world", GroupFixtures::NO_DEFAULT);

    let err = harness
        .source()
        .load_groups_table("world", &GlobalGroups::new())
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingRequiredSection { .. }));
}

#[test]
fn test_load_missing_groups_section_is_fatal() {
    let harness = TestHarness::new();
    harness.write_groups("world", "something_else: {}\n");

    let err = harness
        .source()
        .load_groups_table("world", &GlobalGroups::new())
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingRequiredSection { .. }));
}

#[test]
fn test_load_two_defaults_warns_and_keeps_first() {
    let harness = TestHarness::new();
    harness.write_groups("world", GroupFixtures::TWO_DEFAULTS);

    let (table, report) = harness
        .source()
        .load_groups_table("world", &GlobalGroups::new())
        .unwrap();
    assert_eq!(table.default_group_name(), Some("First"));
    assert!(report.warnings().contains(&LoadWarning::DuplicateDefault {
        kept: "First".to_string(),
        ignored: "Second".to_string(),
    }));
}

#[test]
fn test_load_dangling_inheritance_is_dropped() {
    let harness = TestHarness::new();
    harness.write_groups("world", GroupFixtures::DANGLING);

    let (table, report) = harness
        .source()
        .load_groups_table("world", &GlobalGroups::new())
        .unwrap();
    assert!(table.get("Default").unwrap().inherits().is_empty());
    assert!(report.warnings().contains(&LoadWarning::DanglingReference {
        referrer: "Default".to_string(),
        reference: GroupRef::local("Ghost"),
    }));
}

#[test]
fn test_load_malformed_document() {
    let harness = TestHarness::new();
    harness.write_groups("world", "groups: [not, a, map]\n");

    let err = harness
        .source()
        .load_groups_table("world", &GlobalGroups::new())
        .unwrap_err();
    assert!(matches!(err, StoreError::MalformedDocument { .. }));
}

#[test]
fn test_load_global_references() {
    let harness = TestHarness::new();
    harness.write_global(GlobalFixtures::STAFF);
    harness.write_groups("world", GroupFixtures::PROMOTION_TREE);
    harness.write_users("world", UserFixtures::PROMOTION_TREE);

    let (data, global) = loaded_scope(&harness, "world");
    assert!(global.contains("staff"));
    let admin = data.get_group("admin").unwrap();
    assert!(admin.inherits().contains(&GroupRef::global("staff")));
}

#[test]
fn test_load_keeps_expired_entries_until_purge() {
    let harness = TestHarness::new();
    harness.write_groups("world", GroupFixtures::TIMED);

    let (data, _global) = loaded_scope(&harness, "world");
    let group = data.get_group("Default").unwrap();
    assert_eq!(group.permissions.len(), 3);
    assert!(group.permissions.contains("fly"));

    let outcome = data.purge_expired_permissions(now_millis());
    assert!(outcome.changed());
    assert!(outcome.groups);

    let group = data.get_group("Default").unwrap();
    assert!(!group.permissions.contains("fly"));
    assert!(group.permissions.contains("walk"));
    assert!(group.permissions.contains("swim"));

    assert!(!data.purge_expired_permissions(now_millis()).changed());
}

// =============================================================================
// Sync protocol
// =============================================================================

#[test]
fn test_sync_unchanged_table_with_newer_file_reloads() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let (data, global) = loaded_scope(&harness, "world");
    assert!(data.get_user("steve").is_none());

    harness.edit_externally(
        &harness.users_path("world"),
        "users:\n  steve:\n    group: Default\n    permissions: [fly]\n",
    );

    let outcome = harness.source().sync_users(&data, &global, false).unwrap();
    assert!(matches!(outcome, SyncOutcome::Reloaded(_)));
    assert!(data.get_user("steve").unwrap().permissions.contains("fly"));
}

#[test]
fn test_sync_changed_table_with_newer_file_conflicts() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let (data, global) = loaded_scope(&harness, "world");

    data.create_user("alex").unwrap();
    data.update_user("alex", |u| u.add_permission(PermissionEntry::parse("mine")))
        .unwrap();

    let external = "users:\n  steve:\n    group: Default\n    permissions: [theirs]\n";
    harness.edit_externally(&harness.users_path("world"), external);

    let err = harness
        .source()
        .sync_users(&data, &global, false)
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(matches!(
        err,
        StoreError::ConcurrentModificationConflict {
            table: TableKind::Users,
            ..
        }
    ));
    assert_eq!(harness.read(&harness.users_path("world")), external);
    assert!(harness.backups().is_empty());

    // the in-memory change is kept for a later forced save
    assert!(data.get_user("alex").is_some());
    assert!(data.users().read().is_changed());
}

#[test]
fn test_sync_overwrite_saves_with_backup() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let (data, global) = loaded_scope(&harness, "world");

    data.create_user("alex").unwrap();
    data.update_user("alex", |u| u.add_permission(PermissionEntry::parse("mine")))
        .unwrap();
    harness.edit_externally(&harness.users_path("world"), "users: {}\n");

    let outcome = harness.source().sync_users(&data, &global, true).unwrap();
    assert_eq!(outcome, SyncOutcome::Saved);
    assert!(harness.read(&harness.users_path("world")).contains("alex"));
    assert_eq!(harness.backups().len(), 1);
    assert!(!data.users().read().is_changed());

    // a second pass has nothing to do
    let outcome = harness.source().sync_users(&data, &global, false).unwrap();
    assert_eq!(outcome, SyncOutcome::Unchanged);
}

#[test]
fn test_sync_failed_reload_keeps_live_state() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let (data, global) = loaded_scope(&harness, "world");

    harness.edit_externally(&harness.groups_path("world"), GroupFixtures::NO_DEFAULT);

    assert!(harness.source().sync_groups(&data, &global, false).is_err());
    assert!(data.get_group("Default").is_some());
    assert_eq!(data.default_group_name().unwrap(), "Default");
}

#[test]
fn test_sync_reload_keeps_edit_made_while_loading() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let (data, global) = loaded_scope(&harness, "world");
    harness.edit_externally(&harness.users_path("world"), "users: {}\n");

    // the reload decides first, then waits on the group table while loading
    let groups = data.groups().write();
    let outcome = thread::scope(|s| {
        let sync = s.spawn(|| harness.source().sync_users(&data, &global, false));
        thread::sleep(Duration::from_millis(200));

        data.create_user("steve").unwrap();
        data.update_user("steve", |u| u.add_permission(PermissionEntry::parse("fly")))
            .unwrap();
        drop(groups);

        sync.join().expect("sync thread panicked")
    });

    match outcome {
        Ok(SyncOutcome::Unchanged) => {}
        Err(err) if err.is_conflict() => {}
        other => panic!("edit was replaced by the reload: {:?}", other),
    }
    assert!(data.get_user("steve").unwrap().permissions.contains("fly"));
    assert!(data.users().read().is_changed());

    // the next pass sees a changed table and a newer file
    let err = harness
        .source()
        .sync_users(&data, &global, false)
        .unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn test_sync_save_blocks_writers_until_written() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let (data, global) = loaded_scope(&harness, "world");
    data.create_user("alex").unwrap();
    data.update_user("alex", |u| u.add_permission(PermissionEntry::parse("mine")))
        .unwrap();

    thread::scope(|s| {
        let sync = s.spawn(|| harness.source().sync_users(&data, &global, false));
        let edit = s.spawn(|| {
            data.create_user("steve").unwrap();
            data.update_user("steve", |u| u.add_permission(PermissionEntry::parse("fly")))
                .unwrap();
        });
        edit.join().expect("edit thread panicked");
        assert_eq!(sync.join().expect("sync thread panicked").unwrap(), SyncOutcome::Saved);
    });

    // whichever ran first, the edit is either on disk or still pending
    let on_disk = harness.read(&harness.users_path("world")).contains("steve");
    assert!(on_disk || data.users().read().is_changed());
    assert!(data.get_user("steve").is_some());
}

// =============================================================================
// Save then reload
// =============================================================================

#[test]
fn test_roundtrip_preserves_effective_permissions() {
    let harness = TestHarness::new();
    harness.write_global(GlobalFixtures::STAFF);
    harness.write_groups("world", GroupFixtures::PROMOTION_TREE);
    harness.write_users("world", UserFixtures::PROMOTION_TREE);

    let (data, global) = loaded_scope(&harness, "world");
    data.create_user("jeb").unwrap();
    data.update_user("jeb", |u| {
        u.set_primary_group(Some(GroupRef::local("Admin")));
        u.add_permission(PermissionEntry::with_expiry("event.join", Some(FAR_FUTURE)));
        u.add_permission(PermissionEntry::with_expiry("event.old", Some(EXPIRED_AT)));
    })
    .unwrap();
    data.update_group("Builder", |g| g.variables.set("prefix", "[Builder]"))
        .unwrap();

    let source = harness.source();
    assert_eq!(source.sync_groups(&data, &global, false).unwrap(), SyncOutcome::Saved);
    assert_eq!(source.sync_users(&data, &global, false).unwrap(), SyncOutcome::Saved);

    let (reloaded, reloaded_global) = loaded_scope(&harness, "world");
    let now = now_millis();
    for user in ["steve", "alex", "notch", "jeb", "stranger"] {
        let before = data.resolve_permissions(user, &global, now).unwrap();
        let after = reloaded
            .resolve_permissions(user, &reloaded_global, now)
            .unwrap();
        assert_eq!(before.texts(), after.texts(), "user {}", user);
        assert_eq!(before.groups(), after.groups(), "user {}", user);
    }
    assert_eq!(
        reloaded.get_group("Builder").unwrap().variables.get_text("prefix"),
        Some("[Builder]".to_string())
    );
}

#[test]
fn test_roundtrip_skips_sparse_users() {
    let harness = TestHarness::new();
    harness.write_groups("world", &GroupFixtures::single("Default", "walk"));
    let (data, global) = loaded_scope(&harness, "world");

    data.create_user("plain").unwrap();
    data.create_user("special").unwrap();
    data.update_user("special", |u| u.add_permission(PermissionEntry::parse("fly")))
        .unwrap();
    harness.source().sync_users(&data, &global, false).unwrap();

    let text = harness.read(&harness.users_path("world"));
    assert!(text.contains("special"));
    assert!(!text.contains("plain"));
}
