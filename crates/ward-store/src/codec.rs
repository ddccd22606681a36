// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Group and user document codec.
//!
//! # Groups document
//!
//! ```yaml
//! groups:
//!   Guest:
//!     default: true
//!     info: {prefix: '', suffix: '', build: false}
//!     inheritance: [g:base]
//!     permissions: [chat, -build|1767225600000]
//! ```
//!
//! Loading takes two passes. The first creates every group, collecting
//! inheritance names in a pending map; the second resolves them once all
//! groups exist, so a group may inherit one declared further down.
//!
//! # Users document
//!
//! ```yaml
//! users:
//!   steve:
//!     lastname: Steve
//!     group: Builder
//!     subgroups: [Mod|1767225600000]
//!     permissions: [home.set]
//! ```
//!
//! Decoding never touches live state: each function returns a freshly
//! built table that the caller swaps in.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;
use ward_core::permission::join_timed;
use ward_core::{
    split_timed, GroupRef, GroupTable, PermissionEntry, PermissionSet, SubGroup, TimedEntryError,
    User, UserTable, GLOBAL_SCOPE,
};

use crate::document::{
    is_true, key_text, mapping_field, merge_variables, node_value, parse_root, string_list,
    variables_mapping,
};
use crate::error::{LoadReport, LoadWarning, StoreError, StoreResult};

/// Root key of group documents.
pub const GROUPS_KEY: &str = "groups";

/// Root key of user documents.
pub const USERS_KEY: &str = "users";

/// Comment block written at the top of every groups document.
pub const GROUPS_HEADER: &str = "\
# Group inheritance
#
# Any inherited groups prefixed with a g: are global groups
# and are inherited from the GlobalGroups.yml.
#
# Groups without the g: prefix are groups local to this scope
# and are defined in this groups.yml file.
#
# Local group inheritances define your promotion tree.
";

// =============================================================================
// Shared helpers
// =============================================================================

/// Reads a `permissions` field into `set`, warning on malformed entries.
fn read_permissions(
    node: &Mapping,
    path: &Path,
    owner: &str,
    set: &mut PermissionSet,
    report: &mut LoadReport,
) -> StoreResult<()> {
    let Some(value) = node_value(node.get("permissions"), path, "permissions")? else {
        return Ok(());
    };
    for raw in value.into_items() {
        match PermissionEntry::parse_timed(&raw) {
            Ok(entry) => {
                set.add(entry);
            }
            Err(TimedEntryError::Empty) => {}
            Err(TimedEntryError::InvalidExpiry { .. }) => {
                report.warn(LoadWarning::MalformedTimedEntry {
                    owner: owner.to_string(),
                    entry: raw,
                });
            }
        }
    }
    Ok(())
}

/// Returns the `groups` mapping of a groups document.
fn groups_section<'a>(root: &'a Mapping, path: &Path) -> StoreResult<Option<&'a Mapping>> {
    let section = root
        .get(GROUPS_KEY)
        .ok_or_else(|| StoreError::missing_section(path, "groups"))?;
    mapping_field(Some(section), path, GROUPS_KEY)
}

/// Returns an entity's mapping. A null entity reads as empty.
fn entity_node<'a>(value: &'a Value, path: &Path, name: &str) -> StoreResult<Option<&'a Mapping>> {
    mapping_field(Some(value), path, name)
}

fn permission_documents(set: &PermissionSet) -> Value {
    string_list(set.iter().map(PermissionEntry::to_document))
}

fn serialize(what: &str, root: Mapping) -> StoreResult<String> {
    serde_yaml::to_string(&Value::Mapping(root))
        .map_err(|e| StoreError::serialization(what, e.to_string()))
}

// =============================================================================
// Groups
// =============================================================================

/// Decodes a scope's groups document.
///
/// `global` is used to check `g:` references.
///
/// # Errors
///
/// [`StoreError::MissingRequiredSection`] if there is no `groups` section or
/// no default group, [`StoreError::MalformedDocument`] on a wrong shape and
/// [`StoreError::DuplicateEntity`] if two names collide ignoring case.
pub fn decode_groups(
    text: &str,
    path: &Path,
    scope: &str,
    global: &GroupTable,
) -> StoreResult<(GroupTable, LoadReport)> {
    let root = parse_root(text, path)?;
    let mut report = LoadReport::new(path);
    let mut table = GroupTable::new(scope);
    let mut pending: Vec<(String, Vec<String>)> = Vec::new();

    if let Some(groups) = groups_section(&root, path)? {
        for (key, value) in groups {
            let name = key_text(key, path)?;
            let node = entity_node(value, path, &name)?;
            let empty = Mapping::new();
            let node = node.unwrap_or(&empty);

            table
                .create_group(&name)
                .map_err(|e| StoreError::duplicate(path, e))?;

            if is_true(node.get("default")) {
                match table.default_group_name() {
                    None => table.set_default_group(&name)?,
                    Some(kept) => {
                        let kept = kept.to_string();
                        report.warn(LoadWarning::DuplicateDefault {
                            kept,
                            ignored: name.clone(),
                        });
                    }
                }
            }

            let Some(group) = table.group_mut(&name) else {
                continue;
            };

            read_permissions(node, path, &name, &mut group.permissions, &mut report)?;

            match mapping_field(node.get("info"), path, "info")? {
                Some(info) => merge_variables(&mut group.variables, info),
                None => report.warn(LoadWarning::MissingInfo {
                    group: name.clone(),
                }),
            }

            if let Some(inherits) = node_value(node.get("inheritance"), path, "inheritance")? {
                pending.push((name, inherits.into_items()));
            }
        }
    }

    if table.default_group_name().is_none() {
        return Err(StoreError::missing_section(path, "default group"));
    }

    // Second pass: every group exists now.
    for (name, inherits) in pending {
        let mut resolved = Vec::with_capacity(inherits.len());
        for text in inherits {
            let reference = GroupRef::parse(&text);
            let exists = match &reference {
                GroupRef::Global(n) => global.contains(n),
                GroupRef::Local(n) => table.contains(n) || global.contains(n),
            };
            if exists {
                resolved.push(reference);
            } else {
                report.warn(LoadWarning::DanglingReference {
                    referrer: name.clone(),
                    reference,
                });
            }
        }
        if let Some(group) = table.group_mut(&name) {
            for reference in resolved {
                group.add_inherits(reference);
            }
        }
    }

    debug!(
        scope = %scope,
        groups = table.len(),
        warnings = report.warnings().len(),
        "Decoded groups document"
    );
    Ok((table, report))
}

/// Decodes the global groups document.
///
/// Keys may carry the `g:` prefix. Inheritance only names global groups.
/// No default group is required and `default` flags are ignored.
pub fn decode_global_groups(text: &str, path: &Path) -> StoreResult<(GroupTable, LoadReport)> {
    let root = parse_root(text, path)?;
    let mut report = LoadReport::new(path);
    let mut table = GroupTable::new(GLOBAL_SCOPE);
    let mut pending: Vec<(String, Vec<String>)> = Vec::new();

    if let Some(groups) = groups_section(&root, path)? {
        for (key, value) in groups {
            let name = GroupRef::global(key_text(key, path)?).name().to_string();
            let empty = Mapping::new();
            let node = entity_node(value, path, &name)?.unwrap_or(&empty);

            let group = table
                .create_group(&name)
                .map_err(|e| StoreError::duplicate(path, e))?;

            read_permissions(node, path, &name, &mut group.permissions, &mut report)?;
            match mapping_field(node.get("info"), path, "info")? {
                Some(info) => merge_variables(&mut group.variables, info),
                None => report.warn(LoadWarning::MissingInfo {
                    group: name.clone(),
                }),
            }
            if let Some(inherits) = node_value(node.get("inheritance"), path, "inheritance")? {
                pending.push((name, inherits.into_items()));
            }
        }
    }

    for (name, inherits) in pending {
        for text in inherits {
            let reference = GroupRef::global(text);
            if !table.contains(reference.name()) {
                report.warn(LoadWarning::DanglingReference {
                    referrer: name.clone(),
                    reference,
                });
                continue;
            }
            if let Some(group) = table.group_mut(&name) {
                group.add_inherits(reference);
            }
        }
    }

    debug!(groups = table.len(), "Decoded global groups document");
    Ok((table, report))
}

/// Encodes a scope's group table, header included.
pub fn encode_groups(table: &GroupTable) -> StoreResult<String> {
    let default = table.default_group_name().map(str::to_ascii_lowercase);
    let mut groups = Mapping::new();

    for group in table.iter() {
        let mut node = Mapping::new();
        node.insert(
            "default".into(),
            Value::Bool(default.as_deref() == Some(group.key().as_str())),
        );
        node.insert(
            "info".into(),
            Value::Mapping(variables_mapping(&group.variables)),
        );
        node.insert(
            "inheritance".into(),
            string_list(group.inherits().iter().map(GroupRef::to_document)),
        );
        node.insert("permissions".into(), permission_documents(&group.permissions));
        groups.insert(group.name().into(), Value::Mapping(node));
    }

    let mut root = Mapping::new();
    root.insert(GROUPS_KEY.into(), Value::Mapping(groups));
    let body = serialize(table.scope(), root)?;
    Ok(format!("{}\n{}", GROUPS_HEADER, body))
}

/// Encodes the global group table. Keys are written with the `g:` prefix.
pub fn encode_global_groups(table: &GroupTable) -> StoreResult<String> {
    let mut groups = Mapping::new();

    for group in table.iter() {
        let mut node = Mapping::new();
        node.insert(
            "info".into(),
            Value::Mapping(variables_mapping(&group.variables)),
        );
        node.insert(
            "inheritance".into(),
            string_list(group.inherits().iter().map(GroupRef::to_document)),
        );
        node.insert("permissions".into(), permission_documents(&group.permissions));
        groups.insert(
            GroupRef::global(group.name()).to_document().into(),
            Value::Mapping(node),
        );
    }

    let mut root = Mapping::new();
    root.insert(GROUPS_KEY.into(), Value::Mapping(groups));
    serialize(GLOBAL_SCOPE, root)
}

// =============================================================================
// Users
// =============================================================================

fn group_exists(reference: &GroupRef, groups: &GroupTable, global: &GroupTable) -> bool {
    match reference {
        GroupRef::Global(name) => global.contains(name),
        GroupRef::Local(name) => groups.contains(name) || global.contains(name),
    }
}

/// Decodes a scope's users document against its group table.
///
/// A missing or null `users` section is an empty scope. A primary group
/// that does not exist is dropped with a warning so the default applies.
pub fn decode_users(
    text: &str,
    path: &Path,
    scope: &str,
    groups: &GroupTable,
    global: &GroupTable,
) -> StoreResult<(UserTable, LoadReport)> {
    let root = parse_root(text, path)?;
    let mut report = LoadReport::new(path);
    let mut table = UserTable::new(scope);

    let Some(users) = mapping_field(root.get(USERS_KEY), path, USERS_KEY)? else {
        return Ok((table, report));
    };

    for (key, value) in users {
        let id = key_text(key, path)?;
        let empty = Mapping::new();
        let node = entity_node(value, path, &id)?.unwrap_or(&empty);

        let mut user = User::new(id.clone());

        if let Some(Value::String(last)) = node.get("lastname") {
            user.last_name = last.clone();
        }

        read_permissions(node, path, &id, &mut user.permissions, &mut report)?;

        if let Some(info) = mapping_field(node.get("info"), path, "info")? {
            merge_variables(&mut user.variables, info);
        }

        if let Some(value) = node_value(node.get("group"), path, "group")? {
            if let Some(text) = value.into_items().into_iter().next() {
                let reference = GroupRef::parse(&text);
                if group_exists(&reference, groups, global) {
                    user.set_primary_group(Some(reference));
                } else {
                    report.warn(LoadWarning::DanglingReference {
                        referrer: id.clone(),
                        reference,
                    });
                }
            }
        }

        if let Some(value) = node_value(node.get("subgroups"), path, "subgroups")? {
            for raw in value.into_items() {
                let (text, expires_at) = match split_timed(&raw) {
                    Ok(parts) => parts,
                    Err(TimedEntryError::Empty) => continue,
                    Err(TimedEntryError::InvalidExpiry { .. }) => {
                        report.warn(LoadWarning::MalformedTimedEntry {
                            owner: id.clone(),
                            entry: raw,
                        });
                        continue;
                    }
                };
                let reference = GroupRef::parse(&text);
                if !group_exists(&reference, groups, global) {
                    continue;
                }
                let sub = match expires_at {
                    Some(at) => SubGroup::timed(reference, at),
                    None => SubGroup::new(reference),
                };
                user.add_sub_group(sub);
            }
        }

        table
            .insert_user(user)
            .map_err(|e| StoreError::duplicate(path, e))?;
    }

    debug!(
        scope = %scope,
        users = table.len(),
        warnings = report.warnings().len(),
        "Decoded users document"
    );
    Ok((table, report))
}

/// Encodes a user table.
///
/// Users sort by id. Sparse users are left out; `lastname` is written only
/// when it differs from the id ignoring case.
pub fn encode_users(users: &UserTable, default_group: Option<&str>) -> StoreResult<String> {
    let default_name = default_group.unwrap_or_default();
    let mut out = Mapping::new();

    for user in users.iter() {
        if user.is_sparse(default_name) {
            continue;
        }
        let mut node = Mapping::new();
        if !user.last_name.is_empty() && !user.last_name.eq_ignore_ascii_case(user.id()) {
            node.insert("lastname".into(), user.last_name.clone().into());
        }
        let group = match user.primary_group() {
            Some(reference) => Some(reference.to_document()),
            None => default_group.map(str::to_string),
        };
        if let Some(group) = group {
            node.insert("group".into(), group.into());
        }
        node.insert(
            "subgroups".into(),
            string_list(
                user.sub_groups()
                    .iter()
                    .map(|s| join_timed(&s.group.to_document(), s.expires_at)),
            ),
        );
        node.insert("permissions".into(), permission_documents(&user.permissions));
        if !user.variables.is_empty() {
            node.insert(
                "info".into(),
                Value::Mapping(variables_mapping(&user.variables)),
            );
        }
        out.insert(user.id().into(), Value::Mapping(node));
    }

    let mut root = Mapping::new();
    root.insert(USERS_KEY.into(), Value::Mapping(out));
    serialize(users.scope(), root)
}

// =============================================================================
// Templates
// =============================================================================

/// Groups document written into a new scope folder.
pub const GROUPS_TEMPLATE: &str = "\
groups:
  Default:
    default: true
    info:
      prefix: ''
      suffix: ''
      build: false
    inheritance: []
    permissions: []
";

/// Users document written into a new scope folder.
pub const USERS_TEMPLATE: &str = "users: {}\n";

/// Global groups document written when none exists.
pub const GLOBAL_GROUPS_TEMPLATE: &str = "groups: {}\n";

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ward_core::CoreError;

    fn path() -> &'static Path {
        Path::new("groups.yml")
    }

    fn global() -> GroupTable {
        let mut table = GroupTable::new(GLOBAL_SCOPE);
        table.create_group("Base").unwrap();
        table
    }

    const GROUPS: &str = r#"
groups:
  Guest:
    default: true
    permissions: [chat, 'spawn|notanumber', '']
    info: {prefix: '[G]'}
    inheritance: [Builder, g:base, Ghost]
  Builder:
    default: true
    permissions: build.*
    inheritance: Guest
"#;

    #[test]
    fn test_decode_groups_two_pass() {
        let (table, report) = decode_groups(GROUPS, path(), "world", &global()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.default_group_name(), Some("Guest"));

        let guest = table.get("guest").unwrap();
        assert_eq!(guest.permissions.len(), 1);
        assert_eq!(guest.variables.get_text("prefix").as_deref(), Some("[G]"));
        assert_eq!(guest.variables.get_bool("build"), Some(false));
        assert_eq!(
            guest.inherits(),
            &[GroupRef::local("Builder"), GroupRef::global("base")]
        );

        let builder = table.get("Builder").unwrap();
        assert!(builder.permissions.contains("build.*"));
        assert_eq!(builder.inherits(), &[GroupRef::local("Guest")]);

        let warnings = report.warnings();
        assert!(warnings.contains(&LoadWarning::MalformedTimedEntry {
            owner: "Guest".to_string(),
            entry: "spawn|notanumber".to_string(),
        }));
        assert!(warnings.contains(&LoadWarning::DuplicateDefault {
            kept: "Guest".to_string(),
            ignored: "Builder".to_string(),
        }));
        assert!(warnings.contains(&LoadWarning::MissingInfo {
            group: "Builder".to_string(),
        }));
        assert!(warnings.contains(&LoadWarning::DanglingReference {
            referrer: "Guest".to_string(),
            reference: GroupRef::local("Ghost"),
        }));
    }

    #[test]
    fn test_decode_groups_requires_default() {
        let text = "groups:\n  Guest:\n    permissions: []\n";
        let err = decode_groups(text, path(), "world", &global()).unwrap_err();
        assert!(matches!(err, StoreError::MissingRequiredSection { .. }));
    }

    #[test]
    fn test_decode_groups_requires_section() {
        let err = decode_groups("users: {}\n", path(), "world", &global()).unwrap_err();
        assert!(matches!(err, StoreError::MissingRequiredSection { .. }));
    }

    #[test]
    fn test_decode_groups_rejects_case_collision() {
        let text = "groups:\n  Admin: {default: true}\n  admin: {}\n";
        let err = decode_groups(text, path(), "world", &global()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEntity { .. }));
    }

    #[test]
    fn test_decode_groups_rejects_bad_shapes() {
        let text = "groups:\n  Guest:\n    default: true\n    permissions: {a: b}\n";
        assert!(matches!(
            decode_groups(text, path(), "world", &global()),
            Err(StoreError::MalformedDocument { .. })
        ));

        let text = "groups:\n  Guest:\n    default: true\n    info: [a]\n";
        assert!(matches!(
            decode_groups(text, path(), "world", &global()),
            Err(StoreError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_encode_groups_has_header_and_reloads() {
        let (table, _) = decode_groups(GROUPS, path(), "world", &global()).unwrap();
        let text = encode_groups(&table).unwrap();
        assert!(text.starts_with("# Group inheritance"));

        let (again, report) = decode_groups(&text, path(), "world", &global()).unwrap();
        assert!(report.is_clean());
        assert_eq!(again.default_group_name(), Some("Guest"));
        assert_eq!(
            again.get("guest").unwrap().inherits(),
            table.get("guest").unwrap().inherits()
        );
        assert_eq!(
            again.get("builder").unwrap().permissions,
            table.get("builder").unwrap().permissions
        );
    }

    #[test]
    fn test_global_groups_prefix() {
        let text = "groups:\n  g:Base:\n    permissions: [a]\n  g:Mods:\n    inheritance: [g:base]\n";
        let (table, _) = decode_global_groups(text, path()).unwrap();
        assert!(table.contains("base"));
        assert_eq!(table.get("mods").unwrap().inherits(), &[GroupRef::global("base")]);

        let out = encode_global_groups(&table).unwrap();
        assert!(out.contains("g:Mods"));
        let (again, _) = decode_global_groups(&out, path()).unwrap();
        assert_eq!(again.len(), 2);
    }

    fn groups_table() -> GroupTable {
        decode_groups(GROUPS, path(), "world", &global()).unwrap().0
    }

    #[test]
    fn test_decode_users() {
        let text = r#"
users:
  12345:
    lastname: Numeric
  steve:
    lastname: Steve
    permissions: ['home.set', 'fly|1000']
    info: {rank: 2}
    group: Nowhere
    subgroups: [Builder|5000, Ghost, 'g:base', 'Guest|x']
"#;
        let groups = groups_table();
        let (users, report) =
            decode_users(text, Path::new("users.yml"), "world", &groups, &global()).unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users.get("12345").unwrap().last_name, "Numeric");

        let steve = users.get("STEVE").unwrap();
        assert_eq!(steve.primary_group(), None);
        assert_eq!(steve.permissions.len(), 2);
        assert_eq!(steve.variables.get_int("rank"), Some(2));
        assert_eq!(
            steve.sub_groups(),
            &[
                SubGroup::timed(GroupRef::local("Builder"), 5000),
                SubGroup::new(GroupRef::global("base")),
            ]
        );
        assert!(report.warnings().contains(&LoadWarning::DanglingReference {
            referrer: "steve".to_string(),
            reference: GroupRef::local("Nowhere"),
        }));
        assert!(report.warnings().contains(&LoadWarning::MalformedTimedEntry {
            owner: "steve".to_string(),
            entry: "Guest|x".to_string(),
        }));
    }

    #[test]
    fn test_decode_users_rejects_case_collision() {
        let text = "users:\n  Steve: {group: Guest}\n  steve: {permissions: [fly]}\n";
        let groups = groups_table();
        let err = decode_users(text, Path::new("users.yml"), "world", &groups, &global())
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateEntity {
                source: CoreError::DuplicateEntity { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_decode_users_without_section() {
        let groups = groups_table();
        let (users, _) =
            decode_users("other: 1\n", Path::new("users.yml"), "world", &groups, &global())
                .unwrap();
        assert!(users.is_empty());
    }

    #[test]
    fn test_encode_users_skips_sparse() {
        let mut users = UserTable::new("world");
        users.create_user("idle").unwrap();
        let explicit = users.create_user("Named").unwrap();
        explicit.set_primary_group(Some(GroupRef::local("Guest")));
        let busy = users.create_user("busy").unwrap();
        busy.last_name = "BusyBee".to_string();
        busy.add_permission(PermissionEntry::parse("fly"));
        busy.add_sub_group(SubGroup::timed(GroupRef::local("Builder"), 9000));

        let text = encode_users(&users, Some("Guest")).unwrap();
        assert!(!text.contains("idle"));
        assert!(!text.contains("Named"));
        assert!(text.contains("BusyBee"));
        assert!(text.contains("Builder|9000"));

        let (again, _) = decode_users(
            &text,
            Path::new("users.yml"),
            "world",
            &groups_table(),
            &global(),
        )
        .unwrap();
        let busy = again.get("busy").unwrap();
        assert_eq!(busy.primary_group(), Some(&GroupRef::local("Guest")));
        assert!(busy.permissions.contains("fly"));
        assert_eq!(busy.sub_groups().len(), 1);
    }

    #[test]
    fn test_lastname_equal_to_id_is_not_written() {
        let mut users = UserTable::new("world");
        let user = users.create_user("alex").unwrap();
        user.last_name = "ALEX".to_string();
        user.add_permission(PermissionEntry::parse("x"));
        let text = encode_users(&users, Some("Guest")).unwrap();
        assert!(!text.contains("lastname"));
    }

    #[test]
    fn test_templates_decode() {
        let (groups, _) =
            decode_groups(GROUPS_TEMPLATE, path(), "fresh", &GroupTable::new(GLOBAL_SCOPE))
                .unwrap();
        assert_eq!(groups.default_group_name(), Some("Default"));
        let (users, _) = decode_users(
            USERS_TEMPLATE,
            Path::new("users.yml"),
            "fresh",
            &groups,
            &GroupTable::new(GLOBAL_SCOPE),
        )
        .unwrap();
        assert!(users.is_empty());
        assert!(decode_global_groups(GLOBAL_GROUPS_TEMPLATE, path()).unwrap().0.is_empty());
    }
}
