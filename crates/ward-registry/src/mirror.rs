// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mirror table.
//!
//! Maps a target scope to the scope whose group or user table it reuses.
//! All names are lowercase. Chains are flattened when the map is built, so
//! a source is never itself mirrored for the same table.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};
use ward_config::MirrorEntry;
use ward_core::TableKind;

/// Target-to-source mapping for both table kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorMap {
    groups: BTreeMap<String, String>,
    users: BTreeMap<String, String>,
}

impl MirrorMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from configured entries.
    ///
    /// Entries targeting the default scope or their own source are skipped
    /// with a warning. A later entry for the same target and table replaces
    /// an earlier one.
    pub fn build(entries: &[MirrorEntry], default_scope: &str) -> Self {
        let default_scope = default_scope.to_lowercase();
        let mut map = Self::new();

        for entry in entries {
            let source = entry.source.to_lowercase();
            let target = entry.target.to_lowercase();
            if target == default_scope {
                warn!(
                    source = %source,
                    target = %target,
                    "The default scope cannot be mirrored; entry ignored"
                );
                continue;
            }
            if target == source {
                warn!(scope = %source, "A scope cannot mirror itself; entry ignored");
                continue;
            }
            if entry.groups {
                debug!(source = %source, target = %target, "Adding groups mirror");
                map.groups.insert(target.clone(), source.clone());
            }
            if entry.users {
                debug!(source = %source, target = %target, "Adding users mirror");
                map.users.insert(target, source);
            }
        }

        flatten(&mut map.groups, TableKind::Groups);
        flatten(&mut map.users, TableKind::Users);
        map
    }

    fn table(&self, kind: TableKind) -> &BTreeMap<String, String> {
        match kind {
            TableKind::Groups => &self.groups,
            TableKind::Users => &self.users,
        }
    }

    /// Returns the scope whose `kind` table `scope` reuses.
    pub fn source_of(&self, scope: &str, kind: TableKind) -> Option<&str> {
        self.table(kind)
            .get(&scope.to_lowercase())
            .map(String::as_str)
    }

    /// Returns the groups source of `scope`.
    pub fn groups_source(&self, scope: &str) -> Option<&str> {
        self.source_of(scope, TableKind::Groups)
    }

    /// Returns the users source of `scope`.
    pub fn users_source(&self, scope: &str) -> Option<&str> {
        self.source_of(scope, TableKind::Users)
    }

    /// Returns `true` if the group table of `scope` is mirrored.
    pub fn has_groups_mirror(&self, scope: &str) -> bool {
        self.groups_source(scope).is_some()
    }

    /// Returns `true` if the user table of `scope` is mirrored.
    pub fn has_users_mirror(&self, scope: &str) -> bool {
        self.users_source(scope).is_some()
    }

    /// Returns `true` if both tables of `scope` are mirrored.
    pub fn is_full_mirror(&self, scope: &str) -> bool {
        self.has_groups_mirror(scope) && self.has_users_mirror(scope)
    }

    /// Returns `true` if `scope` mirrors anything.
    pub fn contains(&self, scope: &str) -> bool {
        self.has_groups_mirror(scope) || self.has_users_mirror(scope)
    }

    /// Returns every scope that is a mirror source.
    pub fn sources(&self) -> BTreeSet<String> {
        self.groups.values().chain(self.users.values()).cloned().collect()
    }

    /// Returns every scope that mirrors something.
    pub fn targets(&self) -> BTreeSet<String> {
        self.groups.keys().chain(self.users.keys()).cloned().collect()
    }

    /// Gives `scope` the mirrors `from` has.
    pub fn inherit(&mut self, scope: &str, from: &str) {
        let scope = scope.to_lowercase();
        if let Some(source) = self.groups_source(from).map(str::to_string) {
            if source != scope {
                self.groups.insert(scope.clone(), source);
            }
        }
        if let Some(source) = self.users_source(from).map(str::to_string) {
            if source != scope {
                self.users.insert(scope, source);
            }
        }
    }

    /// Returns `true` if nothing is mirrored.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.users.is_empty()
    }
}

/// Points every target at the end of its chain. Cyclic entries are dropped.
fn flatten(map: &mut BTreeMap<String, String>, kind: TableKind) {
    let original = map.clone();
    for (target, first) in &original {
        let mut seen = BTreeSet::from([target.clone()]);
        let mut root = first.clone();
        let mut cyclic = false;
        while let Some(next) = original.get(&root) {
            if !seen.insert(root.clone()) {
                cyclic = true;
                break;
            }
            root = next.clone();
        }
        if cyclic || &root == target {
            warn!(scope = %target, table = %kind, "Cyclic mirror entry ignored");
            map.remove(target);
        } else {
            map.insert(target.clone(), root);
        }
    }
}
