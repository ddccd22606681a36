// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Effective permission resolution.
//!
//! The walk order for a user is:
//!
//! 1. the user's own permissions,
//! 2. each active sub-group in the order it was added, with everything it
//!    inherits,
//! 3. the primary group (or the scope default) with its inheritance chain.
//!
//! Inheritance is walked depth first with an explicit work stack and a
//! visited set, so cyclic documents terminate and every group contributes
//! at most once, at its first encounter.
//!
//! A local reference is looked up in the scope first and then in the
//! global namespace. Groups found in the global namespace only see other
//! global groups.
//!
//! Resolution takes shared references to the tables and never mutates them.
//! Missing groups are skipped and reported as [`Diagnostic`]s.

use std::collections::HashSet;
use std::fmt;

use crate::error::CoreResult;
use crate::group::{Group, GroupRef};
use crate::permission::{check_permission, PermissionEntry};
use crate::tables::GroupTable;
use crate::user::User;

// =============================================================================
// Diagnostics
// =============================================================================

/// A recoverable problem found during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A referenced group does not exist and was skipped.
    DanglingReference {
        /// User id or group name holding the reference.
        referrer: String,
        /// The reference that could not be resolved.
        reference: GroupRef,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DanglingReference {
                referrer,
                reference,
            } => write!(f, "'{}' references missing group '{}'", referrer, reference),
        }
    }
}

// =============================================================================
// EffectivePermissions
// =============================================================================

/// The resolved, priority-ordered permissions of one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectivePermissions {
    entries: Vec<PermissionEntry>,
    groups: Vec<GroupRef>,
    diagnostics: Vec<Diagnostic>,
}

impl EffectivePermissions {
    /// Returns the entries, highest priority first.
    pub fn entries(&self) -> &[PermissionEntry] {
        &self.entries
    }

    /// Returns the groups that contributed, in walk order.
    pub fn groups(&self) -> &[GroupRef] {
        &self.groups
    }

    /// Returns the problems found during resolution.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns `true` if `permission` is granted.
    pub fn has(&self, permission: &str) -> bool {
        self.check(permission).unwrap_or(false)
    }

    /// Returns the decision for `permission`, or `None` if nothing matched.
    pub fn check(&self, permission: &str) -> Option<bool> {
        check_permission(&self.entries, permission)
    }

    /// Returns the entries in their persisted text form.
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(PermissionEntry::text).collect()
    }
}

// =============================================================================
// Resolver
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Visited {
    Local(String),
    Global(String),
}

struct Frame {
    reference: GroupRef,
    referrer: String,
    global_only: bool,
}

/// Resolves users against one scope's group table and the global groups.
pub struct Resolver<'a> {
    local: &'a GroupTable,
    global: &'a GroupTable,
    now: i64,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver evaluating expiry at `now` (epoch millis).
    pub fn new(local: &'a GroupTable, global: &'a GroupTable, now: i64) -> Self {
        Self { local, global, now }
    }

    /// Resolves the effective permissions of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingDefaultGroup`](crate::error::CoreError)
    /// if the scope has no default group.
    pub fn resolve(&self, user: &User) -> CoreResult<EffectivePermissions> {
        let default = self.local.default_group()?;

        let mut raw: Vec<PermissionEntry> = user.permissions.active(self.now).cloned().collect();
        let mut groups = Vec::new();
        let mut diagnostics = Vec::new();
        let mut visited = HashSet::new();

        for sub in user.active_sub_groups(self.now) {
            self.walk(
                Frame {
                    reference: sub.group.clone(),
                    referrer: user.id().to_string(),
                    global_only: false,
                },
                &mut visited,
                &mut raw,
                &mut groups,
                &mut diagnostics,
            );
        }

        let primary = match user.primary_group() {
            Some(reference) if self.lookup(reference, false).is_some() => reference.clone(),
            Some(reference) => {
                diagnostics.push(Diagnostic::DanglingReference {
                    referrer: user.id().to_string(),
                    reference: reference.clone(),
                });
                GroupRef::local(default.name())
            }
            None => GroupRef::local(default.name()),
        };
        self.walk(
            Frame {
                reference: primary,
                referrer: user.id().to_string(),
                global_only: false,
            },
            &mut visited,
            &mut raw,
            &mut groups,
            &mut diagnostics,
        );

        Ok(EffectivePermissions {
            entries: collapse(raw),
            groups,
            diagnostics,
        })
    }

    /// Resolves the permissions a single group grants, with inheritance.
    pub fn resolve_group(&self, reference: &GroupRef) -> EffectivePermissions {
        let mut raw = Vec::new();
        let mut groups = Vec::new();
        let mut diagnostics = Vec::new();
        self.walk(
            Frame {
                reference: reference.clone(),
                referrer: reference.to_document(),
                global_only: false,
            },
            &mut HashSet::new(),
            &mut raw,
            &mut groups,
            &mut diagnostics,
        );
        EffectivePermissions {
            entries: collapse(raw),
            groups,
            diagnostics,
        }
    }

    fn lookup(&self, reference: &GroupRef, global_only: bool) -> Option<(Visited, &'a Group)> {
        let name = reference.name();
        let global = || {
            self.global
                .get(name)
                .map(|g| (Visited::Global(g.key()), g))
        };
        match reference {
            GroupRef::Local(_) if !global_only => self
                .local
                .get(name)
                .map(|g| (Visited::Local(g.key()), g))
                .or_else(global),
            _ => global(),
        }
    }

    fn walk(
        &self,
        start: Frame,
        visited: &mut HashSet<Visited>,
        raw: &mut Vec<PermissionEntry>,
        groups: &mut Vec<GroupRef>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut stack = vec![start];

        while let Some(frame) = stack.pop() {
            let Some((key, group)) = self.lookup(&frame.reference, frame.global_only) else {
                tracing::trace!(
                    referrer = %frame.referrer,
                    reference = %frame.reference,
                    "Skipping missing group"
                );
                diagnostics.push(Diagnostic::DanglingReference {
                    referrer: frame.referrer,
                    reference: frame.reference,
                });
                continue;
            };

            let from_global = matches!(key, Visited::Global(_));
            if !visited.insert(key) {
                continue;
            }

            groups.push(if from_global {
                GroupRef::global(group.name())
            } else {
                GroupRef::local(group.name())
            });
            raw.extend(group.permissions.active(self.now).cloned());

            // Reverse push keeps declaration order on pop.
            for parent in group.inherits().iter().rev() {
                stack.push(Frame {
                    reference: parent.clone(),
                    referrer: group.name().to_string(),
                    global_only: from_global,
                });
            }
        }
    }
}

/// Drops repeated entries and grants cancelled by an earlier negation.
fn collapse(raw: Vec<PermissionEntry>) -> Vec<PermissionEntry> {
    let mut result: Vec<PermissionEntry> = Vec::with_capacity(raw.len());
    for entry in raw {
        if result.iter().any(|e| e.same_identity(&entry)) {
            continue;
        }
        if !entry.is_negated()
            && result
                .iter()
                .any(|e| e.is_negated() && e.matches(entry.node()))
        {
            continue;
        }
        result.push(entry);
    }
    result
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::SubGroup;

    fn group(table: &mut GroupTable, name: &str, perms: &[&str], inherits: &[&str]) {
        let g = table.create_group(name).unwrap();
        for p in perms {
            g.add_permission(PermissionEntry::parse(p));
        }
        for i in inherits {
            g.add_inherits(GroupRef::parse(i));
        }
    }

    fn scope() -> GroupTable {
        let mut table = GroupTable::new("world");
        group(&mut table, "Guest", &["chat.talk"], &[]);
        table.set_default_group("Guest").unwrap();
        table
    }

    #[test]
    fn test_cycle_terminates() {
        let mut local = scope();
        group(&mut local, "A", &["a.perm"], &["B"]);
        group(&mut local, "B", &["b.perm"], &["A"]);
        let global = GroupTable::new("global");

        let mut user = User::new("Steve");
        user.set_primary_group(Some(GroupRef::local("A")));

        let effective = Resolver::new(&local, &global, 0).resolve(&user).unwrap();
        assert_eq!(effective.texts(), vec!["a.perm", "b.perm"]);
        assert_eq!(effective.groups().len(), 2);
        assert!(effective.diagnostics().is_empty());
    }

    #[test]
    fn test_walk_order_and_negation() {
        let mut local = scope();
        group(&mut local, "Member", &["build.*"], &["Guest"]);
        group(&mut local, "Jail", &["-build.*", "-chat.talk"], &[]);
        let global = GroupTable::new("global");

        let mut user = User::new("Steve");
        user.add_permission(PermissionEntry::parse("build.place"));
        user.set_primary_group(Some(GroupRef::local("Member")));
        user.add_sub_group(SubGroup::new(GroupRef::local("Jail")));

        let effective = Resolver::new(&local, &global, 0).resolve(&user).unwrap();
        assert!(effective.has("build.place"));
        assert!(!effective.has("build.break"));
        assert!(!effective.has("chat.talk"));
        assert_eq!(
            effective.groups(),
            &[
                GroupRef::local("Jail"),
                GroupRef::local("Member"),
                GroupRef::local("Guest")
            ]
        );
        assert!(!effective.texts().contains(&"build.*".to_string()));
    }

    #[test]
    fn test_expired_sub_group_is_ignored() {
        let mut local = scope();
        group(&mut local, "Vip", &["fly"], &[]);
        let global = GroupTable::new("global");

        let mut user = User::new("Steve");
        user.add_sub_group(SubGroup::timed(GroupRef::local("Vip"), 100));

        let resolver = Resolver::new(&local, &global, 50);
        assert!(resolver.resolve(&user).unwrap().has("fly"));
        let resolver = Resolver::new(&local, &global, 100);
        assert!(!resolver.resolve(&user).unwrap().has("fly"));
    }

    #[test]
    fn test_global_fallback_and_prefix() {
        let mut local = scope();
        group(&mut local, "Staff", &[], &["g:Mods", "Helpers"]);
        let mut global = GroupTable::new("global");
        group(&mut global, "Mods", &["kick"], &["Helpers"]);
        group(&mut global, "Helpers", &["mute"], &[]);

        let mut user = User::new("Steve");
        user.set_primary_group(Some(GroupRef::local("Staff")));

        let effective = Resolver::new(&local, &global, 0).resolve(&user).unwrap();
        assert!(effective.has("kick"));
        assert!(effective.has("mute"));
        assert!(effective.groups().contains(&GroupRef::global("Helpers")));
    }

    #[test]
    fn test_global_group_does_not_see_local_groups() {
        let mut local = scope();
        group(&mut local, "Secret", &["secret"], &[]);
        let mut global = GroupTable::new("global");
        group(&mut global, "Mods", &[], &["Secret"]);

        let mut user = User::new("Steve");
        user.set_primary_group(Some(GroupRef::global("Mods")));

        let effective = Resolver::new(&local, &global, 0).resolve(&user).unwrap();
        assert!(!effective.has("secret"));
        assert_eq!(effective.diagnostics().len(), 1);
    }

    #[test]
    fn test_dangling_primary_falls_back_to_default() {
        let local = scope();
        let global = GroupTable::new("global");

        let mut user = User::new("Steve");
        user.set_primary_group(Some(GroupRef::local("Gone")));
        user.add_sub_group(SubGroup::new(GroupRef::local("AlsoGone")));

        let effective = Resolver::new(&local, &global, 0).resolve(&user).unwrap();
        assert!(effective.has("chat.talk"));
        assert_eq!(effective.diagnostics().len(), 2);
    }

    #[test]
    fn test_missing_default_is_an_error() {
        let local = GroupTable::new("world");
        let global = GroupTable::new("global");
        let user = User::new("Steve");
        assert!(Resolver::new(&local, &global, 0).resolve(&user).is_err());
    }
}
