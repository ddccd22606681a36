// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Scope data holder.
//!
//! [`ScopeData`] owns the group table and the user table of one scope, each
//! behind its own reader/writer lock and reference counted so that mirrored
//! scopes can hold the very same table. Mutating a group through one scope
//! is visible through every scope that mirrors it.
//!
//! # Lock order
//!
//! Methods that need several tables lock them in this order and release
//! the user table before taking the group table:
//!
//! 1. user table
//! 2. scope group table
//! 3. global group table

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::global::GlobalGroups;
use crate::group::Group;
use crate::resolve::{EffectivePermissions, Resolver};
use crate::tables::{GroupTable, SyncState, UserTable};
use crate::user::User;

/// Shared handle to a group table.
pub type SharedGroups = Arc<RwLock<GroupTable>>;

/// Shared handle to a user table.
pub type SharedUsers = Arc<RwLock<UserTable>>;

/// Which half of a scope's data an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// The group table.
    Groups,
    /// The user table.
    Users,
}

impl TableKind {
    /// Returns the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Groups => "groups",
            TableKind::Users => "users",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data of one scope.
#[derive(Clone)]
pub struct ScopeData {
    name: String,
    groups: SharedGroups,
    users: SharedUsers,
}

impl ScopeData {
    /// Creates a scope owning two empty tables.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            groups: Arc::new(RwLock::new(GroupTable::new(name.clone()))),
            users: Arc::new(RwLock::new(UserTable::new(name.clone()))),
            name,
        }
    }

    /// Creates a scope from existing table handles, typically shared with
    /// the scope it mirrors.
    pub fn with_tables(name: impl Into<String>, groups: SharedGroups, users: SharedUsers) -> Self {
        Self {
            name: name.into(),
            groups,
            users,
        }
    }

    /// Returns the scope name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the group table handle.
    pub fn groups(&self) -> &SharedGroups {
        &self.groups
    }

    /// Returns the user table handle.
    pub fn users(&self) -> &SharedUsers {
        &self.users
    }

    /// Returns `true` if both scopes hold the same group table.
    pub fn shares_groups_with(&self, other: &ScopeData) -> bool {
        Arc::ptr_eq(&self.groups, &other.groups)
    }

    /// Returns `true` if both scopes hold the same user table.
    pub fn shares_users_with(&self, other: &ScopeData) -> bool {
        Arc::ptr_eq(&self.users, &other.users)
    }

    /// Creates an empty group.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateEntity`] on a case-insensitive collision.
    pub fn create_group(&self, name: &str) -> CoreResult<()> {
        self.groups.write().create_group(name).map(|_| ())
    }

    /// Creates an empty user.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateEntity`] on a case-insensitive collision.
    pub fn create_user(&self, id: &str) -> CoreResult<()> {
        self.users.write().create_user(id).map(|_| ())
    }

    /// Returns a copy of a group.
    pub fn get_group(&self, name: &str) -> Option<Group> {
        self.groups.read().get(name).cloned()
    }

    /// Returns a copy of a user.
    pub fn get_user(&self, id: &str) -> Option<User> {
        self.users.read().get(id).cloned()
    }

    /// Applies `f` to a group under the write lock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownGroup`] if the group does not exist.
    pub fn update_group<R>(&self, name: &str, f: impl FnOnce(&mut Group) -> R) -> CoreResult<R> {
        let mut table = self.groups.write();
        let group = table
            .group_mut(name)
            .ok_or_else(|| CoreError::unknown_group(&self.name, name))?;
        Ok(f(group))
    }

    /// Applies `f` to a user under the write lock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownUser`] if the user does not exist.
    pub fn update_user<R>(&self, id: &str, f: impl FnOnce(&mut User) -> R) -> CoreResult<R> {
        let mut table = self.users.write();
        let user = table
            .user_mut(id)
            .ok_or_else(|| CoreError::unknown_user(&self.name, id))?;
        Ok(f(user))
    }

    /// Returns the default group's name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingDefaultGroup`] if none is set.
    pub fn default_group_name(&self) -> CoreResult<String> {
        self.groups
            .read()
            .default_group()
            .map(|g| g.name().to_string())
    }

    /// Makes `name` the default group.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownGroup`] if the group does not exist.
    pub fn set_default_group(&self, name: &str) -> CoreResult<()> {
        self.groups.write().set_default_group(name)
    }

    /// Drops expired permissions and sub-groups from both tables.
    ///
    /// Returns the outcome; [`PurgeOutcome::changed`] is `true` if anything
    /// was removed.
    pub fn purge_expired_permissions(&self, now: i64) -> PurgeOutcome {
        let users = self.users.write().purge_expired(now);
        let groups = self.groups.write().purge_expired(now);
        if groups || !users.is_empty() {
            tracing::debug!(
                scope = %self.name,
                groups_changed = groups,
                users = users.len(),
                "Purged expired permissions"
            );
        }
        PurgeOutcome { groups, users }
    }

    /// Replaces the group table with an empty one.
    pub fn reset_groups(&self) {
        self.replace_groups(GroupTable::new(self.name.clone()));
    }

    /// Replaces the user table with an empty one.
    pub fn reset_users(&self) {
        self.replace_users(UserTable::new(self.name.clone()));
    }

    /// Swaps in a fully loaded group table under the write lock.
    pub fn replace_groups(&self, staged: GroupTable) {
        *self.groups.write() = staged;
    }

    /// Swaps in a fully loaded user table under the write lock.
    pub fn replace_users(&self, staged: UserTable) {
        *self.users.write() = staged;
    }

    /// Swaps in a staged group table only if the live table is still in
    /// `expected` state. Returns `false` and keeps the live table otherwise.
    pub fn replace_groups_if(&self, staged: GroupTable, expected: SyncState) -> bool {
        let mut table = self.groups.write();
        if table.sync_state() != expected {
            return false;
        }
        *table = staged;
        true
    }

    /// Swaps in a staged user table only if the live table is still in
    /// `expected` state.
    pub fn replace_users_if(&self, staged: UserTable, expected: SyncState) -> bool {
        let mut table = self.users.write();
        if table.sync_state() != expected {
            return false;
        }
        *table = staged;
        true
    }

    /// Resolves the effective permissions of `user_id`.
    ///
    /// An unknown user resolves as a user with no data of their own, which
    /// yields the default group's permissions. Nothing is created.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingDefaultGroup`] if the scope has no
    /// default group.
    pub fn resolve_permissions(
        &self,
        user_id: &str,
        global: &GlobalGroups,
        now: i64,
    ) -> CoreResult<EffectivePermissions> {
        let user = self
            .get_user(user_id)
            .unwrap_or_else(|| User::new(user_id));
        let groups = self.groups.read();
        let global = global.read();
        let effective = Resolver::new(&groups, &global, now).resolve(&user)?;
        for diagnostic in effective.diagnostics() {
            tracing::warn!(scope = %self.name, user = %user_id, "{}", diagnostic);
        }
        Ok(effective)
    }
}

impl fmt::Debug for ScopeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeData")
            .field("name", &self.name)
            .field("groups", &self.groups.read().len())
            .field("users", &self.users.read().len())
            .finish()
    }
}

/// Result of [`ScopeData::purge_expired_permissions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    /// `true` if any group lost an entry.
    pub groups: bool,
    /// Ids of users that lost an entry.
    pub users: Vec<String>,
}

impl PurgeOutcome {
    /// Returns `true` if anything was removed.
    pub fn changed(&self) -> bool {
        self.groups || !self.users.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionEntry;

    fn scope() -> ScopeData {
        let scope = ScopeData::new("world");
        scope.create_group("Guest").unwrap();
        scope.set_default_group("Guest").unwrap();
        scope
            .update_group("Guest", |g| g.add_permission(PermissionEntry::parse("chat")))
            .unwrap();
        scope
    }

    #[test]
    fn test_create_and_get() {
        let scope = scope();
        assert!(scope.create_group("guest").unwrap_err().is_duplicate());
        scope.create_user("Steve").unwrap();
        assert!(scope.create_user("STEVE").is_err());
        assert!(scope.get_user("steve").is_some());
        assert!(scope.get_group("nobody").is_none());
    }

    #[test]
    fn test_unknown_user_gets_default_without_being_created() {
        let scope = scope();
        let global = GlobalGroups::new();
        let effective = scope.resolve_permissions("Ghost", &global, 0).unwrap();
        assert!(effective.has("chat"));
        assert!(scope.get_user("Ghost").is_none());
    }

    #[test]
    fn test_mirror_shares_tables() {
        let source = scope();
        let mirror = ScopeData::with_tables(
            "nether",
            source.groups().clone(),
            source.users().clone(),
        );
        assert!(mirror.shares_groups_with(&source));

        source
            .update_group("Guest", |g| g.add_permission(PermissionEntry::parse("fly")))
            .unwrap();
        let effective = mirror
            .resolve_permissions("Steve", &GlobalGroups::new(), 0)
            .unwrap();
        assert!(effective.has("fly"));
    }

    #[test]
    fn test_purge_expired_permissions() {
        let scope = scope();
        scope.create_user("Steve").unwrap();
        scope
            .update_user("Steve", |u| {
                u.add_permission(PermissionEntry::with_expiry("fly", Some(10)))
            })
            .unwrap();
        scope
            .update_group("Guest", |g| {
                g.add_permission(PermissionEntry::with_expiry("build", Some(10)))
            })
            .unwrap();

        let outcome = scope.purge_expired_permissions(20);
        assert!(outcome.changed());
        assert!(outcome.groups);
        assert_eq!(outcome.users, vec!["Steve".to_string()]);
        assert!(!scope.purge_expired_permissions(20).changed());
    }

    #[test]
    fn test_reset_replaces_tables() {
        let scope = scope();
        scope.create_user("Steve").unwrap();
        scope.reset_users();
        assert!(scope.get_user("Steve").is_none());
        scope.reset_groups();
        assert!(scope.default_group_name().is_err());
    }

    #[test]
    fn test_conditional_replace_keeps_newer_edits() {
        let scope = scope();
        let expected = scope.users().read().sync_state();

        let mut staged = UserTable::new("world");
        staged.create_user("Alex").unwrap();
        staged.mark_synced(10);

        // an edit after the state was observed wins over the staged table
        scope.create_user("Steve").unwrap();
        assert!(!scope.replace_users_if(staged.clone(), expected));
        assert!(scope.get_user("Steve").is_some());
        assert!(scope.get_user("Alex").is_none());

        let expected = scope.users().read().sync_state();
        assert!(scope.replace_users_if(staged, expected));
        assert!(scope.get_user("Alex").is_some());
        assert!(!scope.users().read().is_changed());
    }
}
