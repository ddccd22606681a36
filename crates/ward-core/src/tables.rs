// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Group and user tables.
//!
//! A table owns its entities keyed by lowercase name and tracks the two
//! pieces of state the save protocol needs: a `changed` flag, set by every
//! mutation made through the table, and the file timestamp (epoch millis)
//! recorded when the table was last loaded from or written to disk.
//!
//! Tables are plain data. Locking is done by the owner, see
//! [`ScopeData`](crate::holder::ScopeData).

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult, EntityKind};
use crate::group::Group;
use crate::user::User;

// =============================================================================
// SyncState
// =============================================================================

/// Persistence bookkeeping shared by both table kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    changed: bool,
    timestamp: i64,
}

impl SyncState {
    /// Returns `true` if the table was mutated since the last sync.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Returns the last known file timestamp in epoch millis.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn mark_changed(&mut self) {
        self.changed = true;
    }

    fn mark_synced(&mut self, timestamp: i64) {
        self.changed = false;
        self.timestamp = timestamp;
    }
}

// =============================================================================
// GroupTable
// =============================================================================

/// All groups of one scope, or of the global namespace.
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    scope: String,
    groups: BTreeMap<String, Group>,
    default_group: Option<String>,
    sync: SyncState,
}

impl GroupTable {
    /// Creates an empty table for `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..Default::default()
        }
    }

    /// Returns the owning scope name.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Creates an empty group.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateEntity`] if a group with the same name
    /// exists, ignoring case.
    pub fn create_group(&mut self, name: &str) -> CoreResult<&mut Group> {
        self.insert_group(Group::new(name))
    }

    /// Inserts a fully built group.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateEntity`] on a name collision.
    pub fn insert_group(&mut self, group: Group) -> CoreResult<&mut Group> {
        let key = group.key();
        if self.groups.contains_key(&key) {
            return Err(CoreError::duplicate(EntityKind::Group, group.name()));
        }
        self.sync.mark_changed();
        Ok(self.groups.entry(key).or_insert(group))
    }

    /// Returns a group by name.
    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(&name.to_ascii_lowercase())
    }

    /// Returns a group for mutation and marks the table changed.
    pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        let group = self.groups.get_mut(&name.to_ascii_lowercase())?;
        self.sync.mark_changed();
        Some(group)
    }

    /// Returns `true` if a group with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes a group.
    ///
    /// # Errors
    ///
    /// Refuses to remove the default group, and reports unknown names.
    pub fn remove_group(&mut self, name: &str) -> CoreResult<Group> {
        let key = name.to_ascii_lowercase();
        if self.default_group.as_deref() == Some(key.as_str()) {
            return Err(CoreError::DefaultGroupInUse {
                scope: self.scope.clone(),
                name: name.to_string(),
            });
        }
        let group = self
            .groups
            .remove(&key)
            .ok_or_else(|| CoreError::unknown_group(&self.scope, name))?;
        self.sync.mark_changed();
        Ok(group)
    }

    /// Returns the default group.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingDefaultGroup`] if none is set.
    pub fn default_group(&self) -> CoreResult<&Group> {
        self.default_group
            .as_ref()
            .and_then(|key| self.groups.get(key))
            .ok_or_else(|| CoreError::missing_default(&self.scope))
    }

    /// Returns the default group's name, if one is set.
    pub fn default_group_name(&self) -> Option<&str> {
        self.default_group().ok().map(Group::name)
    }

    /// Makes `name` the default group.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownGroup`] if the group does not exist.
    pub fn set_default_group(&mut self, name: &str) -> CoreResult<()> {
        let key = name.to_ascii_lowercase();
        if !self.groups.contains_key(&key) {
            return Err(CoreError::unknown_group(&self.scope, name));
        }
        if self.default_group.as_deref() != Some(key.as_str()) {
            self.default_group = Some(key);
            self.sync.mark_changed();
        }
        Ok(())
    }

    /// Drops expired permissions from every group.
    ///
    /// Returns `true` and marks the table changed if anything was removed.
    pub fn purge_expired(&mut self, now: i64) -> bool {
        let mut changed = false;
        for group in self.groups.values_mut() {
            changed |= group.purge_expired(now);
        }
        if changed {
            self.sync.mark_changed();
        }
        changed
    }

    /// Iterates over groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if the table has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the persistence bookkeeping.
    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    /// Returns `true` if the table was mutated since the last sync.
    pub fn is_changed(&self) -> bool {
        self.sync.is_changed()
    }

    /// Returns the last known file timestamp in epoch millis.
    pub fn timestamp(&self) -> i64 {
        self.sync.timestamp()
    }

    /// Marks the table as mutated.
    pub fn mark_changed(&mut self) {
        self.sync.mark_changed();
    }

    /// Clears the changed flag and records the file timestamp.
    pub fn mark_synced(&mut self, timestamp: i64) {
        self.sync.mark_synced(timestamp);
    }
}

// =============================================================================
// UserTable
// =============================================================================

/// All users of one scope.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    scope: String,
    users: BTreeMap<String, User>,
    sync: SyncState,
}

impl UserTable {
    /// Creates an empty table for `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..Default::default()
        }
    }

    /// Returns the owning scope name.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Creates an empty user.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateEntity`] if a user with the same id
    /// exists, ignoring case.
    pub fn create_user(&mut self, id: &str) -> CoreResult<&mut User> {
        self.insert_user(User::new(id))
    }

    /// Inserts a fully built user.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateEntity`] on an id collision.
    pub fn insert_user(&mut self, user: User) -> CoreResult<&mut User> {
        let key = user.key();
        if self.users.contains_key(&key) {
            return Err(CoreError::duplicate(EntityKind::User, user.id()));
        }
        self.sync.mark_changed();
        Ok(self.users.entry(key).or_insert(user))
    }

    /// Returns a user by id.
    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.get(&id.to_ascii_lowercase())
    }

    /// Returns a user for mutation and marks the table changed.
    pub fn user_mut(&mut self, id: &str) -> Option<&mut User> {
        let user = self.users.get_mut(&id.to_ascii_lowercase())?;
        self.sync.mark_changed();
        Some(user)
    }

    /// Returns `true` if a user with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.users.contains_key(&id.to_ascii_lowercase())
    }

    /// Removes a user.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownUser`] if the id is not present.
    pub fn remove_user(&mut self, id: &str) -> CoreResult<User> {
        let user = self
            .users
            .remove(&id.to_ascii_lowercase())
            .ok_or_else(|| CoreError::unknown_user(&self.scope, id))?;
        self.sync.mark_changed();
        Ok(user)
    }

    /// Drops expired permissions and sub-groups from every user.
    ///
    /// Returns the ids of affected users and marks the table changed if
    /// the list is not empty.
    pub fn purge_expired(&mut self, now: i64) -> Vec<String> {
        let affected: Vec<String> = self
            .users
            .values_mut()
            .filter_map(|user| user.purge_expired(now).then(|| user.id().to_string()))
            .collect();
        if !affected.is_empty() {
            self.sync.mark_changed();
        }
        affected
    }

    /// Iterates over users in key order.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Returns the number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if the table has no users.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Returns the persistence bookkeeping.
    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    /// Returns `true` if the table was mutated since the last sync.
    pub fn is_changed(&self) -> bool {
        self.sync.is_changed()
    }

    /// Returns the last known file timestamp in epoch millis.
    pub fn timestamp(&self) -> i64 {
        self.sync.timestamp()
    }

    /// Marks the table as mutated.
    pub fn mark_changed(&mut self) {
        self.sync.mark_changed();
    }

    /// Clears the changed flag and records the file timestamp.
    pub fn mark_synced(&mut self, timestamp: i64) {
        self.sync.mark_synced(timestamp);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionEntry;

    #[test]
    fn test_create_group_rejects_duplicates() {
        let mut table = GroupTable::new("world");
        table.create_group("Admin").unwrap();
        let err = table.create_group("ADMIN").unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(table.len(), 1);
        assert!(table.get("admin").is_some());
    }

    #[test]
    fn test_default_group() {
        let mut table = GroupTable::new("world");
        assert!(matches!(
            table.default_group(),
            Err(CoreError::MissingDefaultGroup { .. })
        ));
        table.create_group("Guest").unwrap();
        table.set_default_group("guest").unwrap();
        assert_eq!(table.default_group_name(), Some("Guest"));
        assert!(table.set_default_group("nobody").is_err());
        assert!(matches!(
            table.remove_group("Guest"),
            Err(CoreError::DefaultGroupInUse { .. })
        ));
    }

    #[test]
    fn test_mutation_marks_changed() {
        let mut table = GroupTable::new("world");
        table.create_group("Guest").unwrap();
        table.mark_synced(1000);
        assert!(!table.is_changed());
        assert_eq!(table.timestamp(), 1000);

        assert!(table.get("guest").is_some());
        assert!(!table.is_changed());

        table.group_mut("guest").unwrap();
        assert!(table.is_changed());
    }

    #[test]
    fn test_user_purge_reports_affected() {
        let mut table = UserTable::new("world");
        table
            .create_user("Steve")
            .unwrap()
            .add_permission(PermissionEntry::with_expiry("fly", Some(10)));
        table.create_user("Alex").unwrap();
        table.mark_synced(1);

        assert_eq!(table.purge_expired(20), vec!["Steve".to_string()]);
        assert!(table.is_changed());
        assert!(table.purge_expired(20).is_empty());
    }

    #[test]
    fn test_remove_user() {
        let mut table = UserTable::new("world");
        table.create_user("Steve").unwrap();
        assert!(table.remove_user("steve").is_ok());
        assert!(matches!(
            table.remove_user("steve"),
            Err(CoreError::UnknownUser { .. })
        ));
    }
}
