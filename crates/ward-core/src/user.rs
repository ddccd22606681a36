// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Users and their group memberships.

use crate::group::GroupRef;
use crate::permission::{PermissionEntry, PermissionSet};
use crate::variables::VariableStore;

/// A secondary group membership, optionally time limited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGroup {
    /// The referenced group.
    pub group: GroupRef,
    /// Expiry in epoch milliseconds, if any.
    pub expires_at: Option<i64>,
}

impl SubGroup {
    /// Creates a permanent membership.
    pub fn new(group: GroupRef) -> Self {
        Self {
            group,
            expires_at: None,
        }
    }

    /// Creates a membership that ends at `expires_at`.
    pub fn timed(group: GroupRef, expires_at: i64) -> Self {
        Self {
            group,
            expires_at: Some(expires_at),
        }
    }

    /// Returns `true` once the expiry has been reached.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// A user of one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: String,
    /// Last display name the host reported for this user.
    pub last_name: String,
    /// The user's own permissions, in priority order.
    pub permissions: PermissionSet,
    /// User metadata.
    pub variables: VariableStore,
    primary_group: Option<GroupRef>,
    sub_groups: Vec<SubGroup>,
}

impl User {
    /// Creates a user with no data; the display name starts as the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            last_name: id.clone(),
            id,
            permissions: PermissionSet::new(),
            variables: VariableStore::new(),
            primary_group: None,
            sub_groups: Vec::new(),
        }
    }

    /// Returns the stable identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the lowercase lookup key.
    pub fn key(&self) -> String {
        self.id.to_ascii_lowercase()
    }

    /// Returns the explicit primary group, if one is set.
    ///
    /// `None` means the scope's default group applies.
    pub fn primary_group(&self) -> Option<&GroupRef> {
        self.primary_group.as_ref()
    }

    /// Sets or clears the explicit primary group.
    pub fn set_primary_group(&mut self, group: Option<GroupRef>) {
        self.primary_group = group;
    }

    /// Returns the sub-groups in the order they were added.
    pub fn sub_groups(&self) -> &[SubGroup] {
        &self.sub_groups
    }

    /// Adds a sub-group, replacing the expiry of an existing membership.
    ///
    /// Returns `true` if anything changed.
    pub fn add_sub_group(&mut self, sub: SubGroup) -> bool {
        if let Some(existing) = self
            .sub_groups
            .iter_mut()
            .find(|s| s.group.same_as(&sub.group))
        {
            if existing.expires_at == sub.expires_at {
                return false;
            }
            existing.expires_at = sub.expires_at;
            return true;
        }
        self.sub_groups.push(sub);
        true
    }

    /// Removes a sub-group membership. Returns `true` if it existed.
    pub fn remove_sub_group(&mut self, group: &GroupRef) -> bool {
        let before = self.sub_groups.len();
        self.sub_groups.retain(|s| !s.group.same_as(group));
        self.sub_groups.len() != before
    }

    /// Iterates over sub-groups that are not expired at `now`.
    pub fn active_sub_groups(&self, now: i64) -> impl Iterator<Item = &SubGroup> {
        self.sub_groups.iter().filter(move |s| !s.is_expired(now))
    }

    /// Adds a permission entry. Returns `true` if the set changed.
    pub fn add_permission(&mut self, entry: PermissionEntry) -> bool {
        self.permissions.add(entry)
    }

    /// Drops expired permissions and sub-groups.
    ///
    /// Returns `true` if anything was removed.
    pub fn purge_expired(&mut self, now: i64) -> bool {
        let permissions = self.permissions.purge_expired(now);
        let before = self.sub_groups.len();
        self.sub_groups.retain(|s| !s.is_expired(now));
        permissions || self.sub_groups.len() != before
    }

    /// Returns `true` if the user carries nothing beyond default membership.
    ///
    /// `default_group` is the scope's default group name.
    pub fn is_sparse(&self, default_group: &str) -> bool {
        let primary_is_default = match &self.primary_group {
            None => true,
            Some(GroupRef::Local(name)) => name.eq_ignore_ascii_case(default_group),
            Some(GroupRef::Global(_)) => false,
        };
        primary_is_default
            && self.permissions.is_empty()
            && self.variables.is_empty()
            && self.sub_groups.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_groups_keep_order_and_update_expiry() {
        let mut user = User::new("Steve");
        assert!(user.add_sub_group(SubGroup::new(GroupRef::local("b"))));
        assert!(user.add_sub_group(SubGroup::timed(GroupRef::local("a"), 50)));
        assert!(user.add_sub_group(SubGroup::timed(GroupRef::local("B"), 10)));
        assert!(!user.add_sub_group(SubGroup::timed(GroupRef::local("b"), 10)));

        let names: Vec<&str> = user.sub_groups().iter().map(|s| s.group.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(user.active_sub_groups(20).count(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let mut user = User::new("Steve");
        user.add_sub_group(SubGroup::timed(GroupRef::local("vip"), 100));
        user.add_permission(PermissionEntry::with_expiry("fly", Some(100)));

        assert!(!user.purge_expired(50));
        assert!(user.purge_expired(100));
        assert!(user.sub_groups().is_empty());
        assert!(user.permissions.is_empty());
        assert!(!user.purge_expired(200));
    }

    #[test]
    fn test_is_sparse() {
        let mut user = User::new("Steve");
        assert!(user.is_sparse("Default"));
        user.set_primary_group(Some(GroupRef::local("default")));
        assert!(user.is_sparse("Default"));
        user.set_primary_group(Some(GroupRef::local("Admin")));
        assert!(!user.is_sparse("Default"));
        user.set_primary_group(None);
        user.add_permission(PermissionEntry::parse("fly"));
        assert!(!user.is_sparse("Default"));
    }
}
