// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Groups and group references.
//!
//! A group is referenced by name, never by pointer: inheritance lists, user
//! primary groups and sub-groups all hold a [`GroupRef`] that is looked up
//! each time it is needed. Renaming or deleting a group can therefore only
//! leave a dangling name behind, which resolution reports as a diagnostic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::permission::{PermissionEntry, PermissionSet};
use crate::variables::VariableStore;

/// Prefix that marks a reference into the global group namespace.
pub const GLOBAL_PREFIX: &str = "g:";

// =============================================================================
// GroupRef
// =============================================================================

/// A reference to a group by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupRef {
    /// A group in the same scope. Lookup falls back to the global namespace
    /// when the scope has no group of that name.
    Local(String),
    /// A group in the global namespace only.
    Global(String),
}

impl GroupRef {
    /// Parses a reference, recognising the `g:` prefix case-insensitively.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.len() >= GLOBAL_PREFIX.len()
            && text.is_char_boundary(GLOBAL_PREFIX.len())
            && text[..GLOBAL_PREFIX.len()].eq_ignore_ascii_case(GLOBAL_PREFIX)
        {
            GroupRef::Global(text[GLOBAL_PREFIX.len()..].to_string())
        } else {
            GroupRef::Local(text.to_string())
        }
    }

    /// Creates a local reference.
    pub fn local(name: impl Into<String>) -> Self {
        GroupRef::Local(name.into())
    }

    /// Creates a global reference. A leading `g:` is stripped.
    pub fn global(name: impl Into<String>) -> Self {
        match GroupRef::parse(&name.into()) {
            GroupRef::Local(n) | GroupRef::Global(n) => GroupRef::Global(n),
        }
    }

    /// Returns the group name without any prefix.
    pub fn name(&self) -> &str {
        match self {
            GroupRef::Local(n) | GroupRef::Global(n) => n,
        }
    }

    /// Returns `true` for global references.
    pub fn is_global(&self) -> bool {
        matches!(self, GroupRef::Global(_))
    }

    /// Returns the persisted form (`name` or `g:name`).
    pub fn to_document(&self) -> String {
        match self {
            GroupRef::Local(n) => n.clone(),
            GroupRef::Global(n) => format!("{}{}", GLOBAL_PREFIX, n),
        }
    }

    /// Case-insensitive comparison of kind and name.
    pub fn same_as(&self, other: &GroupRef) -> bool {
        self.is_global() == other.is_global() && self.name().eq_ignore_ascii_case(other.name())
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_document())
    }
}

impl From<&str> for GroupRef {
    fn from(s: &str) -> Self {
        GroupRef::parse(s)
    }
}

// =============================================================================
// Group
// =============================================================================

/// A named group.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    name: String,
    /// Permissions granted or denied by this group, in priority order.
    pub permissions: PermissionSet,
    /// Metadata such as prefix, suffix and build flag.
    pub variables: VariableStore,
    inherits: Vec<GroupRef>,
}

impl Group {
    /// Creates a group with the default variables and no permissions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: PermissionSet::new(),
            variables: VariableStore::group_defaults(),
            inherits: Vec::new(),
        }
    }

    /// Returns the group name as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the lowercase lookup key.
    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Returns the directly inherited groups in declaration order.
    pub fn inherits(&self) -> &[GroupRef] {
        &self.inherits
    }

    /// Adds an inherited group unless it is already listed or is this group.
    ///
    /// Returns `true` if the list changed.
    pub fn add_inherits(&mut self, group: GroupRef) -> bool {
        if !group.is_global() && group.name().eq_ignore_ascii_case(&self.name) {
            return false;
        }
        if self.inherits.iter().any(|g| g.same_as(&group)) {
            return false;
        }
        self.inherits.push(group);
        true
    }

    /// Removes an inherited group. Returns `true` if it was listed.
    pub fn remove_inherits(&mut self, group: &GroupRef) -> bool {
        let before = self.inherits.len();
        self.inherits.retain(|g| !g.same_as(group));
        self.inherits.len() != before
    }

    /// Adds a permission entry. Returns `true` if the set changed.
    pub fn add_permission(&mut self, entry: PermissionEntry) -> bool {
        self.permissions.add(entry)
    }

    /// Drops expired permissions. Returns `true` if anything was removed.
    pub fn purge_expired(&mut self, now: i64) -> bool {
        self.permissions.purge_expired(now)
    }
}

// =============================================================================
// Tests
// =============================================================================
