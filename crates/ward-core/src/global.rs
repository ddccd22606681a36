// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Global group registry.
//!
//! Groups in the global namespace are shared by every scope. They are
//! stored without the `g:` prefix; the persisted document writes it back.
//! The registry is an explicit object handed to whoever needs it; there is
//! no process-wide instance.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::CoreResult;
use crate::group::{Group, GroupRef};
use crate::tables::{GroupTable, SyncState};

/// Scope label used for the global group table.
pub const GLOBAL_SCOPE: &str = "global";

/// Scope-independent group table behind its own lock.
#[derive(Debug)]
pub struct GlobalGroups {
    table: RwLock<GroupTable>,
}

impl Default for GlobalGroups {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalGroups {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(GroupTable::new(GLOBAL_SCOPE)),
        }
    }

    /// Creates a registry from a loaded table.
    pub fn from_table(table: GroupTable) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    /// Acquires the table for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, GroupTable> {
        self.table.read()
    }

    /// Acquires the table for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, GroupTable> {
        self.table.write()
    }

    /// Returns the underlying lock, for callers that need upgradable access.
    pub fn lock(&self) -> &RwLock<GroupTable> {
        &self.table
    }

    /// Returns a copy of a global group. A leading `g:` is ignored.
    pub fn get(&self, name: &str) -> Option<Group> {
        let name = GroupRef::global(name);
        self.table.read().get(name.name()).cloned()
    }

    /// Returns `true` if the global group exists.
    pub fn contains(&self, name: &str) -> bool {
        let name = GroupRef::global(name);
        self.table.read().contains(name.name())
    }

    /// Creates an empty global group.
    pub fn create_group(&self, name: &str) -> CoreResult<()> {
        let name = GroupRef::global(name);
        self.table.write().create_group(name.name()).map(|_| ())
    }

    /// Replaces the whole table with a fully loaded one.
    pub fn replace(&self, staged: GroupTable) {
        *self.table.write() = staged;
    }

    /// Replaces the table only if it is still in `expected` state.
    pub fn replace_if(&self, staged: GroupTable, expected: SyncState) -> bool {
        let mut table = self.table.write();
        if table.sync_state() != expected {
            return false;
        }
        *table = staged;
        true
    }
}
