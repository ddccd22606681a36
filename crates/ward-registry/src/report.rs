// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Results of a save pass.
//!
//! Each table is synced on its own. A conflict or I/O failure on one table
//! is recorded and the pass continues with the next, so one stale scope
//! never blocks the others from being written.

use ward_core::TableKind;
use ward_store::{StoreError, SyncOutcome};

use crate::error::RegistryError;

/// Sync result of one table.
#[derive(Debug)]
pub struct TableSync {
    /// Scope owning the table, or `global`.
    pub scope: String,
    /// Which table.
    pub table: TableKind,
    /// What happened.
    pub result: Result<SyncOutcome, StoreError>,
}

impl TableSync {
    /// Returns `true` if the table was written or reloaded.
    pub fn changed(&self) -> bool {
        matches!(
            self.result,
            Ok(SyncOutcome::Saved) | Ok(SyncOutcome::Reloaded(_))
        )
    }

    /// Returns `true` if the table was reloaded.
    pub fn reloaded(&self) -> bool {
        matches!(self.result, Ok(SyncOutcome::Reloaded(_)))
    }
}

/// Aggregate result of [`ScopeRegistry::save_changes`](crate::ScopeRegistry::save_changes).
#[derive(Debug, Default)]
pub struct SyncReport {
    entries: Vec<TableSync>,
}

impl SyncReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a table result.
    pub fn push(
        &mut self,
        scope: impl Into<String>,
        table: TableKind,
        result: Result<SyncOutcome, StoreError>,
    ) {
        self.entries.push(TableSync {
            scope: scope.into(),
            table,
            result,
        });
    }

    /// Returns all table results in sync order.
    pub fn entries(&self) -> &[TableSync] {
        &self.entries
    }

    /// Returns the result for one table.
    pub fn get(&self, scope: &str, table: TableKind) -> Option<&TableSync> {
        self.entries
            .iter()
            .find(|e| e.table == table && e.scope.eq_ignore_ascii_case(scope))
    }

    /// Returns `true` if any table was written or reloaded.
    pub fn changed(&self) -> bool {
        self.entries.iter().any(TableSync::changed)
    }

    /// Iterates over failed tables.
    pub fn failures(&self) -> impl Iterator<Item = &TableSync> {
        self.entries.iter().filter(|e| e.result.is_err())
    }

    /// Iterates over tables that were refused because of a newer file.
    pub fn conflicts(&self) -> impl Iterator<Item = &TableSync> {
        self.entries
            .iter()
            .filter(|e| matches!(&e.result, Err(err) if err.is_conflict()))
    }

    /// Returns `true` if no table failed.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Returns the first failure as an error, or the report itself.
    pub fn into_result(mut self) -> Result<Self, RegistryError> {
        let Some(index) = self.entries.iter().position(|e| e.result.is_err()) else {
            return Ok(self);
        };
        match self.entries.swap_remove(index).result {
            Err(err) => Err(err.into()),
            Ok(_) => Ok(self),
        }
    }
}
