// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `sync` and `purge` commands.

use tracing::info;
use ward_config::WardConfig;
use ward_registry::SyncReport;
use ward_store::SyncOutcome;

use crate::cli::SyncArgs;
use crate::commands::open_registry;
use crate::error::{BinError, BinResult};

/// Runs one save pass over the data tree.
pub fn sync(config: &WardConfig, args: SyncArgs) -> BinResult<()> {
    let registry = open_registry(config)?;
    let report = registry.save_changes(args.force || config.sync.overwrite);
    finish(&report)
}

/// Drops expired entries, then runs one save pass.
pub fn purge(config: &WardConfig, args: SyncArgs) -> BinResult<()> {
    let registry = open_registry(config)?;
    if registry.purge_expired_permissions() {
        info!("Expired entries removed");
    } else {
        println!("Nothing expired");
    }
    let report = registry.save_changes(args.force || config.sync.overwrite);
    finish(&report)
}

fn finish(report: &SyncReport) -> BinResult<()> {
    print_report(report);
    let failed = report.failures().count();
    if failed > 0 {
        return Err(BinError::SyncFailed { failed });
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    for entry in report.entries() {
        let status = match &entry.result {
            Ok(SyncOutcome::Unchanged) => continue,
            Ok(SyncOutcome::Saved) => "saved".to_string(),
            Ok(SyncOutcome::Reloaded(_)) => "reloaded (newer file on disk)".to_string(),
            Err(e) if e.is_conflict() => {
                "conflict: file changed on disk, rerun with --force to overwrite".to_string()
            }
            Err(e) => format!("failed: {}", e),
        };
        println!("{:<24} {:<7} {}", entry.scope, entry.table, status);
    }
    if !report.changed() && report.is_success() {
        println!("Everything up to date");
    }
}
