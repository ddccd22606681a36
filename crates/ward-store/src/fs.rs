// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! File helpers: atomic replace, modification timestamps and backups.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use tempfile::NamedTempFile;
use ward_core::TableKind;

use crate::error::{StoreError, StoreResult};

/// Writes `contents` to `path` through a temporary file in the same
/// directory, then renames it into place.
///
/// Readers see either the previous document or the new one, never a
/// truncated file.
pub fn write_atomic(path: &Path, contents: &str) -> StoreResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Returns the modification time of `path` in epoch millis, or 0 if the
/// file does not exist.
pub fn file_timestamp(path: &Path) -> StoreResult<i64> {
    match fs::metadata(path) {
        Ok(meta) => {
            let modified = meta.modified().map_err(|e| StoreError::io(path, e))?;
            Ok(DateTime::<Utc>::from(modified).timestamp_millis())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Returns `true` if `path` is missing or has no content.
pub fn is_missing_or_empty(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true)
}

/// Builds the backup file name for a scope table.
///
/// `bkp_<scope>_g_<timestamp>.yml` for groups, `_u_` for users. The
/// timestamp has millisecond precision.
pub fn backup_name(scope: &str, kind: TableKind, at: DateTime<Local>) -> String {
    let tag = match kind {
        TableKind::Groups => "g",
        TableKind::Users => "u",
    };
    format!(
        "bkp_{}_{}_{}.yml",
        scope,
        tag,
        at.format("%Y-%m-%d-%H-%M-%S-%3f")
    )
}

/// Copies `source` into `backup_dir` under a timestamped name.
///
/// A name already taken gets a numeric suffix, so no earlier backup is
/// ever replaced. Returns the path of the copy.
pub fn backup_file(
    source: &Path,
    backup_dir: &Path,
    scope: &str,
    kind: TableKind,
) -> StoreResult<PathBuf> {
    fs::create_dir_all(backup_dir).map_err(|e| StoreError::io(backup_dir, e))?;
    let name = backup_name(scope, kind, Local::now());
    let mut target = backup_dir.join(&name);
    let mut n = 1;
    while target.exists() {
        let stem = name.trim_end_matches(".yml");
        target = backup_dir.join(format!("{}_{}.yml", stem, n));
        n += 1;
    }
    fs::copy(source, &target).map_err(|e| StoreError::io(source, e))?;
    tracing::debug!(
        source = %source.display(),
        backup = %target.display(),
        "Backed up document"
    );
    Ok(target)
}
