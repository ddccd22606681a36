// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! YAML persistence source.
//!
//! # Layout
//!
//! ```text
//! <scopes>/<scope>/groups.yml
//! <scopes>/<scope>/users.yml
//! <backup>/bkp_<scope>_g_<time>.yml
//! <global groups file>
//! ```
//!
//! # Sync protocol
//!
//! Each table carries a `changed` flag and the file timestamp it was last
//! loaded from or written to. [`SyncAction::decide`] compares these with the
//! file on disk:
//!
//! | changed | overwrite | disk vs. known     | action   |
//! |---------|-----------|--------------------|----------|
//! | yes     | yes       | any                | save     |
//! | yes     | no        | disk <= known      | save     |
//! | yes     | no        | disk > known       | conflict |
//! | no      | any       | disk > known       | reload   |
//! | no      | any       | disk <= known      | nothing  |
//!
//! Every save that replaces an existing file backs it up first.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLockUpgradableReadGuard;
use tracing::{debug, info};
use ward_core::{
    GlobalGroups, GroupTable, ScopeData, SyncState, TableKind, UserTable, GLOBAL_SCOPE,
};

use crate::codec;
use crate::error::{LoadReport, StoreError, StoreResult};
use crate::fs::{backup_file, file_timestamp, is_missing_or_empty, write_atomic};

/// File name of a scope's groups document.
pub const GROUPS_FILE: &str = "groups.yml";

/// File name of a scope's users document.
pub const USERS_FILE: &str = "users.yml";

// =============================================================================
// SyncAction
// =============================================================================

/// What the sync protocol does with one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Write the in-memory table.
    Save,
    /// Refuse to write; the file is newer than the changed table.
    Conflict,
    /// Replace the in-memory table from the newer file.
    Reload,
    /// Nothing to do.
    Nothing,
}

impl SyncAction {
    /// Decides the action for a table in `state` whose file was last
    /// modified at `on_disk` (0 if missing).
    pub fn decide(state: SyncState, on_disk: i64, overwrite: bool) -> Self {
        if state.is_changed() {
            if overwrite || state.timestamp() >= on_disk {
                SyncAction::Save
            } else {
                SyncAction::Conflict
            }
        } else if on_disk > state.timestamp() {
            SyncAction::Reload
        } else {
            SyncAction::Nothing
        }
    }
}

/// Outcome of syncing one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Neither side changed.
    Unchanged,
    /// The table was written.
    Saved,
    /// The table was reloaded from a newer file.
    Reloaded(LoadReport),
}

// =============================================================================
// YamlSource
// =============================================================================

/// Reads and writes scope documents under a data directory.
#[derive(Debug, Clone)]
pub struct YamlSource {
    scopes_path: PathBuf,
    backup_path: PathBuf,
    global_groups_path: PathBuf,
}

impl YamlSource {
    /// Creates a source.
    pub fn new(
        scopes_path: impl Into<PathBuf>,
        backup_path: impl Into<PathBuf>,
        global_groups_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scopes_path: scopes_path.into(),
            backup_path: backup_path.into(),
            global_groups_path: global_groups_path.into(),
        }
    }

    /// Returns the directory holding one folder per scope.
    pub fn scopes_path(&self) -> &Path {
        &self.scopes_path
    }

    /// Returns the backup directory.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Returns the global groups document path.
    pub fn global_groups_path(&self) -> &Path {
        &self.global_groups_path
    }

    /// Returns the folder of `scope`. Folder names are lowercase.
    pub fn scope_dir(&self, scope: &str) -> PathBuf {
        self.scopes_path.join(scope.to_lowercase())
    }

    /// Returns the groups document path of `scope`.
    pub fn groups_file(&self, scope: &str) -> PathBuf {
        self.scope_dir(scope).join(GROUPS_FILE)
    }

    /// Returns the users document path of `scope`.
    pub fn users_file(&self, scope: &str) -> PathBuf {
        self.scope_dir(scope).join(USERS_FILE)
    }

    /// Returns `true` if the folder of `scope` exists.
    pub fn scope_dir_exists(&self, scope: &str) -> bool {
        self.scope_dir(scope).is_dir()
    }

    // =========================================================================
    // Folders
    // =========================================================================

    /// Lists the non-hidden scope folders, lowercased and sorted.
    pub fn discover_scopes(&self) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(&self.scopes_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.scopes_path, e)),
        };

        let mut scopes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.scopes_path, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_lowercase) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            scopes.push(name);
        }
        scopes.sort();
        scopes.dedup();
        Ok(scopes)
    }

    fn find_legacy_dir(&self, scope: &str) -> StoreResult<Option<PathBuf>> {
        let entries = match fs::read_dir(&self.scopes_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.scopes_path, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.scopes_path, e))?;
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.eq_ignore_ascii_case(scope));
            if matches && entry.path().is_dir() {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    /// Prepares the folder of `scope`.
    ///
    /// A folder whose name differs only in case is renamed to lowercase.
    /// Each half that is not mirrored gets a template document if its file
    /// is missing or empty.
    pub fn init_scope(
        &self,
        scope: &str,
        groups_mirrored: bool,
        users_mirrored: bool,
    ) -> StoreResult<()> {
        let dir = self.scope_dir(scope);
        if !dir.is_dir() {
            match self.find_legacy_dir(scope)? {
                Some(legacy) => {
                    fs::rename(&legacy, &dir).map_err(|e| StoreError::io(&legacy, e))?;
                    info!(
                        from = %legacy.display(),
                        to = %dir.display(),
                        "Renamed scope folder to lowercase"
                    );
                }
                None => {
                    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
                    debug!(scope = %scope, "Created scope folder");
                }
            }
        }

        if !groups_mirrored {
            let path = dir.join(GROUPS_FILE);
            if is_missing_or_empty(&path) {
                write_atomic(&path, codec::GROUPS_TEMPLATE)?;
                info!(scope = %scope, "Created groups document from template");
            }
        }
        if !users_mirrored {
            let path = dir.join(USERS_FILE);
            if is_missing_or_empty(&path) {
                write_atomic(&path, codec::USERS_TEMPLATE)?;
                info!(scope = %scope, "Created users document from template");
            }
        }
        Ok(())
    }

    /// Creates the global groups document if it is missing or empty.
    pub fn init_global(&self) -> StoreResult<()> {
        if is_missing_or_empty(&self.global_groups_path) {
            write_atomic(&self.global_groups_path, codec::GLOBAL_GROUPS_TEMPLATE)?;
            info!(path = %self.global_groups_path.display(), "Created global groups document");
        }
        Ok(())
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Loads the group table of `scope` into a fresh staging table.
    pub fn load_groups_table(
        &self,
        scope: &str,
        global: &GlobalGroups,
    ) -> StoreResult<(GroupTable, LoadReport)> {
        let path = self.groups_file(scope);
        let timestamp = file_timestamp(&path)?;
        let text = read_document(&path)?;
        let (mut table, report) = codec::decode_groups(&text, &path, scope, &global.read())?;
        table.mark_synced(timestamp);
        Ok((table, report))
    }

    /// Loads the user table of `scope` into a fresh staging table.
    ///
    /// `groups` is the scope's group table, already loaded.
    pub fn load_users_table(
        &self,
        scope: &str,
        groups: &GroupTable,
        global: &GlobalGroups,
    ) -> StoreResult<(UserTable, LoadReport)> {
        let path = self.users_file(scope);
        let timestamp = file_timestamp(&path)?;
        let text = read_document(&path)?;
        let (mut table, report) =
            codec::decode_users(&text, &path, scope, groups, &global.read())?;
        table.mark_synced(timestamp);
        Ok((table, report))
    }

    /// Loads the global group table.
    pub fn load_global_table(&self) -> StoreResult<(GroupTable, LoadReport)> {
        let path = &self.global_groups_path;
        let timestamp = file_timestamp(path)?;
        let text = read_document(path)?;
        let (mut table, report) = codec::decode_global_groups(&text, path)?;
        table.mark_synced(timestamp);
        Ok((table, report))
    }

    /// Reloads the group table of a scope. On error the live table is kept.
    pub fn reload_groups(
        &self,
        data: &ScopeData,
        global: &GlobalGroups,
    ) -> StoreResult<LoadReport> {
        let (table, report) = self.load_groups_table(data.name(), global)?;
        data.replace_groups(table);
        info!(scope = %data.name(), "Reloaded groups");
        Ok(report)
    }

    /// Reloads the user table of a scope against its current groups.
    pub fn reload_users(&self, data: &ScopeData, global: &GlobalGroups) -> StoreResult<LoadReport> {
        let (table, report) = {
            let groups = data.groups().read();
            self.load_users_table(data.name(), &groups, global)?
        };
        data.replace_users(table);
        info!(scope = %data.name(), "Reloaded users");
        Ok(report)
    }

    /// Reloads the global group table. On error the live table is kept.
    pub fn reload_global(&self, global: &GlobalGroups) -> StoreResult<LoadReport> {
        let (table, report) = self.load_global_table()?;
        global.replace(table);
        info!("Reloaded global groups");
        Ok(report)
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Writes the group table of a scope.
    ///
    /// Writers are held off for the whole pass; readers are not.
    pub fn save_groups(&self, data: &ScopeData) -> StoreResult<()> {
        let path = self.groups_file(data.name());
        self.write_groups(&path, data.groups().upgradable_read())?;
        debug!(scope = %data.name(), path = %path.display(), "Saved groups");
        Ok(())
    }

    /// Writes the user table of a scope.
    pub fn save_users(&self, data: &ScopeData) -> StoreResult<()> {
        let path = self.users_file(data.name());
        self.write_users(&path, data, data.users().upgradable_read())?;
        debug!(scope = %data.name(), path = %path.display(), "Saved users");
        Ok(())
    }

    /// Writes the global group table.
    pub fn save_global(&self, global: &GlobalGroups) -> StoreResult<()> {
        let path = &self.global_groups_path;
        self.write_global(path, global.lock().upgradable_read())?;
        debug!(path = %path.display(), "Saved global groups");
        Ok(())
    }

    fn write_groups(
        &self,
        path: &Path,
        table: RwLockUpgradableReadGuard<'_, GroupTable>,
    ) -> StoreResult<()> {
        let text = codec::encode_groups(&table)?;
        write_atomic(path, &text)?;
        let timestamp = file_timestamp(path)?;
        RwLockUpgradableReadGuard::upgrade(table).mark_synced(timestamp);
        Ok(())
    }

    fn write_users(
        &self,
        path: &Path,
        data: &ScopeData,
        table: RwLockUpgradableReadGuard<'_, UserTable>,
    ) -> StoreResult<()> {
        let default_group = data.groups().read().default_group_name().map(str::to_string);
        let text = codec::encode_users(&table, default_group.as_deref())?;
        write_atomic(path, &text)?;
        let timestamp = file_timestamp(path)?;
        RwLockUpgradableReadGuard::upgrade(table).mark_synced(timestamp);
        Ok(())
    }

    fn write_global(
        &self,
        path: &Path,
        table: RwLockUpgradableReadGuard<'_, GroupTable>,
    ) -> StoreResult<()> {
        let text = codec::encode_global_groups(&table)?;
        write_atomic(path, &text)?;
        let timestamp = file_timestamp(path)?;
        RwLockUpgradableReadGuard::upgrade(table).mark_synced(timestamp);
        Ok(())
    }

    /// Copies the current file aside, then checks it was not replaced
    /// while the copy was taken.
    fn backup_before_write(
        &self,
        path: &Path,
        scope: &str,
        kind: TableKind,
        known: i64,
        overwrite: bool,
    ) -> StoreResult<()> {
        if path.is_file() {
            backup_file(path, &self.backup_path, scope, kind)?;
        }
        if !overwrite && file_timestamp(path)? > known {
            return Err(StoreError::conflict(scope, kind, path));
        }
        Ok(())
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Applies the sync protocol to the group table of a scope.
    ///
    /// The table is held against writers from the decision through the
    /// write. A reload loads without holding it and swaps only if the table
    /// is still in the state the decision was based on; otherwise the
    /// in-memory edits are kept and [`SyncOutcome::Unchanged`] is returned.
    pub fn sync_groups(
        &self,
        data: &ScopeData,
        global: &GlobalGroups,
        overwrite: bool,
    ) -> StoreResult<SyncOutcome> {
        let scope = data.name();
        let path = self.groups_file(scope);
        let table = data.groups().upgradable_read();
        let state = table.sync_state();
        match SyncAction::decide(state, file_timestamp(&path)?, overwrite) {
            SyncAction::Save => {
                let known = state.timestamp();
                self.backup_before_write(&path, scope, TableKind::Groups, known, overwrite)?;
                self.write_groups(&path, table)?;
                debug!(scope = %scope, path = %path.display(), "Saved groups");
                Ok(SyncOutcome::Saved)
            }
            SyncAction::Conflict => Err(StoreError::conflict(scope, TableKind::Groups, path)),
            SyncAction::Reload => {
                drop(table);
                let (staged, report) = self.load_groups_table(scope, global)?;
                if !data.replace_groups_if(staged, state) {
                    debug!(scope = %scope, "Groups changed during reload, keeping them");
                    return Ok(SyncOutcome::Unchanged);
                }
                info!(scope = %scope, "Reloaded groups");
                Ok(SyncOutcome::Reloaded(report))
            }
            SyncAction::Nothing => Ok(SyncOutcome::Unchanged),
        }
    }

    /// Applies the sync protocol to the user table of a scope.
    pub fn sync_users(
        &self,
        data: &ScopeData,
        global: &GlobalGroups,
        overwrite: bool,
    ) -> StoreResult<SyncOutcome> {
        let scope = data.name();
        let path = self.users_file(scope);
        let table = data.users().upgradable_read();
        let state = table.sync_state();
        match SyncAction::decide(state, file_timestamp(&path)?, overwrite) {
            SyncAction::Save => {
                let known = state.timestamp();
                self.backup_before_write(&path, scope, TableKind::Users, known, overwrite)?;
                self.write_users(&path, data, table)?;
                debug!(scope = %scope, path = %path.display(), "Saved users");
                Ok(SyncOutcome::Saved)
            }
            SyncAction::Conflict => Err(StoreError::conflict(scope, TableKind::Users, path)),
            SyncAction::Reload => {
                drop(table);
                let (staged, report) = {
                    let groups = data.groups().read();
                    self.load_users_table(scope, &groups, global)?
                };
                if !data.replace_users_if(staged, state) {
                    debug!(scope = %scope, "Users changed during reload, keeping them");
                    return Ok(SyncOutcome::Unchanged);
                }
                info!(scope = %scope, "Reloaded users");
                Ok(SyncOutcome::Reloaded(report))
            }
            SyncAction::Nothing => Ok(SyncOutcome::Unchanged),
        }
    }

    /// Applies the sync protocol to the global group table.
    pub fn sync_global(&self, global: &GlobalGroups, overwrite: bool) -> StoreResult<SyncOutcome> {
        let path = self.global_groups_path.clone();
        let table = global.lock().upgradable_read();
        let state = table.sync_state();
        match SyncAction::decide(state, file_timestamp(&path)?, overwrite) {
            SyncAction::Save => {
                self.backup_before_write(
                    &path,
                    GLOBAL_SCOPE,
                    TableKind::Groups,
                    state.timestamp(),
                    overwrite,
                )?;
                self.write_global(&path, table)?;
                debug!(path = %path.display(), "Saved global groups");
                Ok(SyncOutcome::Saved)
            }
            SyncAction::Conflict => {
                Err(StoreError::conflict(GLOBAL_SCOPE, TableKind::Groups, path))
            }
            SyncAction::Reload => {
                drop(table);
                let (staged, report) = self.load_global_table()?;
                if !global.replace_if(staged, state) {
                    debug!("Global groups changed during reload, keeping them");
                    return Ok(SyncOutcome::Unchanged);
                }
                info!("Reloaded global groups");
                Ok(SyncOutcome::Reloaded(report))
            }
            SyncAction::Nothing => Ok(SyncOutcome::Unchanged),
        }
    }
}

fn read_document(path: &Path) -> StoreResult<String> {
    fs::read_to_string(path).map_err(|e| StoreError::io(path, e))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use ward_core::{GroupRef, PermissionEntry};

    fn setup() -> (TempDir, YamlSource, GlobalGroups) {
        let dir = tempfile::tempdir().unwrap();
        let source = YamlSource::new(
            dir.path().join("scopes"),
            dir.path().join("backup"),
            dir.path().join("GlobalGroups.yml"),
        );
        source.init_global().unwrap();
        let global = GlobalGroups::new();
        source.reload_global(&global).unwrap();
        (dir, source, global)
    }

    fn loaded_scope(source: &YamlSource, global: &GlobalGroups, name: &str) -> ScopeData {
        source.init_scope(name, false, false).unwrap();
        let data = ScopeData::new(name);
        source.reload_groups(&data, global).unwrap();
        source.reload_users(&data, global).unwrap();
        data
    }

    fn state(changed: bool, timestamp: i64) -> SyncState {
        let mut table = GroupTable::new("t");
        table.mark_synced(timestamp);
        if changed {
            table.mark_changed();
        }
        table.sync_state()
    }

    #[test]
    fn test_sync_action_table() {
        assert_eq!(SyncAction::decide(state(true, 10), 20, true), SyncAction::Save);
        assert_eq!(SyncAction::decide(state(true, 20), 20, false), SyncAction::Save);
        assert_eq!(SyncAction::decide(state(true, 10), 20, false), SyncAction::Conflict);
        assert_eq!(SyncAction::decide(state(false, 10), 20, false), SyncAction::Reload);
        assert_eq!(SyncAction::decide(state(false, 20), 20, true), SyncAction::Nothing);
        assert_eq!(SyncAction::decide(state(true, 0), 0, false), SyncAction::Save);
    }

    #[test]
    fn test_init_scope_writes_templates() {
        let (_dir, source, global) = setup();
        let data = loaded_scope(&source, &global, "World");

        assert!(source.scope_dir_exists("world"));
        assert_eq!(data.default_group_name().unwrap(), "Default");
        assert!(data.users().read().is_empty());
        assert!(!data.groups().read().is_changed());
        assert!(data.groups().read().timestamp() > 0);
    }

    #[test]
    fn test_init_scope_skips_mirrored_halves() {
        let (_dir, source, _global) = setup();
        source.init_scope("nether", true, false).unwrap();
        assert!(!source.groups_file("nether").exists());
        assert!(source.users_file("nether").exists());
    }

    #[test]
    fn test_init_scope_renames_legacy_folder() {
        let (_dir, source, _global) = setup();
        let legacy = source.scopes_path().join("MyWorld");
        fs::create_dir_all(&legacy).unwrap();
        fs::write(legacy.join(USERS_FILE), "users: {}\n").unwrap();

        source.init_scope("MyWorld", false, false).unwrap();

        let names = source.discover_scopes().unwrap();
        assert_eq!(names, vec!["myworld".to_string()]);
        assert!(source.users_file("myworld").exists());
    }

    #[test]
    fn test_discover_scopes_ignores_hidden_and_files() {
        let (_dir, source, _global) = setup();
        fs::create_dir_all(source.scopes_path().join(".git")).unwrap();
        fs::create_dir_all(source.scopes_path().join("b")).unwrap();
        fs::create_dir_all(source.scopes_path().join("a")).unwrap();
        fs::write(source.scopes_path().join("notes.txt"), "x").unwrap();
        assert_eq!(source.discover_scopes().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_changed_users_are_saved() {
        let (_dir, source, global) = setup();
        let data = loaded_scope(&source, &global, "world");

        data.create_user("steve").unwrap();
        data.update_user("steve", |u| u.add_permission(PermissionEntry::parse("fly")))
            .unwrap();

        let outcome = source.sync_users(&data, &global, false).unwrap();
        assert_eq!(outcome, SyncOutcome::Saved);
        assert!(!data.users().read().is_changed());

        let text = fs::read_to_string(source.users_file("world")).unwrap();
        assert!(text.contains("steve"));
        assert!(text.contains("fly"));
        assert_eq!(fs::read_dir(source.backup_path()).unwrap().count(), 1);
    }

    #[test]
    fn test_changed_users_conflict_with_newer_file() {
        let (_dir, source, global) = setup();
        let data = loaded_scope(&source, &global, "world");
        let path = source.users_file("world");
        let before = fs::read_to_string(&path).unwrap();

        data.create_user("steve").unwrap();
        data.update_user("steve", |u| u.last_name = "Steven".to_string())
            .unwrap();
        {
            let mut users = data.users().write();
            let old = users.timestamp() - 10_000;
            users.mark_synced(old);
            users.mark_changed();
        }

        let err = source.sync_users(&data, &global, false).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(data.users().read().is_changed());

        // overwrite forces the write and keeps a backup
        assert_eq!(
            source.sync_users(&data, &global, true).unwrap(),
            SyncOutcome::Saved
        );
        assert!(fs::read_to_string(&path).unwrap().contains("Steven"));
        assert!(source.backup_path().is_dir());
    }

    #[test]
    fn test_unchanged_users_reload_from_newer_file() {
        let (_dir, source, global) = setup();
        let data = loaded_scope(&source, &global, "world");

        fs::write(
            source.users_file("world"),
            "users:\n  alex:\n    group: Default\n    permissions: [build]\n",
        )
        .unwrap();
        data.users().write().mark_synced(1);

        let outcome = source.sync_users(&data, &global, false).unwrap();
        assert!(matches!(outcome, SyncOutcome::Reloaded(_)));
        let alex = data.get_user("alex").unwrap();
        assert_eq!(alex.primary_group(), Some(&GroupRef::local("Default")));
        assert!(alex.permissions.contains("build"));
    }

    #[test]
    fn test_failed_reload_keeps_live_table() {
        let (_dir, source, global) = setup();
        let data = loaded_scope(&source, &global, "world");
        data.create_group("Builder").unwrap();

        fs::write(source.groups_file("world"), "groups:\n  A: {}\n").unwrap();
        let err = source.reload_groups(&data, &global).unwrap_err();
        assert!(matches!(err, StoreError::MissingRequiredSection { .. }));
        assert!(data.get_group("Builder").is_some());
    }

    #[test]
    fn test_global_groups_sync() {
        let (_dir, source, global) = setup();
        global.create_group("Mods").unwrap();

        assert_eq!(source.sync_global(&global, false).unwrap(), SyncOutcome::Saved);
        assert!(fs::read_to_string(source.global_groups_path())
            .unwrap()
            .contains("g:Mods"));
        assert_eq!(
            source.sync_global(&global, false).unwrap(),
            SyncOutcome::Unchanged
        );
    }
}
