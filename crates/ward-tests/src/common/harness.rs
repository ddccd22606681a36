// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! A temporary data tree laid out the way ward expects:
//!
//! ```text
//! <tmp>/
//! ├── GlobalGroups.yml
//! ├── backup/
//! └── scopes/
//!     └── <scope>/{groups.yml, users.yml}
//! ```
//!
//! The tree is removed when the harness is dropped.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use ward_core::StaticHost;
use ward_registry::{ScopeRegistry, ScopeRegistryBuilder};
use ward_store::{YamlSource, GROUPS_FILE, USERS_FILE};

use super::mocks::RecordingNotifier;

// =============================================================================
// Test Harness
// =============================================================================

/// Temporary data tree plus the collaborators a registry needs.
pub struct TestHarness {
    dir: TempDir,
    host: Arc<StaticHost>,
    notifier: Arc<RecordingNotifier>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Creates an empty data tree whose host reports no active scopes.
    pub fn new() -> Self {
        Self::with_active_scopes(Vec::<String>::new())
    }

    /// Creates an empty data tree whose host reports `scopes` as active.
    pub fn with_active_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        super::init_test_logging();
        Self {
            dir: super::temp_test_dir("ward_test_"),
            host: Arc::new(StaticHost::new(scopes)),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// Returns the data root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the scopes directory.
    pub fn scopes_path(&self) -> PathBuf {
        self.root().join("scopes")
    }

    /// Returns the backup directory.
    pub fn backup_path(&self) -> PathBuf {
        self.root().join("backup")
    }

    /// Returns the global groups document path.
    pub fn global_path(&self) -> PathBuf {
        self.root().join("GlobalGroups.yml")
    }

    /// Returns the groups document path of `scope`.
    pub fn groups_path(&self, scope: &str) -> PathBuf {
        self.scopes_path().join(scope).join(GROUPS_FILE)
    }

    /// Returns the users document path of `scope`.
    pub fn users_path(&self, scope: &str) -> PathBuf {
        self.scopes_path().join(scope).join(USERS_FILE)
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    /// Returns a persistence source over this tree.
    pub fn source(&self) -> YamlSource {
        YamlSource::new(self.scopes_path(), self.backup_path(), self.global_path())
    }

    /// Returns a registry builder wired to this tree, host and notifier.
    pub fn registry(&self) -> ScopeRegistryBuilder {
        ScopeRegistry::builder(self.source())
            .host(self.host.clone())
            .notifier(self.notifier.clone())
    }

    /// Builds and loads a registry with the stock scope names.
    pub fn loaded_registry(&self) -> ScopeRegistry {
        let registry = self.registry().build().expect("Failed to build registry");
        registry.reset().expect("Failed to load registry");
        registry
    }

    /// Returns the host.
    pub fn host(&self) -> &StaticHost {
        &self.host
    }

    /// Returns the recording notifier.
    pub fn notifier(&self) -> &RecordingNotifier {
        &self.notifier
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Writes the groups document of `scope`.
    pub fn write_groups(&self, scope: &str, text: &str) {
        write_file(&self.groups_path(scope), text);
    }

    /// Writes the users document of `scope`.
    pub fn write_users(&self, scope: &str, text: &str) {
        write_file(&self.users_path(scope), text);
    }

    /// Writes the global groups document.
    pub fn write_global(&self, text: &str) {
        write_file(&self.global_path(), text);
    }

    /// Rewrites `path` as another process would, leaving it with a
    /// modification time clearly after anything loaded so far.
    pub fn edit_externally(&self, path: &Path, text: &str) {
        write_file(path, text);
        let later = SystemTime::now() + Duration::from_secs(60);
        File::options()
            .write(true)
            .open(path)
            .and_then(|f| f.set_modified(later))
            .expect("Failed to set modification time");
    }

    /// Reads a file.
    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).expect("Failed to read file")
    }

    /// Returns the files in the backup directory, sorted.
    pub fn backups(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.backup_path()) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        files.sort();
        files
    }
}

fn write_file(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, text).expect("Failed to write file");
}
