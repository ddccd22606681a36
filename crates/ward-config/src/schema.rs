// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for ward.
//!
//! # Schema Structure
//!
//! ```text
//! WardConfig
//! ├── data: DataConfig
//! ├── scopes: ScopesConfig
//! ├── mirrors: source scope -> MirrorSpec
//! ├── sync: SyncConfig
//! └── logging: LoggingConfig
//! ```
//!
//! # Mirrors
//!
//! A mirror entry names a source scope that owns data and the scopes that
//! reuse it. The flat form mirrors both tables:
//!
//! ```yaml
//! mirrors:
//!   world:
//!     - world_nether
//!     - world_the_end
//! ```
//!
//! The keyed form names, per target, which tables to mirror:
//!
//! ```yaml
//! mirrors:
//!   survival:
//!     creative: [groups]
//!     hardcore: [groups, users]
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Constants
// =============================================================================

/// Default data root directory.
pub const DEFAULT_DATA_ROOT: &str = "./data";

/// Default directory, relative to the data root, holding one folder per scope.
pub const DEFAULT_SCOPES_DIR: &str = "scopes";

/// Default directory, relative to the data root, receiving backups.
pub const DEFAULT_BACKUP_DIR: &str = "backup";

/// Default file name of the global groups document.
pub const DEFAULT_GLOBAL_GROUPS_FILE: &str = "GlobalGroups.yml";

/// Default name of the designated default scope.
pub const DEFAULT_SCOPE: &str = "world";

/// Default name of the catch-all scope.
pub const DEFAULT_CATCH_ALL_SCOPE: &str = "all_unnamed_scopes";

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for ward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardConfig {
    /// On-disk layout.
    #[serde(default)]
    pub data: DataConfig,

    /// Scope names.
    #[serde(default)]
    pub scopes: ScopesConfig,

    /// Mirror configuration keyed by source scope.
    #[serde(default)]
    pub mirrors: BTreeMap<String, MirrorSpec>,

    /// Save pass settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.data.validate()?;
        self.scopes.validate()?;

        for (source, spec) in &self.mirrors {
            if source.trim().is_empty() {
                return Err(ConfigError::validation(
                    "mirrors",
                    "source scope name must not be empty",
                ));
            }
            spec.validate(source)?;
        }

        Ok(())
    }

    /// Returns every configured mirror as `(source, target)` entries.
    pub fn mirror_entries(&self) -> ConfigResult<Vec<MirrorEntry>> {
        let mut entries = Vec::new();
        for (source, spec) in &self.mirrors {
            entries.extend(spec.entries(source)?);
        }
        Ok(entries)
    }
}

// =============================================================================
// Data Configuration
// =============================================================================

/// On-disk layout of the data tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Base directory.
    #[serde(default = "default_data_root")]
    pub root: PathBuf,

    /// Directory holding one folder per scope, relative to `root`.
    #[serde(default = "default_scopes_dir")]
    pub scopes_dir: PathBuf,

    /// Directory receiving backups, relative to `root`.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// File name of the global groups document inside `root`.
    #[serde(default = "default_global_groups_file")]
    pub global_groups_file: String,
}

fn default_data_root() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_ROOT)
}

fn default_scopes_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SCOPES_DIR)
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BACKUP_DIR)
}

fn default_global_groups_file() -> String {
    DEFAULT_GLOBAL_GROUPS_FILE.to_string()
}

impl DataConfig {
    /// Creates a layout rooted at `root` with default sub-paths.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Validates the data layout.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::missing_field("data.root"));
        }
        if self.global_groups_file.trim().is_empty() {
            return Err(ConfigError::missing_field("data.global_groups_file"));
        }
        Ok(())
    }

    /// Returns the directory holding scope folders.
    pub fn scopes_path(&self) -> PathBuf {
        self.root.join(&self.scopes_dir)
    }

    /// Returns the backup directory.
    pub fn backup_path(&self) -> PathBuf {
        self.root.join(&self.backup_dir)
    }

    /// Returns the global groups document path.
    pub fn global_groups_path(&self) -> PathBuf {
        self.root.join(&self.global_groups_file)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: default_data_root(),
            scopes_dir: default_scopes_dir(),
            backup_dir: default_backup_dir(),
            global_groups_file: default_global_groups_file(),
        }
    }
}

// =============================================================================
// Scopes Configuration
// =============================================================================

/// Scope names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopesConfig {
    /// The designated default scope.
    #[serde(default = "default_scope")]
    pub default: String,

    /// Scope answering lookups for unknown scope names.
    #[serde(default = "default_catch_all")]
    pub catch_all: String,

    /// Scopes reported as active by the built-in static host.
    #[serde(default)]
    pub active: Vec<String>,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_catch_all() -> String {
    DEFAULT_CATCH_ALL_SCOPE.to_string()
}

impl ScopesConfig {
    /// Validates scope names.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default.trim().is_empty() {
            return Err(ConfigError::validation(
                "scopes.default",
                "default scope name must not be empty",
            ));
        }
        if self.catch_all.trim().is_empty() {
            return Err(ConfigError::validation(
                "scopes.catch_all",
                "catch-all scope name must not be empty",
            ));
        }
        if self.active.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::validation(
                "scopes.active",
                "scope names must not be empty",
            ));
        }
        Ok(())
    }
}

impl Default for ScopesConfig {
    fn default() -> Self {
        Self {
            default: default_scope(),
            catch_all: default_catch_all(),
            active: Vec::new(),
        }
    }
}

// =============================================================================
// Mirror Configuration
// =============================================================================

/// Mirror configuration of one source scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MirrorSpec {
    /// Full mirrors of both tables.
    Flat(Vec<String>),
    /// Per-target list of mirrored tables (`groups`, `users`).
    Keyed(BTreeMap<String, Vec<String>>),
}

/// The table a mirror applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorKind {
    /// The group table.
    Groups,
    /// The user table.
    Users,
}

impl MirrorKind {
    /// Parses a kind name, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groups" => Some(MirrorKind::Groups),
            "users" => Some(MirrorKind::Users),
            _ => None,
        }
    }

    /// Returns the kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorKind::Groups => "groups",
            MirrorKind::Users => "users",
        }
    }
}

impl fmt::Display for MirrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved mirror entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEntry {
    /// Scope that owns the data.
    pub source: String,
    /// Scope that reuses the data.
    pub target: String,
    /// Whether the group table is mirrored.
    pub groups: bool,
    /// Whether the user table is mirrored.
    pub users: bool,
}

impl MirrorEntry {
    /// Returns `true` if both tables are mirrored.
    pub fn is_full(&self) -> bool {
        self.groups && self.users
    }
}

impl MirrorSpec {
    /// Validates the entry of `source`.
    pub fn validate(&self, source: &str) -> ConfigResult<()> {
        self.entries(source).map(|_| ())
    }

    /// Expands this mirror configuration into entries.
    pub fn entries(&self, source: &str) -> ConfigResult<Vec<MirrorEntry>> {
        let field = format!("mirrors.{}", source);
        match self {
            MirrorSpec::Flat(targets) => targets
                .iter()
                .map(|target| {
                    check_target(&field, target)?;
                    Ok(MirrorEntry {
                        source: source.to_string(),
                        target: target.clone(),
                        groups: true,
                        users: true,
                    })
                })
                .collect(),
            MirrorSpec::Keyed(targets) => targets
                .iter()
                .map(|(target, kinds)| {
                    check_target(&field, target)?;
                    let mut entry = MirrorEntry {
                        source: source.to_string(),
                        target: target.clone(),
                        groups: false,
                        users: false,
                    };
                    for kind in kinds {
                        match MirrorKind::parse(kind) {
                            Some(MirrorKind::Groups) => entry.groups = true,
                            Some(MirrorKind::Users) => entry.users = true,
                            None => {
                                return Err(ConfigError::validation(
                                    format!("{}.{}", field, target),
                                    format!(
                                        "unknown mirror kind '{}', expected 'groups' or 'users'",
                                        kind
                                    ),
                                ))
                            }
                        }
                    }
                    Ok(entry)
                })
                .collect(),
        }
    }
}

fn check_target(field: &str, target: &str) -> ConfigResult<()> {
    if target.trim().is_empty() {
        return Err(ConfigError::validation(
            field,
            "mirror target name must not be empty",
        ));
    }
    Ok(())
}

// =============================================================================
// Sync Configuration
// =============================================================================

/// Save pass settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Write changed tables even when the file on disk is newer.
    #[serde(default)]
    pub overwrite: bool,
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level name understood by tracing filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Compact text.
    Compact,
    /// JSON lines.
    Json,
}
