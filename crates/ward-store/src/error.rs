// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error and warning types for ward-store.
//!
//! Fatal problems are [`StoreError`]s. Per-entry problems are recovered
//! locally and collected as [`LoadWarning`]s in a [`LoadReport`], which is
//! returned with every successful load so callers can surface them.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use ward_core::{CoreError, GroupRef, TableKind};

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// StoreError
// =============================================================================

/// Errors raised while reading or writing documents.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document is not valid YAML or has the wrong shape.
    #[error("Malformed document '{path}': {message}")]
    MalformedDocument {
        /// Path of the document.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// A required section is missing (no `groups`, or no default group).
    #[error("Missing required section in '{path}': {section}")]
    MissingRequiredSection {
        /// Path of the document.
        path: PathBuf,
        /// Description of the missing section.
        section: String,
    },

    /// Two entities in one document collide.
    #[error("Duplicate entity in '{path}': {source}")]
    DuplicateEntity {
        /// Path of the document.
        path: PathBuf,
        /// The collision.
        #[source]
        source: CoreError,
    },

    /// The file on disk is newer than the changed in-memory table.
    #[error(
        "Refusing to save {table} of scope '{scope}': '{path}' was modified on disk \
         after it was last loaded"
    )]
    ConcurrentModificationConflict {
        /// Scope name.
        scope: String,
        /// The conflicting table.
        table: TableKind,
        /// Path of the newer file.
        path: PathBuf,
    },

    /// A file system operation failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing a table failed.
    #[error("Failed to serialize {what}: {message}")]
    Serialization {
        /// What was being serialized.
        what: String,
        /// Error message.
        message: String,
    },

    /// The data model refused an operation.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    /// Creates a malformed document error.
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a missing section error.
    pub fn missing_section(path: impl Into<PathBuf>, section: impl Into<String>) -> Self {
        Self::MissingRequiredSection {
            path: path.into(),
            section: section.into(),
        }
    }

    /// Creates a duplicate entity error.
    pub fn duplicate(path: impl Into<PathBuf>, source: CoreError) -> Self {
        Self::DuplicateEntity {
            path: path.into(),
            source,
        }
    }

    /// Creates a conflict error.
    pub fn conflict(scope: impl Into<String>, table: TableKind, path: impl Into<PathBuf>) -> Self {
        Self::ConcurrentModificationConflict {
            scope: scope.into(),
            table,
            path: path.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a serialization error.
    pub fn serialization(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for save conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrentModificationConflict { .. })
    }

    /// Returns the error kind as a string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            StoreError::MalformedDocument { .. } => "malformed_document",
            StoreError::MissingRequiredSection { .. } => "missing_required_section",
            StoreError::DuplicateEntity { .. } => "duplicate_entity",
            StoreError::ConcurrentModificationConflict { .. } => {
                "concurrent_modification_conflict"
            }
            StoreError::Io { .. } => "storage_io_failure",
            StoreError::Serialization { .. } => "serialization",
            StoreError::Core(_) => "core",
        }
    }
}

// =============================================================================
// LoadWarning
// =============================================================================

/// A recovered, per-entry problem found while loading a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A referenced group does not exist; the reference was dropped or
    /// replaced by the default group.
    DanglingReference {
        /// Group name or user id holding the reference.
        referrer: String,
        /// The reference.
        reference: GroupRef,
    },

    /// An entry had an unusable expiry or was empty and was dropped.
    MalformedTimedEntry {
        /// Group name or user id holding the entry.
        owner: String,
        /// The raw entry.
        entry: String,
    },

    /// A second group claimed to be the default; the first one stays.
    DuplicateDefault {
        /// The group that kept the default flag.
        kept: String,
        /// The group whose flag was ignored.
        ignored: String,
    },

    /// A group has no `info` section; default variables apply.
    MissingInfo {
        /// Group name.
        group: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::DanglingReference {
                referrer,
                reference,
            } => write!(f, "'{}' references missing group '{}'", referrer, reference),
            LoadWarning::MalformedTimedEntry { owner, entry } => {
                write!(f, "dropped malformed entry '{}' of '{}'", entry, owner)
            }
            LoadWarning::DuplicateDefault { kept, ignored } => write!(
                f,
                "group '{}' is also marked default; keeping '{}'",
                ignored, kept
            ),
            LoadWarning::MissingInfo { group } => {
                write!(f, "group '{}' has no info section; using defaults", group)
            }
        }
    }
}

/// Warnings collected while loading one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    path: PathBuf,
    warnings: Vec<LoadWarning>,
}

impl LoadReport {
    /// Creates an empty report for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            warnings: Vec::new(),
        }
    }

    /// Records a warning and logs it.
    pub fn warn(&mut self, warning: LoadWarning) {
        tracing::warn!(path = %self.path.display(), "{}", warning);
        self.warnings.push(warning);
    }

    /// Returns the document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the recorded warnings.
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Appends the warnings of another report.
    pub fn extend(&mut self, other: LoadReport) {
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = StoreError::conflict("world", TableKind::Users, "/tmp/users.yml");
        assert!(err.is_conflict());
        assert_eq!(err.error_kind(), "concurrent_modification_conflict");
        assert!(err.to_string().contains("users of scope 'world'"));

        let err = StoreError::malformed("/tmp/groups.yml", "not a mapping");
        assert!(!err.is_conflict());
        assert_eq!(err.error_kind(), "malformed_document");
    }

    #[test]
    fn test_report_collects_warnings() {
        let mut report = LoadReport::new("groups.yml");
        assert!(report.is_clean());
        report.warn(LoadWarning::MissingInfo {
            group: "Guest".to_string(),
        });
        assert_eq!(report.warnings().len(), 1);
        assert!(report.warnings()[0].to_string().contains("Guest"));
    }
}
