// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core error types for ward.
//!
//! These errors cover violations of the in-memory data model: name
//! collisions, a scope without a default group, and lookups of entities
//! that must exist for an operation to proceed.
//!
//! Recoverable problems found while resolving permissions (dangling group
//! references) are not errors; they are reported as
//! [`Diagnostic`](crate::resolve::Diagnostic) values alongside the result.
//!
//! # Examples
//!
//! ```
//! use ward_core::error::{CoreError, EntityKind};
//!
//! let error = CoreError::duplicate(EntityKind::Group, "Admin");
//! assert!(error.is_duplicate());
//! assert_eq!(error.error_type(), "duplicate_entity");
//! ```

use std::fmt;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// EntityKind
// =============================================================================

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A group in a scope or in the global namespace.
    Group,
    /// A user in a scope.
    User,
}

impl EntityKind {
    /// Returns the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Group => "group",
            EntityKind::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CoreError
// =============================================================================

/// Errors raised by the data model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An entity with the same (case-insensitive) name already exists.
    #[error("Duplicate {kind} '{name}'")]
    DuplicateEntity {
        /// Kind of the colliding entity.
        kind: EntityKind,
        /// The name that collided.
        name: String,
    },

    /// The scope has no default group.
    #[error("Scope '{scope}' has no default group")]
    MissingDefaultGroup {
        /// Scope name.
        scope: String,
    },

    /// The named group does not exist.
    #[error("Unknown group '{name}' in scope '{scope}'")]
    UnknownGroup {
        /// Scope name.
        scope: String,
        /// Group name.
        name: String,
    },

    /// The named user does not exist.
    #[error("Unknown user '{id}' in scope '{scope}'")]
    UnknownUser {
        /// Scope name.
        scope: String,
        /// User identity.
        id: String,
    },

    /// The default group cannot be removed while it is the default.
    #[error("Group '{name}' is the default group of scope '{scope}' and cannot be removed")]
    DefaultGroupInUse {
        /// Scope name.
        scope: String,
        /// Group name.
        name: String,
    },
}

impl CoreError {
    /// Creates a duplicate entity error.
    pub fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::DuplicateEntity {
            kind,
            name: name.into(),
        }
    }

    /// Creates a missing default group error.
    pub fn missing_default(scope: impl Into<String>) -> Self {
        Self::MissingDefaultGroup {
            scope: scope.into(),
        }
    }

    /// Creates an unknown group error.
    pub fn unknown_group(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownGroup {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// Creates an unknown user error.
    pub fn unknown_user(scope: impl Into<String>, id: impl Into<String>) -> Self {
        Self::UnknownUser {
            scope: scope.into(),
            id: id.into(),
        }
    }

    /// Returns `true` for name collisions.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CoreError::DuplicateEntity { .. })
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            CoreError::DuplicateEntity { .. } => "duplicate_entity",
            CoreError::MissingDefaultGroup { .. } => "missing_default_group",
            CoreError::UnknownGroup { .. } => "unknown_group",
            CoreError::UnknownUser { .. } => "unknown_user",
            CoreError::DefaultGroupInUse { .. } => "default_group_in_use",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
