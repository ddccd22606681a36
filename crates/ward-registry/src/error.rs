// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for ward-registry.

use thiserror::Error;
use ward_config::ConfigError;
use ward_core::CoreError;
use ward_store::StoreError;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised by the scope registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Loading or saving a document failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The data model refused an operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No default scope name was configured.
    #[error("No default scope configured")]
    NoDefaultScope,

    /// A mirror entry could not be understood.
    #[error("Unknown mirroring format for '{scope}': {message}")]
    UnknownMirrorFormat {
        /// Source scope of the entry.
        scope: String,
        /// Error message.
        message: String,
    },

    /// Mirrors of different tables point at each other.
    #[error("Mirror cycle through scope '{scope}'")]
    MirrorCycle {
        /// A scope on the cycle.
        scope: String,
    },

    /// The scope is not loaded.
    #[error("Unknown scope '{scope}'")]
    UnknownScope {
        /// The requested scope.
        scope: String,
    },

    /// No scope data is available yet.
    #[error("Registry has not been loaded")]
    NotLoaded,
}

impl RegistryError {
    /// Returns `true` if this is a save conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RegistryError::Store(e) if e.is_conflict())
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            RegistryError::Store(e) => e.error_kind(),
            RegistryError::Core(e) => e.error_type(),
            RegistryError::Config(e) => e.error_type(),
            RegistryError::NoDefaultScope => "no_default_scope",
            RegistryError::UnknownMirrorFormat { .. } => "unknown_mirror_format",
            RegistryError::MirrorCycle { .. } => "mirror_cycle",
            RegistryError::UnknownScope { .. } => "unknown_scope",
            RegistryError::NotLoaded => "not_loaded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_core::TableKind;

    #[test]
    fn test_conflict_passthrough() {
        let err: RegistryError = StoreError::conflict("world", TableKind::Groups, "g.yml").into();
        assert!(err.is_conflict());
        assert_eq!(err.error_type(), "concurrent_modification_conflict");
        assert!(!RegistryError::NotLoaded.is_conflict());
    }
}
