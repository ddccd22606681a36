// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the ward binary.

use thiserror::Error;

/// Result type alias for ward-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the ward binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Config parsing error.
    #[error("Config error: {0}")]
    Config(#[from] ward_config::ConfigError),

    /// Loading, resolving or saving failed.
    #[error("Registry error: {0}")]
    Registry(#[from] ward_registry::RegistryError),

    /// Some tables could not be saved.
    #[error("{failed} table(s) could not be saved")]
    SyncFailed {
        /// Number of failed tables.
        failed: usize,
    },

    /// `check` was asked about a permission the user does not have.
    #[error("'{user}' does not have '{permission}' in scope '{scope}'")]
    PermissionDenied {
        /// Scope checked.
        scope: String,
        /// User checked.
        user: String,
        /// Permission checked.
        permission: String,
    },

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Registry(e) if e.is_conflict() => 5,
            Self::Registry(_) => 2,
            Self::Io(_) => 4,
            Self::SyncFailed { .. } => 5,
            Self::PermissionDenied { .. } => 6,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with its cause chain.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================
