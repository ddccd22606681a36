// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ward-config
//!
//! Configuration management for ward.
//!
//! ## Features
//!
//! - **Schema Definition**: data layout, scope names, mirrors, sync and logging
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: override config values via `WARD_*` variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use ward_config::loader::load_config;
//!
//! let config = load_config("ward.yaml").unwrap();
//!
//! println!("Default scope: {}", config.scopes.default);
//! println!("Mirrors: {}", config.mirrors.len());
//! ```
//!
//! ## Environment Variables
//!
//! ```text
//! WARD_DATA_ROOT=/srv/ward
//! WARD_DEFAULT_SCOPE=lobby
//! WARD_LOG_LEVEL=debug
//! WARD_SYNC_OVERWRITE=true
//! ```
//!
//! Values in config files can reference environment variables:
//!
//! ```yaml
//! data:
//!   root: "${WARD_HOME:./data}"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, ConfigLoaderBuilder};
pub use schema::{
    DataConfig, LogFormat, LogLevel, LoggingConfig, MirrorEntry, MirrorKind, MirrorSpec,
    ScopesConfig, SyncConfig, WardConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "ward-config");
    }
}
