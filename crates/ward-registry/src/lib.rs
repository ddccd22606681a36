// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ward-registry
//!
//! Registry of every scope known to a ward process.
//!
//! ## Features
//!
//! - **Mirrors**: a scope can reuse another scope's group table, user
//!   table, or both; mirrored tables are the same shared table
//! - **Fallback lookups**: unknown scopes resolve to the catch-all scope,
//!   then to the default scope
//! - **Discovery**: scope folders found on disk and scopes reported by the
//!   host are loaded on [`ScopeRegistry::reset`]
//! - **Maintenance**: reload, expiry purge and the save protocol across
//!   all scopes, with notifications for affected connected users
//!
//! ## Example
//!
//! ```no_run
//! use ward_config::load_config;
//! use ward_registry::ScopeRegistryBuilder;
//!
//! let config = load_config("ward.yaml").unwrap();
//! let registry = ScopeRegistryBuilder::from_config(&config)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! registry.reset().unwrap();
//!
//! let effective = registry.resolve_permissions("world", "steve").unwrap();
//! println!("build allowed: {}", effective.has("build"));
//!
//! let report = registry.save_changes(config.sync.overwrite);
//! assert!(report.is_success());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod mirror;
pub mod registry;
pub mod report;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{RegistryError, RegistryResult};
pub use mirror::MirrorMap;
pub use registry::{ScopeRegistry, ScopeRegistryBuilder};
pub use report::{SyncReport, TableSync};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
