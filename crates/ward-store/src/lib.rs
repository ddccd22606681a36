// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ward-store
//!
//! YAML persistence for ward scopes.
//!
//! ## Features
//!
//! - **Typed document boundary**: raw YAML is resolved into scalar or list
//!   fields once; wrong shapes are errors, per-entry problems are warnings
//! - **Staged loads**: every load builds a fresh table that is swapped in
//!   only after it was fully decoded
//! - **Sync protocol**: changed tables are written, externally modified
//!   files are reloaded, and conflicting edits are refused
//! - **Atomic writes and backups**: documents are replaced by rename, and
//!   the previous file is copied to the backup folder first
//!
//! ## Example
//!
//! ```no_run
//! use ward_core::{GlobalGroups, ScopeData};
//! use ward_store::{SyncOutcome, YamlSource};
//!
//! let source = YamlSource::new("data/scopes", "data/backup", "data/GlobalGroups.yml");
//! let global = GlobalGroups::new();
//! source.init_global().unwrap();
//! source.reload_global(&global).unwrap();
//!
//! source.init_scope("world", false, false).unwrap();
//! let world = ScopeData::new("world");
//! source.reload_groups(&world, &global).unwrap();
//! source.reload_users(&world, &global).unwrap();
//!
//! world.create_user("steve").unwrap();
//! assert_eq!(source.sync_users(&world, &global, false).unwrap(), SyncOutcome::Saved);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod codec;
pub mod document;
pub mod error;
pub mod fs;
pub mod source;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{LoadReport, LoadWarning, StoreError, StoreResult};
pub use source::{SyncAction, SyncOutcome, YamlSource, GROUPS_FILE, USERS_FILE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
