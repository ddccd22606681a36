// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ward-core
//!
//! Data model and permission resolution for ward, a per-scope hierarchical
//! permission store.
//!
//! This crate provides:
//!
//! - **Permission**: permission entries with negation, wildcards and expiry
//! - **Variables**: typed metadata attached to groups and users
//! - **Group / User**: the entities stored per scope
//! - **Tables**: group and user tables with change tracking
//! - **Holder**: the locked, shareable data of one scope
//! - **Global**: the scope-independent global group registry
//! - **Resolve**: cycle-safe effective permission resolution
//! - **Host**: traits for the embedding host and change notification
//!
//! ## Example
//!
//! ```
//! use ward_core::{GlobalGroups, PermissionEntry, ScopeData};
//!
//! let scope = ScopeData::new("world");
//! scope.create_group("Guest").unwrap();
//! scope.set_default_group("Guest").unwrap();
//! scope
//!     .update_group("Guest", |g| g.add_permission(PermissionEntry::parse("chat.*")))
//!     .unwrap();
//!
//! let global = GlobalGroups::new();
//! let effective = scope.resolve_permissions("Steve", &global, 0).unwrap();
//! assert!(effective.has("chat.say"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Model
// =============================================================================

pub mod error;
pub mod group;
pub mod permission;
pub mod user;
pub mod variables;

// =============================================================================
// Storage & Resolution
// =============================================================================

pub mod global;
pub mod holder;
pub mod resolve;
pub mod tables;

// =============================================================================
// Host Integration
// =============================================================================

pub mod host;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{CoreError, CoreResult, EntityKind};
pub use global::{GlobalGroups, GLOBAL_SCOPE};
pub use group::{Group, GroupRef, GLOBAL_PREFIX};
pub use holder::{PurgeOutcome, ScopeData, SharedGroups, SharedUsers, TableKind};
pub use host::{
    ClientInfo, ClientMatch, LoggingNotifier, NoOpNotifier, PermissionNotifier, ScopeHost,
    StaticHost,
};
pub use permission::{
    check_permission, has_permission, now_millis, split_timed, PermissionEntry, PermissionSet,
    TimedEntryError,
};
pub use resolve::{Diagnostic, EffectivePermissions, Resolver};
pub use tables::{GroupTable, SyncState, UserTable};
pub use user::{SubGroup, User};
pub use variables::{VariableStore, VariableValue};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
