// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ward-bin
//!
//! Operator binary for a ward data tree.
//!
//! This crate provides:
//!
//! - CLI argument parsing with clap
//! - Logging initialization
//! - Command implementations (validate, check, sync, purge, version)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   main.rs    │
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐      ┌──────────────┐
//! │    cli.rs    │      │  logging.rs  │
//! └──────┬───────┘      └──────▲───────┘
//!        │                     │
//! ┌──────▼─────────────────────┴──┐
//! │           commands            │
//! └──────────────┬────────────────┘
//!                │
//!        ┌───────▼───────┐
//!        │ ward-registry │
//!        └───────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Check the data tree
//! ward -c /etc/ward/ward.yaml validate
//!
//! # Effective permissions of a user
//! ward check world steve
//!
//! # Exit non-zero unless steve may build
//! ward check world steve build
//!
//! # Drop expired entries and save
//! ward purge
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
