// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ward Integration Tests
//!
//! Integration tests across the ward crates, plus the helpers they share.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: group and user documents for common scenarios
//!   - `mocks`: a notifier that records every call
//!   - `harness`: a temporary data tree with registry and source helpers
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p ward-tests
//!
//! # Run specific test suite
//! cargo test -p ward-tests --test integration_resolution
//! cargo test -p ward-tests --test integration_store
//! cargo test -p ward-tests --test integration_registry
//! ```
//!
//! ## Test Categories
//!
//! ### Resolution Tests (`integration_resolution.rs`)
//! - Wildcard and negation matching
//! - Inheritance cycles, sub-groups and global references
//!
//! ### Store Tests (`integration_store.rs`)
//! - Load rules and warnings
//! - Save/reload consistency protocol
//! - Save then reload equivalence
//!
//! ### Registry Tests (`integration_registry.rs`)
//! - Mirrors and lookup fallbacks
//! - Purge and reload notifications
//!
//! ## Using the Harness
//!
//! ```rust,ignore
//! use ward_tests::prelude::*;
//!
//! #[test]
//! fn test_something() {
//!     let harness = TestHarness::new();
//!     harness.write_groups("world", GroupFixtures::PROMOTION_TREE);
//!     let registry = harness.registry().build().unwrap();
//!     registry.reset().unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
}
