// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Documents for common scenarios. Each constant is a complete file.

// =============================================================================
// Timestamps
// =============================================================================

/// An expiry long in the past (epoch milliseconds).
pub const EXPIRED_AT: i64 = 1;

/// An expiry far in the future: 2100-01-01T00:00:00Z.
pub const FAR_FUTURE: i64 = 4_102_444_800_000;

// =============================================================================
// Group Documents
// =============================================================================

/// Fixture providing groups documents.
pub struct GroupFixtures;

impl GroupFixtures {
    /// Default -> Builder -> Admin, with Admin also inheriting the global
    /// `staff` group.
    pub const PROMOTION_TREE: &'static str = "\
groups:
  Default:
    default: true
    info:
      prefix: '[D]'
      build: false
    inheritance: []
    permissions:
      - chat.*
      - -chat.shout
  Builder:
    default: false
    info:
      prefix: '[B]'
      build: true
    inheritance: [Default]
    permissions:
      - build
      - worldedit.*
  Admin:
    info:
      prefix: '[A]'
    inheritance: [Builder, 'g:staff']
    permissions: ['*']
";

    /// Two groups inheriting each other.
    pub const CYCLE: &'static str = "\
groups:
  A:
    default: true
    inheritance: [B]
    permissions: [a.one]
  B:
    inheritance: [A]
    permissions: [b.one]
";

    /// Two groups both marked default.
    pub const TWO_DEFAULTS: &'static str = "\
groups:
  First:
    default: true
    permissions: [first]
  Second:
    default: true
    permissions: [second]
";

    /// No group marked default.
    pub const NO_DEFAULT: &'static str = "\
groups:
  Lonely:
    permissions: [alone]
";

    /// A default group with one expired and one permanent permission.
    pub const TIMED: &'static str = "\
groups:
  Default:
    default: true
    permissions:
      - 'fly|1'
      - walk
      - 'swim|4102444800000'
";

    /// A group whose inheritance names a group that does not exist.
    pub const DANGLING: &'static str = "\
groups:
  Default:
    default: true
    inheritance: [Ghost]
    permissions: [walk]
";

    /// A groups document with a single group.
    pub fn single(name: &str, permission: &str) -> String {
        format!(
            "groups:\n  {}:\n    default: true\n    permissions: [{}]\n",
            name, permission
        )
    }
}

// =============================================================================
// Global Group Documents
// =============================================================================

/// Fixture providing global groups documents.
pub struct GlobalFixtures;

impl GlobalFixtures {
    /// One global `staff` group.
    pub const STAFF: &'static str = "\
groups:
  g:staff:
    info:
      prefix: '[S]'
    inheritance: []
    permissions: [staff.chat, -chat.shout]
";
}

// =============================================================================
// User Documents
// =============================================================================

/// Fixture providing users documents for [`GroupFixtures::PROMOTION_TREE`].
pub struct UserFixtures;

impl UserFixtures {
    /// A builder, an admin with a personal denial and a user with a timed
    /// sub-group.
    pub const PROMOTION_TREE: &'static str = "\
users:
  steve:
    group: Builder
    subgroups: []
    permissions: [home]
  alex:
    lastname: Alex
    group: Admin
    subgroups: []
    permissions: [-build]
  notch:
    group: Default
    subgroups: ['Builder|4102444800000']
    permissions: ['vip|1']
";

    /// A user whose primary group does not exist.
    pub const UNKNOWN_GROUP: &'static str = "\
users:
  herobrine:
    group: Missing
    subgroups: [AlsoMissing]
    permissions: []
";
}
