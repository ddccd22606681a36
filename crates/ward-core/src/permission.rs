// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission values and ordered permission sets.
//!
//! A permission entry is a capability string such as `build.place`, with an
//! optional leading negation marker (`-build.place`) and an optional expiry
//! in epoch milliseconds. A trailing `*` turns the entry into a wildcard that
//! matches every permission sharing the literal prefix before the `*`.
//!
//! Matching is case-insensitive throughout.
//!
//! # Examples
//!
//! ```
//! use ward_core::permission::{has_permission, PermissionEntry};
//!
//! let entries = vec![PermissionEntry::parse("foo.*")];
//! assert!(has_permission(&entries, "foo.bar"));
//! assert!(!has_permission(&entries, "foobar"));
//! assert!(has_permission(&entries, "FOO.Baz"));
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker that negates a permission entry.
pub const NEGATION_MARKER: char = '-';

/// Marker that turns a permission entry into a prefix wildcard.
pub const WILDCARD_MARKER: char = '*';

/// Delimiter between an entry and its expiry in the persisted form.
pub const TIMED_DELIMITER: char = '|';

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Timed entries
// =============================================================================

/// Problems found while splitting a `text|expiry` entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimedEntryError {
    /// The entry text is empty after trimming.
    #[error("empty entry")]
    Empty,

    /// The expiry part is not a valid integer.
    #[error("invalid expiry '{expiry}' in entry '{raw}'")]
    InvalidExpiry {
        /// The full raw entry.
        raw: String,
        /// The expiry part that failed to parse.
        expiry: String,
    },
}

/// Splits a persisted `text|expiry` entry into its text and optional expiry.
///
/// Text without a delimiter has no expiry.
pub fn split_timed(raw: &str) -> Result<(String, Option<i64>), TimedEntryError> {
    let (text, expiry) = match raw.split_once(TIMED_DELIMITER) {
        Some((text, expiry)) => {
            let expiry = expiry.trim();
            let millis = expiry
                .parse::<i64>()
                .map_err(|_| TimedEntryError::InvalidExpiry {
                    raw: raw.to_string(),
                    expiry: expiry.to_string(),
                })?;
            (text.trim(), Some(millis))
        }
        None => (raw.trim(), None),
    };

    if text.is_empty() {
        return Err(TimedEntryError::Empty);
    }
    Ok((text.to_string(), expiry))
}

/// Joins text and an optional expiry into the persisted form.
pub fn join_timed(text: &str, expires_at: Option<i64>) -> String {
    match expires_at {
        Some(millis) => format!("{}{}{}", text, TIMED_DELIMITER, millis),
        None => text.to_string(),
    }
}

// =============================================================================
// PermissionEntry
// =============================================================================

/// A single permission entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionEntry {
    node: String,
    negated: bool,
    expires_at: Option<i64>,
}

impl PermissionEntry {
    /// Creates a permanent entry from its textual form (`-` prefix negates).
    pub fn parse(text: &str) -> Self {
        Self::with_expiry(text, None)
    }

    /// Creates an entry from its textual form with an optional expiry.
    pub fn with_expiry(text: &str, expires_at: Option<i64>) -> Self {
        let text = text.trim();
        let (node, negated) = match text.strip_prefix(NEGATION_MARKER) {
            Some(rest) => (rest.trim_start(), true),
            None => (text, false),
        };
        Self {
            node: node.to_string(),
            negated,
            expires_at,
        }
    }

    /// Parses the persisted `text|expiry` form.
    pub fn parse_timed(raw: &str) -> Result<Self, TimedEntryError> {
        let (text, expires_at) = split_timed(raw)?;
        Ok(Self::with_expiry(&text, expires_at))
    }

    /// Returns the permission node without the negation marker.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Returns `true` if this entry denies rather than grants.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Returns the expiry in epoch milliseconds, if any.
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// Returns `true` if the node ends with the wildcard marker.
    pub fn is_wildcard(&self) -> bool {
        self.node.ends_with(WILDCARD_MARKER)
    }

    /// Returns `true` once the expiry has been reached.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    /// Returns the textual form including the negation marker.
    pub fn text(&self) -> String {
        if self.negated {
            format!("{}{}", NEGATION_MARKER, self.node)
        } else {
            self.node.clone()
        }
    }

    /// Returns the persisted form (`text` or `text|expiry`).
    pub fn to_document(&self) -> String {
        join_timed(&self.text(), self.expires_at)
    }

    /// Returns `true` if this entry and `other` name the same permission
    /// with the same polarity, ignoring case and expiry.
    pub fn same_identity(&self, other: &PermissionEntry) -> bool {
        self.negated == other.negated && self.node.eq_ignore_ascii_case(&other.node)
    }

    /// Returns `true` if this entry applies to `permission`.
    ///
    /// Non-wildcard entries match by case-insensitive equality. Wildcards
    /// match any permission starting with the literal prefix before `*`.
    pub fn matches(&self, permission: &str) -> bool {
        let permission = permission.trim();
        match self.node.strip_suffix(WILDCARD_MARKER) {
            Some(prefix) => starts_with_ignore_case(permission, prefix),
            None => self.node.eq_ignore_ascii_case(permission),
        }
    }

    /// Compares two entries by evaluation priority.
    ///
    /// Exact entries come before wildcards, longer nodes before shorter ones
    /// and negations before grants.
    pub fn priority_cmp(&self, other: &PermissionEntry) -> Ordering {
        self.is_wildcard()
            .cmp(&other.is_wildcard())
            .then_with(|| other.node.len().cmp(&self.node.len()))
            .then_with(|| other.negated.cmp(&self.negated))
            .then_with(|| {
                self.node
                    .to_ascii_lowercase()
                    .cmp(&other.node.to_ascii_lowercase())
            })
    }
}

impl PartialEq for PermissionEntry {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other) && self.expires_at == other.expires_at
    }
}

impl Eq for PermissionEntry {}

impl fmt::Display for PermissionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_document())
    }
}

impl From<&str> for PermissionEntry {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Evaluates `permission` against an ordered entry list.
///
/// The first matching entry decides; a negated match denies. Callers pass
/// either a [`PermissionSet`] slice or an effective permission list, both
/// of which are already in priority order.
pub fn has_permission(entries: &[PermissionEntry], permission: &str) -> bool {
    check_permission(entries, permission).unwrap_or(false)
}

/// Like [`has_permission`] but distinguishes "no entry matched" (`None`).
pub fn check_permission(entries: &[PermissionEntry], permission: &str) -> Option<bool> {
    entries
        .iter()
        .find(|entry| entry.matches(permission))
        .map(|entry| !entry.is_negated())
}

// =============================================================================
// PermissionSet
// =============================================================================

/// An ordered set of permission entries kept in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    entries: Vec<PermissionEntry>,
}

impl PermissionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing an existing entry with the same identity.
    ///
    /// Returns `true` if the set changed.
    pub fn add(&mut self, entry: PermissionEntry) -> bool {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.same_identity(&entry)) {
            if existing.expires_at == entry.expires_at && existing.node == entry.node {
                return false;
            }
            *existing = entry;
            return true;
        }
        let position = self
            .entries
            .partition_point(|e| e.priority_cmp(&entry) != Ordering::Greater);
        self.entries.insert(position, entry);
        true
    }

    /// Removes the entry matching `text` (including its negation marker).
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&mut self, text: &str) -> bool {
        let wanted = PermissionEntry::parse(text);
        let before = self.entries.len();
        self.entries.retain(|e| !e.same_identity(&wanted));
        self.entries.len() != before
    }

    /// Returns `true` if an entry with the same identity as `text` exists.
    pub fn contains(&self, text: &str) -> bool {
        let wanted = PermissionEntry::parse(text);
        self.entries.iter().any(|e| e.same_identity(&wanted))
    }

    /// Drops every entry whose expiry has been reached.
    ///
    /// Returns `true` if anything was removed.
    pub fn purge_expired(&mut self, now: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !e.is_expired(now));
        self.entries.len() != before
    }

    /// Iterates over entries that are not expired at `now`.
    pub fn active(&self, now: i64) -> impl Iterator<Item = &PermissionEntry> {
        self.entries.iter().filter(move |e| !e.is_expired(now))
    }

    /// Returns all entries, expired ones included, in priority order.
    pub fn as_slice(&self) -> &[PermissionEntry] {
        &self.entries
    }

    /// Iterates over all entries in priority order.
    pub fn iter(&self) -> std::slice::Iter<'_, PermissionEntry> {
        self.entries.iter()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<PermissionEntry> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionEntry>>(iter: I) -> Self {
        let mut set = PermissionSet::new();
        for entry in iter {
            set.add(entry);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a PermissionEntry;
    type IntoIter = std::slice::Iter<'a, PermissionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
