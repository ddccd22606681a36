// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Variable store for group and user metadata.
//!
//! Variables are the `info` section of a group or user: an ordered mapping
//! of names to strings, integers, floats or booleans. Insertion order is
//! kept so documents are written back in the order they were read.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Variable name for the chat prefix of a group.
pub const PREFIX: &str = "prefix";

/// Variable name for the chat suffix of a group.
pub const SUFFIX: &str = "suffix";

/// Variable name for the build flag of a group.
pub const BUILD: &str = "build";

// =============================================================================
// VariableValue
// =============================================================================

/// A single variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl VariableValue {
    /// Returns the value as a boolean.
    ///
    /// Text is interpreted case-insensitively, so `"TRUE"` is `true`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariableValue::Bool(b) => Some(*b),
            VariableValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            VariableValue::Int(i) => Some(*i),
            VariableValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            VariableValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            VariableValue::Float(f) => Some(*f),
            VariableValue::Int(i) => Some(*i as f64),
            VariableValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as text. Every kind has a text form.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Bool(b) => write!(f, "{}", b),
            VariableValue::Int(i) => write!(f, "{}", i),
            VariableValue::Float(v) => write!(f, "{}", v),
            VariableValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for VariableValue {
    fn from(v: bool) -> Self {
        VariableValue::Bool(v)
    }
}

impl From<i64> for VariableValue {
    fn from(v: i64) -> Self {
        VariableValue::Int(v)
    }
}

impl From<f64> for VariableValue {
    fn from(v: f64) -> Self {
        VariableValue::Float(v)
    }
}

impl From<&str> for VariableValue {
    fn from(v: &str) -> Self {
        VariableValue::Text(v.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(v: String) -> Self {
        VariableValue::Text(v)
    }
}

// =============================================================================
// VariableStore
// =============================================================================

/// Ordered mapping of variable names to values.
///
/// Names are matched case-insensitively; the first spelling is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    entries: Vec<(String, VariableValue)>,
}

impl VariableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the store a new group starts with.
    pub fn group_defaults() -> Self {
        let mut store = Self::new();
        store.set(PREFIX, "");
        store.set(SUFFIX, "");
        store.set(BUILD, false);
        store
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Sets a variable, keeping its position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<VariableValue>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Removes a variable, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<VariableValue> {
        self.position(name).map(|index| self.entries.remove(index).1)
    }

    /// Returns the raw value of a variable.
    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.position(name).map(|index| &self.entries[index].1)
    }

    /// Returns `true` if the variable is set.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns a boolean variable.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(VariableValue::as_bool)
    }

    /// Returns an integer variable.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(VariableValue::as_int)
    }

    /// Returns a float variable.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(VariableValue::as_float)
    }

    /// Returns a variable in text form.
    pub fn get_text(&self, name: &str) -> Option<String> {
        self.get(name).map(VariableValue::as_text)
    }

    /// Returns a boolean variable or `default`.
    pub fn get_bool_or(&self, name: &str, default: bool) -> bool {
        self.get_bool(name).unwrap_or(default)
    }

    /// Returns an integer variable or `default`.
    pub fn get_int_or(&self, name: &str, default: i64) -> i64 {
        self.get_int(name).unwrap_or(default)
    }

    /// Returns a float variable or `default`.
    pub fn get_float_or(&self, name: &str, default: f64) -> f64 {
        self.get_float(name).unwrap_or(default)
    }

    /// Returns a text variable or `default`.
    pub fn get_text_or(&self, name: &str, default: &str) -> String {
        self.get_text(name).unwrap_or_else(|| default.to_string())
    }

    /// Merges `other` into this store; values from `other` win.
    pub fn merge(&mut self, other: &VariableStore) {
        for (name, value) in &other.entries {
            self.set(name.clone(), value.clone());
        }
    }

    /// Iterates over variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no variable is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
