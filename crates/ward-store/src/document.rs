// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Raw document access.
//!
//! Documents are parsed into a [`serde_yaml::Value`] tree and every field is
//! resolved here, at the boundary, into a small set of typed shapes. A field
//! that may be written either as a single value or as a list becomes a
//! [`NodeValue`]; anything of the wrong shape is a
//! [`StoreError::MalformedDocument`]. Mappings keep their document order, so
//! "first default wins" follows the file.

use std::path::Path;

use serde_yaml::{Mapping, Number, Value};
use ward_core::{VariableStore, VariableValue};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// NodeValue
// =============================================================================

/// A field written either as one scalar or as a list of scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    /// A single value.
    Scalar(String),
    /// A sequence of values. Null items are skipped.
    List(Vec<String>),
}

impl NodeValue {
    /// Returns the items in document order.
    pub fn into_items(self) -> Vec<String> {
        match self {
            NodeValue::Scalar(s) => vec![s],
            NodeValue::List(items) => items,
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses `text` and returns its root mapping.
///
/// An empty document, a null root or a non-mapping root is malformed.
pub fn parse_root(text: &str, path: &Path) -> StoreResult<Mapping> {
    let value: Value =
        serde_yaml::from_str(text).map_err(|e| StoreError::malformed(path, e.to_string()))?;
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Err(StoreError::malformed(path, "document is empty")),
        _ => Err(StoreError::malformed(path, "root is not a mapping")),
    }
}

/// Returns the text of a scalar node. Numbers and booleans are rendered the
/// way they were written.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Returns the text of a mapping key.
///
/// User ids are often numeric, which YAML reads as integers.
pub fn key_text(key: &Value, path: &Path) -> StoreResult<String> {
    scalar_text(key)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| StoreError::malformed(path, format!("invalid key {:?}", key)))
}

/// Resolves an optional scalar-or-list field.
///
/// `None` for a missing or null field.
pub fn node_value(
    value: Option<&Value>,
    path: &Path,
    field: &str,
) -> StoreResult<Option<NodeValue>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if item.is_null() {
                    continue;
                }
                let text = scalar_text(item).ok_or_else(|| {
                    StoreError::malformed(path, format!("'{}' contains a non-scalar item", field))
                })?;
                out.push(text);
            }
            Ok(Some(NodeValue::List(out)))
        }
        other => scalar_text(other)
            .map(|s| Some(NodeValue::Scalar(s)))
            .ok_or_else(|| {
                StoreError::malformed(path, format!("'{}' must be a value or a list", field))
            }),
    }
}

/// Resolves an optional mapping field. `None` for a missing or null field.
pub fn mapping_field<'a>(
    value: Option<&'a Value>,
    path: &Path,
    field: &str,
) -> StoreResult<Option<&'a Mapping>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(map)) => Ok(Some(map)),
        Some(_) => Err(StoreError::malformed(
            path,
            format!("'{}' must be a mapping", field),
        )),
    }
}

/// Returns `true` if a field holds a truthy scalar.
///
/// Only the text `true` (any case) counts.
pub fn is_true(value: Option<&Value>) -> bool {
    value
        .and_then(scalar_text)
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("true"))
}

// =============================================================================
// Variables
// =============================================================================

/// Merges an `info` mapping into a variable store.
///
/// Null values and nested structures are skipped.
pub fn merge_variables(store: &mut VariableStore, info: &Mapping) {
    for (key, value) in info {
        let Some(name) = scalar_text(key) else {
            continue;
        };
        if let Some(value) = variable_value(value) {
            store.set(name, value);
        }
    }
}

fn variable_value(value: &Value) -> Option<VariableValue> {
    match value {
        Value::Bool(b) => Some(VariableValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(VariableValue::Int(i)),
            None => n.as_f64().map(VariableValue::Float),
        },
        Value::String(s) => Some(VariableValue::Text(s.clone())),
        _ => None,
    }
}

/// Renders a variable store as an `info` mapping.
pub fn variables_mapping(store: &VariableStore) -> Mapping {
    let mut map = Mapping::new();
    for (name, value) in store.iter() {
        let value = match value {
            VariableValue::Bool(b) => Value::Bool(*b),
            VariableValue::Int(i) => Value::Number(Number::from(*i)),
            VariableValue::Float(f) => Value::Number(Number::from(*f)),
            VariableValue::Text(s) => Value::String(s.clone()),
        };
        map.insert(Value::String(name.to_string()), value);
    }
    map
}

/// Builds a sequence node from strings.
pub fn string_list<I>(items: I) -> Value
where
    I: IntoIterator<Item = String>,
{
    Value::Sequence(items.into_iter().map(Value::String).collect())
}
