// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field-level diff between a stored and a current type shape.

use super::FieldDescriptor;
use crate::reflect::FieldInfo;
use crate::tolerance::VersionTolerance;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// CompareResult
// ---------------------------------------------------------------------------

/// A field present in both shapes whose declared type no longer matches.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub previous: FieldDescriptor,
    pub current: FieldDescriptor,
}

/// Difference between the current shape of a type and a previous one.
#[derive(Debug, Clone, Default)]
pub struct CompareResult {
    /// In the current shape only, current order.
    pub fields_added: Vec<FieldDescriptor>,
    /// In the previous shape only, previous order.
    pub fields_removed: Vec<FieldDescriptor>,
    /// In both, with incompatible declared types.
    pub fields_changed: Vec<FieldChange>,
    /// Constructor-recreated fields of the current type. Never classified.
    pub recreated: Vec<FieldInfo>,
}

impl CompareResult {
    /// True when the persisted shapes are identical.
    pub fn is_empty(&self) -> bool {
        self.fields_added.is_empty() && self.fields_removed.is_empty() && self.fields_changed.is_empty()
    }

    pub fn is_removed(&self, qualified_name: &str) -> bool {
        self.fields_removed
            .iter()
            .any(|f| f.qualified_name() == qualified_name)
    }

    pub(crate) fn added_names(&self) -> Vec<String> {
        self.fields_added
            .iter()
            .map(|f| f.qualified_name().to_string())
            .collect()
    }

    pub(crate) fn removed_names(&self) -> Vec<String> {
        self.fields_removed
            .iter()
            .map(|f| f.qualified_name().to_string())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Field comparison
// ---------------------------------------------------------------------------

/// Classify the non-transient fields of `current` against `previous` by
/// qualified name.
pub fn compare_fields(
    current: &[FieldDescriptor],
    previous: &[FieldDescriptor],
    policy: VersionTolerance,
) -> CompareResult {
    let mut remaining: HashMap<&str, &FieldDescriptor> = previous
        .iter()
        .filter(|f| !f.is_transient())
        .map(|f| (f.qualified_name(), f))
        .collect();

    let mut result = CompareResult::default();
    for field in current.iter().filter(|f| !f.is_transient()) {
        match remaining.remove(field.qualified_name()) {
            None => result.fields_added.push(field.clone()),
            Some(old) if !field.is_compatible_with(old, policy) => {
                result.fields_changed.push(FieldChange {
                    previous: old.clone(),
                    current: field.clone(),
                });
            }
            Some(_) => {}
        }
    }

    result.fields_removed = previous
        .iter()
        .filter(|f| remaining.contains_key(f.qualified_name()))
        .cloned()
        .collect();
    result
}
