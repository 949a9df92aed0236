// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field-slot plans.

use super::TypeDescriptor;
use crate::reflect::FieldInfo;
use std::sync::Arc;

/// One wire position of a structure-stamped value.
#[derive(Debug, Clone)]
pub enum FieldSlot {
    /// Read the value and assign it to this field.
    Bound(FieldInfo),
    /// The field no longer exists: read a value of this type and discard it.
    Skipped(Arc<TypeDescriptor>),
}

impl FieldSlot {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn field(&self) -> Option<&FieldInfo> {
        match self {
            Self::Bound(field) => Some(field),
            Self::Skipped(_) => None,
        }
    }

    /// Declared type of the value at this position.
    pub fn value_type(&self) -> Arc<TypeDescriptor> {
        match self {
            Self::Bound(field) => TypeDescriptor::for_type(&field.field_type()),
            Self::Skipped(ty) => Arc::clone(ty),
        }
    }
}

/// Ordered slots, shared between the cache and sessions.
pub type FieldPlan = Arc<[FieldSlot]>;
