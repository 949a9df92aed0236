// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field descriptors.

use super::stamp::{StampReader, StampWriter};
use super::TypeDescriptor;
use crate::error::{Error, Result};
use crate::reflect::FieldInfo;
use crate::tolerance::VersionTolerance;
use std::fmt;
use std::sync::Arc;

/// Persisted metadata of one field.
///
/// Descriptors built from the current type carry the [`FieldInfo`] they
/// describe; descriptors read from a structure stamp do not.
#[derive(Clone)]
pub struct FieldDescriptor {
    qualified_name: String,
    field_type: Arc<TypeDescriptor>,
    transient: bool,
    info: Option<FieldInfo>,
}

impl FieldDescriptor {
    /// Describe a declared field. The field type goes through the cache and
    /// may still be a placeholder.
    pub fn from_field(info: &FieldInfo) -> Self {
        Self {
            qualified_name: info.qualified_name().to_string(),
            field_type: TypeDescriptor::for_type(&info.field_type()),
            transient: info.is_transient(),
            info: Some(info.clone()),
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn field_type(&self) -> &Arc<TypeDescriptor> {
        &self.field_type
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Access handle, present only for current-type descriptors.
    pub fn info(&self) -> Option<&FieldInfo> {
        self.info.as_ref()
    }

    /// Same declared type: identical under a strict policy, matching by
    /// name under `ALLOW_MODULE_VERSION_CHANGE`.
    pub fn is_compatible_with(&self, other: &FieldDescriptor, policy: VersionTolerance) -> bool {
        self.field_type.matches(&other.field_type, policy)
    }

    /// Qualified name, declared type reference, transience byte.
    pub fn write_to<S: StampWriter + ?Sized>(&self, writer: &mut S) -> Result<()> {
        writer.codec().write_str(&self.qualified_name)?;
        writer.write_type_ref(Some(&self.field_type))?;
        writer.codec().write_bool(self.transient)
    }

    pub fn read_from<S: StampReader + ?Sized>(reader: &mut S) -> Result<Self> {
        let qualified_name = reader.codec().read_string()?;
        let field_type = reader.read_type_ref()?.ok_or_else(|| {
            Error::Malformed(format!("field {} has a null declared type", qualified_name))
        })?;
        let transient = reader.codec().read_bool()?;
        Ok(Self {
            qualified_name,
            field_type,
            transient,
            info: None,
        })
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.qualified_name)
            .field("type", &self.field_type.full_name())
            .field("transient", &self.transient)
            .finish()
    }
}
