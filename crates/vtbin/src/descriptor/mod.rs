// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors: canonical per-type metadata, stamps and the version
//! tolerance check.
//!
//! # Reconciliation
//!
//! Reading a structure stamp compares the shape a type had when the data was
//! written with its current shape, in this order:
//!
//! 1. Same module content token: the shape is unchanged, use the live slots.
//! 2. Different token: needs `ALLOW_MODULE_ID_CHANGE`.
//! 3. Different base type: needs `ALLOW_INHERITANCE_CHAIN_CHANGE`.
//! 4. Different module version: needs `ALLOW_MODULE_VERSION_CHANGE`.
//! 5. Fields by qualified name: a changed declared type always fails; added
//!    fields need `ALLOW_FIELD_ADDITION`, removed ones `ALLOW_FIELD_REMOVAL`.
//!
//! The resulting [`FieldPlan`] has one slot per stored field in stored order
//! ([`FieldSlot::Skipped`] for removed fields) followed by the current type's
//! constructor-recreated fields.

mod cache;
mod compare;
mod field;
mod slot;
mod stamp;
mod type_desc;

pub use cache::DescriptorCache;
pub use compare::{compare_fields, CompareResult, FieldChange};
pub use field::FieldDescriptor;
pub use slot::{FieldPlan, FieldSlot};
pub use stamp::{StampReader, StampWriter, TypeStamp};
pub use type_desc::{StoredShape, StreamShape, TypeDescriptor};

#[cfg(test)]
mod tests;
