// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # vtbin
//!
//! Version-tolerant binary serialization core: the pieces a graph serializer
//! needs to write objects today and read them back after their types have
//! evolved.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use vtbin::{
//!     FieldSlot, Module, ModuleDescriptor, ModuleRegistry, ModuleVersion, ModuleVersionId,
//!     ReadSession, TypeBuilder, WriteSession,
//! };
//!
//! let module = Module::new(ModuleDescriptor::new(
//!     "app.model",
//!     ModuleVersion::new(1, 0, 0, 0),
//!     ModuleVersionId::compute(b"app.model/1"),
//! ));
//! let point = TypeBuilder::object(&module, "Point")
//!     .field("x", vtbin::LazyType::of::<i32>())
//!     .field("y", vtbin::LazyType::of::<i32>())
//!     .build();
//!
//! let mut out = Vec::new();
//! let mut session = WriteSession::new(&mut out);
//! session.write_type(&point)?;
//! session.writer().write_i32(3)?;
//! session.writer().write_i32(-4)?;
//! session.finish()?;
//!
//! let registry = Arc::new(ModuleRegistry::new());
//! registry.register(Arc::clone(&module));
//! let mut reader = ReadSession::new(&out[..], registry);
//! let descriptor = reader.read_type()?;
//! let plan = reader.field_plan(&descriptor);
//! assert!(plan.iter().all(|slot| matches!(slot, FieldSlot::Bound(_))));
//! assert_eq!(reader.reader().read_i32()?, 3);
//! assert_eq!(reader.reader().read_i32()?, -4);
//! # Ok::<(), vtbin::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------+
//! |  session: WriteSession / ReadSession (reference tables)     |
//! +------------------------------------------------------------+
//! |  descriptor: TypeDescriptor, stamps, version tolerance      |
//! +------------------------------------------------------------+
//! |  reflect: Type, FieldInfo, generics     module: identity    |
//! +------------------------------------------------------------+
//! |  codec: PrimitiveWriter / PrimitiveReader, varints, padding |
//! +------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PrimitiveWriter`] / [`PrimitiveReader`] | Buffered scalar codec with boundary padding |
//! | [`Module`] / [`ModuleDescriptor`] | Unit of type publication and its identity |
//! | [`Type`] / [`TypeBuilder`] | Runtime type metadata |
//! | [`TypeDescriptor`] | Canonical per-type serialization metadata |
//! | [`VersionTolerance`] | Which evolutions a reader accepts |
//! | [`WriteSession`] / [`ReadSession`] | Per-stream stamp deduplication |
//!
//! ## Modules
//!
//! - [`codec`] - Primitive encoding, varints and padding
//! - [`module`] - Module identity and resolution
//! - [`reflect`] - Type metadata, generics and the core module
//! - [`descriptor`] - Descriptors, stamps and structure reconciliation
//! - [`session`] - Read and write sessions
//! - [`config`] / [`tolerance`] - Session options

// Allow the derive macro to work inside this crate's tests
extern crate self as vtbin;

/// Primitive binary codec (scalars, strings, time values, varints, padding).
pub mod codec;
/// Session and codec configuration.
pub mod config;
/// Type descriptors, type/structure stamps and version reconciliation.
pub mod descriptor;
/// Error type shared by every layer.
pub mod error;
/// Modules, module identity and module resolution.
pub mod module;
/// Runtime type metadata and the built-in core module.
pub mod reflect;
/// Read and write sessions with per-stream reference tables.
pub mod session;
/// Version tolerance flags.
pub mod tolerance;

pub use codec::{PrimitiveReader, PrimitiveWriter, PADDING_BOUNDARY};
pub use config::{CodecConfig, SessionConfig};
pub use descriptor::{
    CompareResult, DescriptorCache, FieldDescriptor, FieldPlan, FieldSlot, StampReader,
    StampWriter, StoredShape, TypeDescriptor,
};
pub use error::{Error, Result};
pub use module::{
    Module, ModuleDescriptor, ModuleRegistry, ModuleResolver, ModuleVersion, ModuleVersionId,
};
pub use reflect::{
    core_module, core_types, FieldInfo, GenericDefinition, LazyType, Type, TypeBuilder, TypeKey,
    TypeKind,
};
pub use session::{ReadSession, WriteSession};
pub use tolerance::VersionTolerance;

// Re-export Reflect trait and derive macro
pub use reflect::Reflect; // Trait (for type bounds)
pub use vtbin_codegen::Reflect; // Derive macro (for #[derive(vtbin::Reflect)])

/// vtbin version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> std::sync::Arc<Module> {
        Module::new(ModuleDescriptor::new(
            "vtbin.tests.derive",
            ModuleVersion::new(1, 0, 0, 0),
            ModuleVersionId::compute(b"derive"),
        ))
    }

    #[derive(Reflect)]
    #[vtbin(module = model, name = "Node")]
    #[allow(dead_code)]
    struct Node {
        value: i64,
        next: Option<Box<Node>>,
        #[vtbin(transient)]
        cached: u32,
    }

    #[test]
    fn test_derive_inside_crate() {
        let ty = <Node as reflect::Reflect>::reflect_type();
        assert_eq!(ty.full_name(), "Node");
        let names: Vec<_> = ty.declared_fields().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, ["value", "next", "cached"]);
        assert!(ty.declared_fields()[2].is_transient());
    }

    #[test]
    fn test_version_string() {
        assert!(!VERSION.is_empty());
    }
}
