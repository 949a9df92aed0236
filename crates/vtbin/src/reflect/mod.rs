// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field-metadata provider.
//!
//! Runtime type handles ([`Type`]) and their declared fields ([`FieldInfo`]),
//! registered explicitly through [`TypeBuilder`] or `#[derive(Reflect)]`.
//! The descriptor engine reads shapes only through this module.
//!
//! Field and base types are [`LazyType`]s: they resolve on first use, so a
//! type may refer to itself (directly or through a generic argument) without
//! recursing at definition time.
//!
//! ```
//! use vtbin::{LazyType, Module, ModuleDescriptor, ModuleVersion, ModuleVersionId, TypeBuilder};
//!
//! let module = Module::new(ModuleDescriptor::new(
//!     "doc.shapes",
//!     ModuleVersion::new(1, 0, 0, 0),
//!     ModuleVersionId::compute(b"doc.shapes"),
//! ));
//! let point = TypeBuilder::object(&module, "Point")
//!     .field("x", LazyType::of::<f64>())
//!     .field("y", LazyType::of::<f64>())
//!     .build();
//!
//! assert_eq!(point.full_name(), "Point");
//! assert_eq!(point.declared_fields()[1].qualified_name(), "Point::y");
//! assert!(module.get_type("Point").is_some());
//! ```

pub mod builder;
pub mod builtins;
pub mod generic;

pub use builder::TypeBuilder;
pub use builtins::{core_module, core_types, CoreTypes, CORE_MODULE_NAME};
pub use generic::GenericDefinition;

use crate::module::{Module, ModuleDescriptor};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Broad category of a type, used to decide whether it gets a structure stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Scalar handled entirely by the primitive codec.
    Primitive,
    /// Plain user object with declared fields.
    Object,
    /// Container whose element types travel as generic arguments.
    Collection,
}

/// Process-wide identity of a runtime type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    module_load_id: u64,
    full_name: String,
    // full names omit load ids, so instantiations carry their arguments' keys
    generic_args: Vec<TypeKey>,
}

impl TypeKey {
    pub fn module_load_id(&self) -> u64 {
        self.module_load_id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Keys of the generic arguments, empty for non-generic types.
    pub fn generic_args(&self) -> &[TypeKey] {
        &self.generic_args
    }
}

/// Implemented by Rust types that have a registered runtime type.
pub trait Reflect {
    fn reflect_type() -> Type;
}

// ============================================================================
// LazyType
// ============================================================================

/// Deferred type reference.
#[derive(Clone)]
pub struct LazyType(Arc<dyn Fn() -> Type + Send + Sync>);

impl LazyType {
    /// Resolve through `T::reflect_type` on demand.
    pub fn of<T: Reflect + ?Sized + 'static>() -> Self {
        Self(Arc::new(T::reflect_type))
    }

    /// Already-known type.
    pub fn resolved(ty: Type) -> Self {
        Self(Arc::new(move || ty.clone()))
    }

    pub fn from_fn(f: impl Fn() -> Type + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn get(&self) -> Type {
        (self.0)()
    }
}

impl From<Type> for LazyType {
    fn from(ty: Type) -> Self {
        Self::resolved(ty)
    }
}

impl fmt::Debug for LazyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyType(..)")
    }
}

// ============================================================================
// FieldInfo
// ============================================================================

struct FieldInner {
    name: String,
    qualified_name: String,
    declaring_type: String,
    module_load_id: u64,
    index: usize,
    field_type: LazyType,
    transient: bool,
    constructor_recreated: bool,
}

/// One declared field of a type: the access handle slot plans bind to.
#[derive(Clone)]
pub struct FieldInfo(Arc<FieldInner>);

impl FieldInfo {
    pub(crate) fn new(
        declaring: &TypeKey,
        index: usize,
        name: String,
        field_type: LazyType,
        transient: bool,
        constructor_recreated: bool,
    ) -> Self {
        Self(Arc::new(FieldInner {
            qualified_name: format!("{}::{}", declaring.full_name, name),
            name,
            declaring_type: declaring.full_name.clone(),
            module_load_id: declaring.module_load_id,
            index,
            field_type,
            transient,
            constructor_recreated,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// `Declaring::name`, unique across a base chain.
    pub fn qualified_name(&self) -> &str {
        &self.0.qualified_name
    }

    pub fn declaring_type(&self) -> &str {
        &self.0.declaring_type
    }

    /// Position among the declaring type's own fields.
    pub fn index(&self) -> usize {
        self.0.index
    }

    pub fn field_type(&self) -> Type {
        self.0.field_type.get()
    }

    /// Never written to streams.
    pub fn is_transient(&self) -> bool {
        self.0.transient
    }

    /// Transient, but rebuilt by construction logic after the persisted
    /// fields are read.
    pub fn is_constructor_recreated(&self) -> bool {
        self.0.constructor_recreated
    }
}

impl PartialEq for FieldInfo {
    fn eq(&self, other: &Self) -> bool {
        self.0.module_load_id == other.0.module_load_id
            && self.0.qualified_name == other.0.qualified_name
    }
}

impl Eq for FieldInfo {}

impl Hash for FieldInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.module_load_id.hash(state);
        self.0.qualified_name.hash(state);
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("FieldInfo");
        d.field("name", &self.0.qualified_name);
        if self.0.transient {
            d.field("transient", &true);
        }
        if self.0.constructor_recreated {
            d.field("constructor_recreated", &true);
        }
        d.finish()
    }
}

// ============================================================================
// Type
// ============================================================================

pub(crate) struct TypeInner {
    pub(crate) module: Arc<Module>,
    pub(crate) key: TypeKey,
    pub(crate) definition_name: String,
    pub(crate) generic_args: Vec<Type>,
    pub(crate) kind: TypeKind,
    pub(crate) base: Option<LazyType>,
    pub(crate) fields: Vec<FieldInfo>,
}

/// Runtime type handle. Cheap to clone; equality is identity.
#[derive(Clone)]
pub struct Type(pub(crate) Arc<TypeInner>);

impl Type {
    pub fn module(&self) -> &Arc<Module> {
        &self.0.module
    }

    pub fn module_descriptor(&self) -> &ModuleDescriptor {
        self.0.module.descriptor()
    }

    pub fn key(&self) -> &TypeKey {
        &self.0.key
    }

    /// Name of the (generic) definition within its module.
    pub fn definition_name(&self) -> &str {
        &self.0.definition_name
    }

    /// Definition name plus generic arguments, e.g.
    /// ``Vec`1[[i32, vtbin.core]]``.
    pub fn full_name(&self) -> &str {
        &self.0.key.full_name
    }

    pub fn generic_args(&self) -> &[Type] {
        &self.0.generic_args
    }

    pub fn is_generic(&self) -> bool {
        !self.0.generic_args.is_empty()
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn base(&self) -> Option<Type> {
        self.0.base.as_ref().map(LazyType::get)
    }

    /// Fields declared by this type itself, in declaration order.
    pub fn declared_fields(&self) -> &[FieldInfo] {
        &self.0.fields
    }

    /// Serialization order: root base type's fields first, then each derived
    /// type's own fields in declaration order.
    pub fn fields_in_serialization_order(&self) -> Vec<FieldInfo> {
        let mut chain = vec![self.clone()];
        let mut seen = HashSet::new();
        seen.insert(self.key().clone());
        let mut next = self.base();
        while let Some(base) = next {
            if !seen.insert(base.key().clone()) {
                log::debug!("[reflect] base chain of {} loops at {}", self, base);
                break;
            }
            next = base.base();
            chain.push(base);
        }
        chain
            .iter()
            .rev()
            .flat_map(|ty| ty.declared_fields().iter().cloned())
            .collect()
    }

    /// Full name qualified by module name.
    pub(crate) fn assembly_qualified_name(&self) -> String {
        format!("{}, {}", self.full_name(), self.0.module.name())
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.key == other.0.key
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key.hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({} @ {}#{})", self.full_name(), self.0.module.name(), self.0.key.module_load_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleVersion, ModuleVersionId};

    fn module(name: &str) -> Arc<Module> {
        Module::new(ModuleDescriptor::new(
            name,
            ModuleVersion::new(1, 0, 0, 0),
            ModuleVersionId::compute(name.as_bytes()),
        ))
    }

    #[test]
    fn test_serialization_order_base_first() {
        let m = module("reflect.order");
        let root = TypeBuilder::object(&m, "Root")
            .field("id", LazyType::of::<u32>())
            .build();
        let mid = TypeBuilder::object(&m, "Mid")
            .base(root.clone())
            .field("name", LazyType::of::<String>())
            .build();
        let leaf = TypeBuilder::object(&m, "Leaf")
            .base(mid)
            .field("a", LazyType::of::<bool>())
            .field("b", LazyType::of::<i64>())
            .build();

        let names: Vec<String> = leaf
            .fields_in_serialization_order()
            .iter()
            .map(|f| f.qualified_name().to_string())
            .collect();
        assert_eq!(names, ["Root::id", "Mid::name", "Leaf::a", "Leaf::b"]);
        assert_eq!(leaf.declared_fields()[1].index(), 1);
    }

    #[test]
    fn test_identity_is_per_module_load() {
        let a = module("reflect.twin");
        let b = module("reflect.twin");
        let ta = TypeBuilder::object(&a, "Thing").build();
        let tb = TypeBuilder::object(&b, "Thing").build();
        assert_eq!(ta.full_name(), tb.full_name());
        assert_ne!(ta, tb);
        assert_eq!(ta, a.get_type("Thing").expect("registered"));
    }

    #[test]
    fn test_self_referential_field() {
        let m = module("reflect.cycle");
        let m2 = Arc::clone(&m);
        let node = TypeBuilder::object(&m, "Node")
            .field(
                "next",
                LazyType::from_fn(move || m2.get_type("Node").expect("registered")),
            )
            .build();
        let next = node.declared_fields()[0].field_type();
        assert_eq!(next, node);
    }

    #[test]
    fn test_field_flags() {
        let m = module("reflect.flags");
        let ty = TypeBuilder::object(&m, "Flags")
            .field("kept", LazyType::of::<u8>())
            .transient_field("cache", LazyType::of::<u8>())
            .constructor_field("handle", LazyType::of::<u8>())
            .build();
        let fields = ty.declared_fields();
        assert!(!fields[0].is_transient());
        assert!(fields[1].is_transient() && !fields[1].is_constructor_recreated());
        assert!(fields[2].is_transient() && fields[2].is_constructor_recreated());
    }
}
