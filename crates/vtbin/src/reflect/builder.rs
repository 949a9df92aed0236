// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder for runtime types.

use super::{FieldInfo, LazyType, Type, TypeInner, TypeKey, TypeKind};
use crate::module::Module;
use std::sync::Arc;

#[derive(Debug)]
struct PendingField {
    name: String,
    ty: LazyType,
    transient: bool,
    constructor_recreated: bool,
}

/// Builder for [`Type`] instances.
///
/// [`build`](Self::build) registers the type in its module under its
/// definition name, replacing any earlier definition. Generic instantiations
/// are not registered; their definition memoizes them instead.
#[derive(Debug)]
pub struct TypeBuilder {
    module: Arc<Module>,
    name: String,
    full_name: String,
    generic_args: Vec<Type>,
    kind: TypeKind,
    base: Option<LazyType>,
    fields: Vec<PendingField>,
}

impl TypeBuilder {
    fn with_kind(module: &Arc<Module>, name: impl Into<String>, kind: TypeKind) -> Self {
        let name = name.into();
        Self {
            module: Arc::clone(module),
            full_name: name.clone(),
            name,
            generic_args: Vec::new(),
            kind,
            base: None,
            fields: Vec::new(),
        }
    }

    /// Plain object type; gets a structure stamp.
    pub fn object(module: &Arc<Module>, name: impl Into<String>) -> Self {
        Self::with_kind(module, name, TypeKind::Object)
    }

    /// Collection type; opaque unless collections are treated as objects.
    pub fn collection(module: &Arc<Module>, name: impl Into<String>) -> Self {
        Self::with_kind(module, name, TypeKind::Collection)
    }

    /// Scalar type encoded by the primitive codec.
    pub fn primitive(module: &Arc<Module>, name: impl Into<String>) -> Self {
        Self::with_kind(module, name, TypeKind::Primitive)
    }

    /// Closed generic type `definition[[arg, module], ...]`.
    pub(crate) fn instantiation(
        module: &Arc<Module>,
        definition: &str,
        args: &[Type],
        kind: TypeKind,
    ) -> Self {
        let rendered: Vec<String> = args
            .iter()
            .map(|a| format!("[{}]", a.assembly_qualified_name()))
            .collect();
        let mut builder = Self::with_kind(module, definition, kind);
        builder.full_name = format!("{}[{}]", definition, rendered.join(","));
        builder.generic_args = args.to_vec();
        builder
    }

    /// Generic arguments this builder closes over.
    pub fn generic_args(&self) -> &[Type] {
        &self.generic_args
    }

    /// Set the base type.
    pub fn base(mut self, base: impl Into<LazyType>) -> Self {
        self.base = Some(base.into());
        self
    }

    fn push(mut self, name: impl Into<String>, ty: LazyType, transient: bool, recreated: bool) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            ty,
            transient,
            constructor_recreated: recreated,
        });
        self
    }

    /// Add a persisted field.
    pub fn field(self, name: impl Into<String>, ty: impl Into<LazyType>) -> Self {
        self.push(name, ty.into(), false, false)
    }

    /// Add a field that is never written.
    pub fn transient_field(self, name: impl Into<String>, ty: impl Into<LazyType>) -> Self {
        self.push(name, ty.into(), true, false)
    }

    /// Add a transient field that construction logic rebuilds after reading.
    pub fn constructor_field(self, name: impl Into<String>, ty: impl Into<LazyType>) -> Self {
        self.push(name, ty.into(), true, true)
    }

    /// Finish the type and register it in its module.
    pub fn build(self) -> Type {
        let key = TypeKey {
            module_load_id: self.module.load_id(),
            full_name: self.full_name,
            generic_args: self.generic_args.iter().map(|a| a.key().clone()).collect(),
        };
        let fields = self
            .fields
            .into_iter()
            .enumerate()
            .map(|(i, f)| FieldInfo::new(&key, i, f.name, f.ty, f.transient, f.constructor_recreated))
            .collect();
        let register = self.generic_args.is_empty();
        let ty = Type(Arc::new(TypeInner {
            module: self.module,
            key,
            definition_name: self.name,
            generic_args: self.generic_args,
            kind: self.kind,
            base: self.base,
            fields,
        }));
        if register {
            ty.module().register_type(ty.clone());
        }
        log::debug!("[reflect] built {:?}", ty);
        ty
    }
}
