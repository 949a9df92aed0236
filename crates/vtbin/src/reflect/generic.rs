// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic type definitions and their memoized instantiations.

use super::{Type, TypeBuilder, TypeKey, TypeKind};
use crate::error::{Error, Result};
use crate::module::Module;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Shapes an instantiation: receives a builder already closed over the
/// arguments and adds fields, a base, and so on.
pub type GenericShape = dyn Fn(TypeBuilder, &[Type]) -> TypeBuilder + Send + Sync;

/// An open generic type such as ``Vec`1``.
pub struct GenericDefinition {
    module: Arc<Module>,
    name: String,
    arity: usize,
    kind: TypeKind,
    shape: Box<GenericShape>,
    instances: DashMap<Vec<TypeKey>, Type>,
}

impl GenericDefinition {
    /// Define a generic type and register it in `module`.
    pub fn define(
        module: &Arc<Module>,
        name: impl Into<String>,
        arity: usize,
        kind: TypeKind,
        shape: impl Fn(TypeBuilder, &[Type]) -> TypeBuilder + Send + Sync + 'static,
    ) -> Arc<Self> {
        let def = Arc::new(Self {
            module: Arc::clone(module),
            name: name.into(),
            arity,
            kind,
            shape: Box::new(shape),
            instances: DashMap::new(),
        });
        module.register_generic(Arc::clone(&def));
        def
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Close over `args`, checking the argument count.
    pub fn close(&self, args: &[Type]) -> Result<Type> {
        if args.len() != self.arity {
            return Err(Error::GenericArity {
                type_name: self.name.clone(),
                expected: self.arity,
                found: args.len(),
            });
        }
        Ok(self.instantiate(args))
    }

    /// Memoized instantiation. Callers guarantee the arity.
    pub(crate) fn instantiate(&self, args: &[Type]) -> Type {
        let key: Vec<TypeKey> = args.iter().map(|a| a.key().clone()).collect();
        if let Some(existing) = self.instances.get(&key) {
            return existing.value().clone();
        }
        // built outside the shard lock; a racing builder loses to the first insert
        let builder = TypeBuilder::instantiation(&self.module, &self.name, args, self.kind);
        let built = (self.shape)(builder, args).build();
        self.instances.entry(key).or_insert(built).value().clone()
    }

    /// Instantiations created so far.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl fmt::Debug for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericDefinition")
            .field("module", &self.module.name())
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("kind", &self.kind)
            .field("instances", &self.instances.len())
            .finish()
    }
}
