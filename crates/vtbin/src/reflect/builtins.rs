// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in `vtbin.core` module: primitive types and the standard generic
//! containers.

use super::{GenericDefinition, Reflect, Type, TypeBuilder, TypeKind};
use crate::module::{Module, ModuleDescriptor, ModuleVersion, ModuleVersionId};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, OnceLock};

pub const CORE_MODULE_NAME: &str = "vtbin.core";

const CORE_MODULE_VERSION: ModuleVersion = ModuleVersion::new(1, 0, 0, 0);

/// Handles to every built-in type.
#[derive(Debug)]
pub struct CoreTypes {
    pub module: Arc<Module>,
    pub bool: Type,
    pub u8: Type,
    pub u16: Type,
    pub u32: Type,
    pub u64: Type,
    pub i8: Type,
    pub i16: Type,
    pub i32: Type,
    pub i64: Type,
    pub f32: Type,
    pub f64: Type,
    pub char: Type,
    pub string: Type,
    pub datetime: Type,
    pub timespan: Type,
    /// ``Vec`1``, collection of its argument.
    pub vec: Arc<GenericDefinition>,
    /// ``Option`1``, zero or one of its argument.
    pub option: Arc<GenericDefinition>,
}

impl CoreTypes {
    fn create() -> Self {
        // stable across processes so core types always take the fast path
        let module = Module::new(ModuleDescriptor::new(
            CORE_MODULE_NAME,
            CORE_MODULE_VERSION,
            ModuleVersionId::compute(b"vtbin.core/1"),
        ));
        let prim = |name: &str| TypeBuilder::primitive(&module, name).build();
        Self {
            bool: prim("bool"),
            u8: prim("u8"),
            u16: prim("u16"),
            u32: prim("u32"),
            u64: prim("u64"),
            i8: prim("i8"),
            i16: prim("i16"),
            i32: prim("i32"),
            i64: prim("i64"),
            f32: prim("f32"),
            f64: prim("f64"),
            char: prim("char"),
            string: prim("String"),
            datetime: prim("DateTime"),
            timespan: prim("TimeDelta"),
            vec: GenericDefinition::define(&module, "Vec`1", 1, TypeKind::Collection, |b, _| b),
            option: GenericDefinition::define(&module, "Option`1", 1, TypeKind::Collection, |b, _| b),
            module,
        }
    }
}

static CORE: OnceLock<CoreTypes> = OnceLock::new();

/// The built-in types, created on first use.
pub fn core_types() -> &'static CoreTypes {
    CORE.get_or_init(CoreTypes::create)
}

pub fn core_module() -> Arc<Module> {
    Arc::clone(&core_types().module)
}

macro_rules! reflect_primitive {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn reflect_type() -> Type {
                    core_types().$field.clone()
                }
            }
        )*
    };
}

reflect_primitive! {
    bool => bool,
    u8 => u8,
    u16 => u16,
    u32 => u32,
    u64 => u64,
    i8 => i8,
    i16 => i16,
    i32 => i32,
    i64 => i64,
    f32 => f32,
    f64 => f64,
    char => char,
    String => string,
    DateTime<Utc> => datetime,
    TimeDelta => timespan,
}

impl<T: Reflect> Reflect for Vec<T> {
    fn reflect_type() -> Type {
        core_types().vec.instantiate(&[T::reflect_type()])
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn reflect_type() -> Type {
        core_types().option.instantiate(&[T::reflect_type()])
    }
}

// Owning pointers are transparent: the stream stores the pointee.
impl<T: Reflect + ?Sized> Reflect for Box<T> {
    fn reflect_type() -> Type {
        T::reflect_type()
    }
}

impl<T: Reflect + ?Sized> Reflect for Arc<T> {
    fn reflect_type() -> Type {
        T::reflect_type()
    }
}
