// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared helpers: module fixtures and a small value walker that drives the
//! sessions the way a graph serializer would.

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::Arc;
use vtbin::{
    CodecConfig, FieldSlot, Module, ModuleDescriptor, ModuleRegistry, ModuleVersionId, ReadSession,
    Result, SessionConfig, Type, TypeKind, VersionTolerance, WriteSession,
};

pub fn module(name: &str, version: &str, build: &str) -> Arc<Module> {
    Module::new(ModuleDescriptor::new(
        name,
        version.parse().expect("version"),
        ModuleVersionId::compute(build.as_bytes()),
    ))
}

pub fn registry(modules: &[&Arc<Module>]) -> Arc<ModuleRegistry> {
    let registry = Arc::new(ModuleRegistry::new());
    for m in modules {
        registry.register(Arc::clone(m));
    }
    registry
}

pub fn config(tolerance: VersionTolerance) -> SessionConfig {
    SessionConfig::new()
        .tolerance(tolerance)
        .codec(CodecConfig::new().buffer_size(64))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
    Time(DateTime<Utc>),
    Span(TimeDelta),
    List(Vec<Value>),
    Null,
    Object(Object),
    /// Placeholder for a constructor-recreated field after reading.
    Recreated,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

pub fn text(s: &str) -> Value {
    Value::Str(s.to_string())
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

pub fn write_value<W: Write>(session: &mut WriteSession<W>, ty: &Type, value: &Value) -> Result<()> {
    match ty.kind() {
        TypeKind::Primitive => write_primitive(session, ty, value),
        TypeKind::Collection => write_collection(session, ty, value),
        TypeKind::Object => {
            let Value::Object(obj) = value else {
                panic!("expected object for {}, got {:?}", ty.full_name(), value);
            };
            session.write_type(ty)?;
            for field in ty.fields_in_serialization_order() {
                if field.is_transient() {
                    continue;
                }
                let v = obj
                    .get(field.name())
                    .unwrap_or_else(|| panic!("missing value for {}", field.qualified_name()));
                write_value(session, &field.field_type(), v)?;
            }
            Ok(())
        }
    }
}

fn write_primitive<W: Write>(session: &mut WriteSession<W>, ty: &Type, value: &Value) -> Result<()> {
    let w = session.writer();
    match (ty.full_name(), value) {
        ("bool", Value::Bool(v)) => w.write_bool(*v),
        ("u8", Value::UInt(v)) => w.write_u8(*v as u8),
        ("u16", Value::UInt(v)) => w.write_u16(*v as u16),
        ("u32", Value::UInt(v)) => w.write_u32(*v as u32),
        ("u64", Value::UInt(v)) => w.write_u64(*v),
        ("i8", Value::Int(v)) => w.write_i8(*v as i8),
        ("i16", Value::Int(v)) => w.write_i16(*v as i16),
        ("i32", Value::Int(v)) => w.write_i32(*v as i32),
        ("i64", Value::Int(v)) => w.write_i64(*v),
        ("f32", Value::Float(v)) => w.write_f32(*v as f32),
        ("f64", Value::Float(v)) => w.write_f64(*v),
        ("char", Value::Char(v)) => w.write_char(*v),
        ("String", Value::Str(v)) => w.write_str(v),
        ("DateTime", Value::Time(v)) => w.write_datetime(v),
        ("TimeDelta", Value::Span(v)) => w.write_timespan(v),
        (name, v) => panic!("cannot write {:?} as {}", v, name),
    }
}

fn write_collection<W: Write>(session: &mut WriteSession<W>, ty: &Type, value: &Value) -> Result<()> {
    let element = ty.generic_args()[0].clone();
    match (ty.definition_name(), value) {
        ("Vec`1", Value::List(items)) => {
            session.writer().write_varint(items.len() as u64)?;
            for item in items {
                write_value(session, &element, item)?;
            }
            Ok(())
        }
        ("Option`1", Value::Null) => session.writer().write_bool(false),
        ("Option`1", v) => {
            session.writer().write_bool(true)?;
            write_value(session, &element, v)
        }
        (name, v) => panic!("cannot write {:?} as {}", v, name),
    }
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

pub fn read_value<R: Read>(session: &mut ReadSession<R>, ty: &Type) -> Result<Value> {
    match ty.kind() {
        TypeKind::Primitive => read_primitive(session, ty),
        TypeKind::Collection => read_collection(session, ty),
        TypeKind::Object => read_object(session).map(Value::Object),
    }
}

pub fn read_object<R: Read>(session: &mut ReadSession<R>) -> Result<Object> {
    let descriptor = session.read_type()?;
    let mut obj = Object::new(descriptor.full_name());
    for slot in session.field_plan(&descriptor).iter() {
        match slot {
            FieldSlot::Bound(info) if info.is_constructor_recreated() => {
                obj.fields.insert(info.name().to_string(), Value::Recreated);
            }
            FieldSlot::Bound(info) if info.is_transient() => {}
            FieldSlot::Bound(info) => {
                let v = read_value(session, &info.field_type())?;
                obj.fields.insert(info.name().to_string(), v);
            }
            FieldSlot::Skipped(_) => {
                let stored = slot.value_type();
                read_value(session, stored.ty())?;
            }
        }
    }
    Ok(obj)
}

fn read_primitive<R: Read>(session: &mut ReadSession<R>, ty: &Type) -> Result<Value> {
    let r = session.reader();
    Ok(match ty.full_name() {
        "bool" => Value::Bool(r.read_bool()?),
        "u8" => Value::UInt(u64::from(r.read_u8()?)),
        "u16" => Value::UInt(u64::from(r.read_u16()?)),
        "u32" => Value::UInt(u64::from(r.read_u32()?)),
        "u64" => Value::UInt(r.read_u64()?),
        "i8" => Value::Int(i64::from(r.read_i8()?)),
        "i16" => Value::Int(i64::from(r.read_i16()?)),
        "i32" => Value::Int(i64::from(r.read_i32()?)),
        "i64" => Value::Int(r.read_i64()?),
        "f32" => Value::Float(f64::from(r.read_f32()?)),
        "f64" => Value::Float(r.read_f64()?),
        "char" => Value::Char(r.read_char()?),
        "String" => Value::Str(r.read_string()?),
        "DateTime" => Value::Time(r.read_datetime()?),
        "TimeDelta" => Value::Span(r.read_timespan()?),
        other => panic!("unknown primitive {}", other),
    })
}

fn read_collection<R: Read>(session: &mut ReadSession<R>, ty: &Type) -> Result<Value> {
    let element = ty.generic_args()[0].clone();
    match ty.definition_name() {
        "Vec`1" => {
            let len = session.reader().read_len()?;
            let mut items = Vec::with_capacity(len.min(64));
            for _ in 0..len {
                items.push(read_value(session, &element)?);
            }
            Ok(Value::List(items))
        }
        "Option`1" => {
            if session.reader().read_bool()? {
                read_value(session, &element)
            } else {
                Ok(Value::Null)
            }
        }
        other => panic!("unknown collection {}", other),
    }
}
