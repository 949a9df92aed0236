// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identity and structure stamps.
//!
//! ```text
//! identity stamp:   module-ref  definition-name  varint(argc)  type-ref*argc
//! structure stamp:  type-ref(base | null)  varint(fieldc)  field*fieldc
//! field:            qualified-name  type-ref(declared)  transient-byte
//! ```
//!
//! Module and type references are written by the session through
//! [`StampWriter`] and read back through [`StampReader`]; this module only
//! decides what goes between them.

use super::type_desc::{StoredShape, StreamShape};
use super::{FieldDescriptor, FieldPlan, TypeDescriptor};
use crate::codec::{PrimitiveReader, PrimitiveWriter};
use crate::error::{Error, Result};
use crate::module::{Module, ModuleDescriptor};
use crate::tolerance::VersionTolerance;
use std::io::{Read, Write};
use std::sync::Arc;

// Caps preallocation driven by counts read from the stream.
const MAX_PREALLOC_ENTRIES: usize = 256;

/// Write side of a session, as seen by descriptors.
pub trait StampWriter {
    type Stream: Write;

    fn codec(&mut self) -> &mut PrimitiveWriter<Self::Stream>;

    fn write_module_ref(&mut self, module: &ModuleDescriptor) -> Result<()>;

    /// Reference to a type, `None` for the null sentinel.
    fn write_type_ref(&mut self, ty: Option<&Arc<TypeDescriptor>>) -> Result<()>;

    /// Mark the structure stamp of `ty` as written in this session. Returns
    /// false if it already was.
    fn claim_structure_stamp(&mut self, ty: &TypeDescriptor) -> bool;

    fn treat_collection_as_user_object(&self) -> bool {
        false
    }
}

/// Read side of a session, as seen by descriptors.
pub trait StampReader {
    type Stream: Read;

    fn codec(&mut self) -> &mut PrimitiveReader<Self::Stream>;

    /// Module identity as written, plus the module it resolved to.
    fn read_module_ref(&mut self) -> Result<(ModuleDescriptor, Arc<Module>)>;

    fn read_type_ref(&mut self) -> Result<Option<Arc<TypeDescriptor>>>;

    /// Mark the structure stamp of `ty` as read in this session. Returns
    /// false if it already was.
    fn claim_structure_stamp(&mut self, ty: &TypeDescriptor) -> bool;

    fn policy(&self) -> VersionTolerance {
        VersionTolerance::EXACT
    }

    fn treat_collection_as_user_object(&self) -> bool {
        false
    }
}

/// Result of reading an identity stamp.
#[derive(Debug, Clone)]
pub struct TypeStamp {
    /// Descriptor of the resolved current type.
    pub descriptor: Arc<TypeDescriptor>,
    /// Module identity as recorded by the writer.
    pub stored_module: ModuleDescriptor,
}

impl TypeDescriptor {
    pub fn write_type_stamp<S: StampWriter + ?Sized>(&self, writer: &mut S) -> Result<()> {
        writer.write_module_ref(self.module_descriptor())?;
        writer.codec().write_str(self.definition_name())?;
        let args = self.generic_args();
        writer.codec().write_varint(args.len() as u64)?;
        for arg in &args {
            writer.write_type_ref(Some(arg))?;
        }
        Ok(())
    }

    /// Read an identity stamp and resolve it to a current type.
    pub fn read_type_stamp<S: StampReader + ?Sized>(reader: &mut S) -> Result<TypeStamp> {
        let (stored_module, module) = reader.read_module_ref()?;
        let name = reader.codec().read_string()?;
        let count = reader.codec().read_len()?;
        let mut args = Vec::with_capacity(count.min(MAX_PREALLOC_ENTRIES));
        for _ in 0..count {
            let arg = reader.read_type_ref()?.ok_or_else(|| {
                Error::Malformed(format!("null generic argument for {}", name))
            })?;
            args.push(arg.ty().clone());
        }
        let ty = module.resolve(&name, &args)?;
        Ok(TypeStamp {
            descriptor: TypeDescriptor::for_type(&ty),
            stored_module,
        })
    }

    /// Base reference or null, field count, then each persisted field.
    pub fn write_structure_stamp<S: StampWriter + ?Sized>(&self, writer: &mut S) -> Result<()> {
        // cloned out so no lock is held while nested references are written
        let base = self.base();
        let fields = self.fields();
        writer.write_type_ref(base.as_ref())?;
        writer.codec().write_varint(fields.len() as u64)?;
        for field in &fields {
            field.write_to(writer)?;
        }
        Ok(())
    }

    /// Write the structure stamp unless the type needs none or it was
    /// already written in this session.
    pub fn write_structure_stamp_if_needed<S: StampWriter + ?Sized>(&self, writer: &mut S) -> Result<bool> {
        if !self.needs_structure_stamp(writer.treat_collection_as_user_object())
            || !writer.claim_structure_stamp(self)
        {
            return Ok(false);
        }
        self.write_structure_stamp(writer)?;
        Ok(true)
    }

    /// Read a structure stamp written under `stored_module`, reconcile it
    /// with the current type and record the result in this descriptor.
    pub fn read_structure_stamp<S: StampReader + ?Sized>(
        &self,
        reader: &mut S,
        stored_module: &ModuleDescriptor,
        policy: VersionTolerance,
    ) -> Result<FieldPlan> {
        let base = reader.read_type_ref()?;
        let count = reader.codec().read_len()?;
        let mut fields = Vec::with_capacity(count.min(MAX_PREALLOC_ENTRIES));
        for _ in 0..count {
            fields.push(FieldDescriptor::read_from(reader)?);
        }
        let stored = StoredShape {
            module: stored_module.clone(),
            base,
            fields,
        };
        let plan = self.verify_structure(&stored, policy)?;
        self.record_stream_shape(StreamShape {
            stored,
            plan: plan.clone(),
        });
        Ok(plan)
    }

    /// Read the structure stamp if this type has one that was not yet read
    /// in this session.
    pub fn read_structure_stamp_if_needed<S: StampReader + ?Sized>(
        &self,
        reader: &mut S,
        stored_module: &ModuleDescriptor,
    ) -> Result<Option<FieldPlan>> {
        if !self.needs_structure_stamp(reader.treat_collection_as_user_object())
            || !reader.claim_structure_stamp(self)
        {
            return Ok(None);
        }
        let policy = reader.policy();
        self.read_structure_stamp(reader, stored_module, policy).map(Some)
    }
}
