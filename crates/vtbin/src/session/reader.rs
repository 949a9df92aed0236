// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::codec::PrimitiveReader;
use crate::config::SessionConfig;
use crate::descriptor::{FieldPlan, StampReader, TypeDescriptor, TypeStamp};
use crate::error::{Error, Result};
use crate::module::{Module, ModuleDescriptor, ModuleResolver};
use crate::reflect::TypeKey;
use crate::tolerance::VersionTolerance;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

/// Read side of a stream, mirroring [`WriteSession`](super::WriteSession).
pub struct ReadSession<R: Read> {
    codec: PrimitiveReader<R>,
    resolver: Arc<dyn ModuleResolver>,
    config: SessionConfig,
    modules: Vec<(ModuleDescriptor, Arc<Module>)>,
    // None while the stamp for that id is still being read
    types: Vec<Option<TypeStamp>>,
    claimed: HashSet<TypeKey>,
    plans: HashMap<TypeKey, FieldPlan>,
}

impl<R: Read> ReadSession<R> {
    pub fn new(stream: R, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self::with_config(stream, resolver, SessionConfig::default())
    }

    pub fn with_config(stream: R, resolver: Arc<dyn ModuleResolver>, config: SessionConfig) -> Self {
        Self {
            codec: PrimitiveReader::with_config(stream, config.codec),
            resolver,
            config,
            modules: Vec::new(),
            types: Vec::new(),
            claimed: HashSet::new(),
            plans: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Primitive codec for field values.
    pub fn reader(&mut self) -> &mut PrimitiveReader<R> {
        &mut self.codec
    }

    /// Read a type reference and, the first time, its structure stamp.
    pub fn read_type(&mut self) -> Result<Arc<TypeDescriptor>> {
        let stamp = self
            .read_type_entry()?
            .ok_or_else(|| Error::Malformed("null type reference where a type is required".into()))?;
        let descriptor = stamp.descriptor;
        if let Some(plan) = descriptor.read_structure_stamp_if_needed(self, &stamp.stored_module)? {
            log::debug!(
                "[session] structure stamp read for {}: {} slots",
                descriptor.full_name(),
                plan.len()
            );
            self.plans.insert(descriptor.key().clone(), plan);
        }
        Ok(descriptor)
    }

    /// Slot plan for values of `descriptor` in this stream: the reconciled
    /// plan when a structure stamp was read, otherwise the live slots.
    pub fn field_plan(&self, descriptor: &TypeDescriptor) -> FieldPlan {
        self.plans
            .get(descriptor.key())
            .cloned()
            .unwrap_or_else(|| descriptor.field_slots())
    }

    /// Module identity recorded by the writer for a type read in this session.
    pub fn stored_module(&self, descriptor: &TypeDescriptor) -> Option<&ModuleDescriptor> {
        self.types
            .iter()
            .flatten()
            .find(|s| s.descriptor.key() == descriptor.key())
            .map(|s| &s.stored_module)
    }

    /// Consume the padding and return the stream at the next boundary.
    pub fn finish(self) -> Result<R> {
        log::debug!(
            "[session] read finished: {} modules, {} types",
            self.modules.len(),
            self.types.len()
        );
        self.codec.finish()
    }

    fn read_type_entry(&mut self) -> Result<Option<TypeStamp>> {
        let raw = self.codec.read_varint()?;
        if raw == 0 {
            return Ok(None);
        }
        let id = raw - 1;
        let next = self.types.len() as u64;
        if id < next {
            return self.types[id as usize]
                .clone()
                .map(Some)
                .ok_or(Error::UnknownReference { kind: "type", id });
        }
        if id > next {
            return Err(Error::UnknownReference { kind: "type", id });
        }
        // reserve the id: generic arguments inside the stamp take the next ones
        self.types.push(None);
        let stamp = TypeDescriptor::read_type_stamp(self)?;
        self.types[id as usize] = Some(stamp.clone());
        Ok(Some(stamp))
    }
}

impl<R: Read> StampReader for ReadSession<R> {
    type Stream = R;

    fn codec(&mut self) -> &mut PrimitiveReader<R> {
        &mut self.codec
    }

    fn read_module_ref(&mut self) -> Result<(ModuleDescriptor, Arc<Module>)> {
        let raw = self.codec.read_varint()?;
        let id = raw
            .checked_sub(1)
            .ok_or_else(|| Error::Malformed("null module reference".into()))?;
        let next = self.modules.len() as u64;
        if id < next {
            return Ok(self.modules[id as usize].clone());
        }
        if id > next {
            return Err(Error::UnknownReference { kind: "module", id });
        }
        let stored = ModuleDescriptor::read_from(&mut self.codec)?;
        let module = self.resolver.resolve_module(&stored)?;
        log::debug!(
            "[session] module {} resolved to {}",
            stored,
            module.descriptor()
        );
        self.modules.push((stored.clone(), Arc::clone(&module)));
        Ok((stored, module))
    }

    fn read_type_ref(&mut self) -> Result<Option<Arc<TypeDescriptor>>> {
        Ok(self.read_type_entry()?.map(|s| s.descriptor))
    }

    fn claim_structure_stamp(&mut self, ty: &TypeDescriptor) -> bool {
        self.claimed.insert(ty.key().clone())
    }

    fn policy(&self) -> VersionTolerance {
        self.config.tolerance
    }

    fn treat_collection_as_user_object(&self) -> bool {
        self.config.treat_collection_as_user_object
    }
}

impl<R: Read> std::fmt::Debug for ReadSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadSession")
            .field("codec", &self.codec)
            .field("tolerance", &self.config.tolerance)
            .field("modules", &self.modules.len())
            .field("types", &self.types.len())
            .field("plans", &self.plans.len())
            .finish()
    }
}
