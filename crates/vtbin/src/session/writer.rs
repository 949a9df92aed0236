// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::codec::PrimitiveWriter;
use crate::config::SessionConfig;
use crate::descriptor::{StampWriter, TypeDescriptor};
use crate::error::Result;
use crate::module::ModuleDescriptor;
use crate::reflect::{Type, TypeKey};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;

/// Write side of a stream: owns the codec and the reference tables.
///
/// The first reference to a module or type assigns it the next id and is
/// followed inline by its stamp; later references are the id alone.
pub struct WriteSession<W: Write> {
    codec: PrimitiveWriter<W>,
    config: SessionConfig,
    modules: HashMap<ModuleDescriptor, u64>,
    types: HashMap<TypeKey, u64>,
    stamped: HashSet<TypeKey>,
}

impl<W: Write> WriteSession<W> {
    pub fn new(stream: W) -> Self {
        Self::with_config(stream, SessionConfig::default())
    }

    pub fn with_config(stream: W, config: SessionConfig) -> Self {
        Self {
            codec: PrimitiveWriter::with_config(stream, config.codec),
            config,
            modules: HashMap::new(),
            types: HashMap::new(),
            stamped: HashSet::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Primitive codec for field values.
    pub fn writer(&mut self) -> &mut PrimitiveWriter<W> {
        &mut self.codec
    }

    /// Type reference followed, the first time in this session, by the
    /// structure stamp.
    pub fn write_type(&mut self, ty: &Type) -> Result<Arc<TypeDescriptor>> {
        let descriptor = TypeDescriptor::for_type(ty);
        self.write_type_ref(Some(&descriptor))?;
        if descriptor.write_structure_stamp_if_needed(self)? {
            log::debug!("[session] structure stamp written for {}", descriptor.full_name());
        }
        Ok(descriptor)
    }

    /// Flush, pad and return the stream.
    pub fn finish(self) -> Result<W> {
        log::debug!(
            "[session] write finished: {} modules, {} types, {} bytes",
            self.modules.len(),
            self.types.len(),
            self.codec.position()
        );
        self.codec.finish()
    }
}

impl<W: Write> StampWriter for WriteSession<W> {
    type Stream = W;

    fn codec(&mut self) -> &mut PrimitiveWriter<W> {
        &mut self.codec
    }

    fn write_module_ref(&mut self, module: &ModuleDescriptor) -> Result<()> {
        if let Some(&id) = self.modules.get(module) {
            return self.codec.write_varint(id + 1);
        }
        let id = self.modules.len() as u64;
        self.modules.insert(module.clone(), id);
        self.codec.write_varint(id + 1)?;
        module.write_to(&mut self.codec)
    }

    fn write_type_ref(&mut self, ty: Option<&Arc<TypeDescriptor>>) -> Result<()> {
        let Some(ty) = ty else {
            return self.codec.write_varint(0);
        };
        if let Some(&id) = self.types.get(ty.key()) {
            return self.codec.write_varint(id + 1);
        }
        // id taken before the stamp so nested arguments get later ids
        let id = self.types.len() as u64;
        self.types.insert(ty.key().clone(), id);
        self.codec.write_varint(id + 1)?;
        ty.write_type_stamp(self)
    }

    fn claim_structure_stamp(&mut self, ty: &TypeDescriptor) -> bool {
        self.stamped.insert(ty.key().clone())
    }

    fn treat_collection_as_user_object(&self) -> bool {
        self.config.treat_collection_as_user_object
    }
}

impl<W: Write> std::fmt::Debug for WriteSession<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteSession")
            .field("codec", &self.codec)
            .field("modules", &self.modules.len())
            .field("types", &self.types.len())
            .field("stamped", &self.stamped.len())
            .finish()
    }
}
