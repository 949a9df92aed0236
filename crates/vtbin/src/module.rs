// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Module identity and resolution.
//!
//! A [`Module`] is the unit types are defined in. Its [`ModuleDescriptor`]
//! carries three pieces of identity:
//!
//! - the module name, the key used by resolvers;
//! - a [`ModuleVersion`], compared under [`VersionTolerance::ALLOW_MODULE_VERSION_CHANGE`];
//! - a [`ModuleVersionId`] content token, which changes with every build that
//!   changes the module's type shapes.
//!
//! Readers use a [`ModuleResolver`] to map a descriptor read from a stream to
//! the module loaded in this process.

use crate::codec::{PrimitiveReader, PrimitiveWriter};
use crate::error::{Error, Result};
use crate::reflect::{builtins, GenericDefinition, Type};
use crate::tolerance::VersionTolerance;
use dashmap::DashMap;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Version
// ============================================================================

/// Four-part module version, `major.minor.build.revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ModuleVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl ModuleVersion {
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for ModuleVersion {
    type Err = Error;

    /// Parse one to four dot-separated parts; missing parts are zero.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = [0u32; 4];
        let mut count = 0;
        for part in s.trim().split('.') {
            if count == 4 {
                return Err(Error::Malformed(format!("module version '{}' has more than four parts", s)));
            }
            parts[count] = part
                .parse()
                .map_err(|_| Error::Malformed(format!("invalid module version '{}'", s)))?;
            count += 1;
        }
        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

// ============================================================================
// Content token
// ============================================================================

/// 16-byte content-identity token of a module build.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModuleVersionId([u8; 16]);

impl ModuleVersionId {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn nil() -> Self {
        Self([0u8; 16])
    }

    /// Derive a token from the bytes that define a build (MD5 digest).
    pub fn compute(content: &[u8]) -> Self {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(content);
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

impl fmt::Display for ModuleVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ModuleVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleVersionId({})", self)
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Identity of a module as written to and read from streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleDescriptor {
    pub name: String,
    pub version: ModuleVersion,
    pub version_id: ModuleVersionId,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, version: ModuleVersion, version_id: ModuleVersionId) -> Self {
        Self {
            name: name.into(),
            version,
            version_id,
        }
    }

    /// Identity comparison. Strict compares name and version; with
    /// `ALLOW_MODULE_VERSION_CHANGE` only the name must match. The content
    /// token is never part of this check.
    pub fn matches(&self, other: &ModuleDescriptor, policy: VersionTolerance) -> bool {
        if self.name != other.name {
            return false;
        }
        policy.contains(VersionTolerance::ALLOW_MODULE_VERSION_CHANGE) || self.version == other.version
    }

    /// Name, four version varints, then the 16 token bytes.
    pub fn write_to<W: Write>(&self, writer: &mut PrimitiveWriter<W>) -> Result<()> {
        writer.write_str(&self.name)?;
        writer.write_u32(self.version.major)?;
        writer.write_u32(self.version.minor)?;
        writer.write_u32(self.version.build)?;
        writer.write_u32(self.version.revision)?;
        writer.write_bytes(self.version_id.as_bytes())
    }

    pub fn read_from<R: Read>(reader: &mut PrimitiveReader<R>) -> Result<Self> {
        let name = reader.read_string()?;
        let version = ModuleVersion::new(
            reader.read_u32()?,
            reader.read_u32()?,
            reader.read_u32()?,
            reader.read_u32()?,
        );
        let mut id = [0u8; 16];
        reader.read_bytes(&mut id)?;
        Ok(Self::new(name, version, ModuleVersionId::from_bytes(id)))
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.version_id)
    }
}

// ============================================================================
// Runtime module
// ============================================================================

static NEXT_LOAD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub(crate) enum TypeEntry {
    Concrete(Type),
    Generic(Arc<GenericDefinition>),
}

/// A loaded module: its identity plus the types defined in it.
///
/// Every `Module` value gets a process-unique load id, so two builds of the
/// same module loaded side by side define distinct types even when their
/// names coincide.
pub struct Module {
    descriptor: ModuleDescriptor,
    load_id: u64,
    types: DashMap<String, TypeEntry>,
}

impl Module {
    pub fn new(descriptor: ModuleDescriptor) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            load_id: NEXT_LOAD_ID.fetch_add(1, Ordering::Relaxed),
            types: DashMap::new(),
        })
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn load_id(&self) -> u64 {
        self.load_id
    }

    pub(crate) fn register_type(&self, ty: Type) {
        let name = ty.definition_name().to_string();
        if self.types.insert(name.clone(), TypeEntry::Concrete(ty)).is_some() {
            log::debug!("[module] {}: type {} redefined", self.descriptor.name, name);
        }
    }

    pub(crate) fn register_generic(&self, def: Arc<GenericDefinition>) {
        let name = def.name().to_string();
        if self.types.insert(name.clone(), TypeEntry::Generic(def)).is_some() {
            log::debug!("[module] {}: generic {} redefined", self.descriptor.name, name);
        }
    }

    /// Non-generic type by definition name.
    pub fn get_type(&self, name: &str) -> Option<Type> {
        match self.types.get(name).map(|e| e.value().clone()) {
            Some(TypeEntry::Concrete(ty)) => Some(ty),
            _ => None,
        }
    }

    /// Generic definition by definition name.
    pub fn get_generic(&self, name: &str) -> Option<Arc<GenericDefinition>> {
        match self.types.get(name).map(|e| e.value().clone()) {
            Some(TypeEntry::Generic(def)) => Some(def),
            _ => None,
        }
    }

    /// Sorted definition names.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Resolve a definition name, closing generic definitions over `args`.
    pub fn resolve(&self, name: &str, args: &[Type]) -> Result<Type> {
        // clone out so the shard lock is released before instantiation
        let entry = self.types.get(name).map(|e| e.value().clone());
        match entry {
            Some(TypeEntry::Concrete(ty)) if args.is_empty() => Ok(ty),
            Some(TypeEntry::Concrete(_)) => Err(Error::GenericArity {
                type_name: name.to_string(),
                expected: 0,
                found: args.len(),
            }),
            Some(TypeEntry::Generic(def)) => def.close(args),
            None => Err(Error::UnresolvedType {
                module: self.descriptor.name.clone(),
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("descriptor", &self.descriptor)
            .field("load_id", &self.load_id)
            .field("types", &self.types.len())
            .finish()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Maps a module identity read from a stream to a loaded module.
pub trait ModuleResolver: Send + Sync {
    fn resolve_module(&self, descriptor: &ModuleDescriptor) -> Result<Arc<Module>>;
}

/// Concurrent resolver keyed by module name.
///
/// Lookup ignores version and content token; those are judged later by the
/// version tolerance policy. The built-in core module is always present.
pub struct ModuleRegistry {
    modules: DashMap<String, Arc<Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        let modules = DashMap::new();
        let core = builtins::core_module();
        modules.insert(core.name().to_string(), core);
        Self { modules }
    }

    /// Register a module, returning the one it replaces.
    pub fn register(&self, module: Arc<Module>) -> Option<Arc<Module>> {
        log::debug!("[module] registered {}", module.descriptor());
        self.modules.insert(module.name().to_string(), module)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.get(name).map(|m| Arc::clone(m.value()))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleResolver for ModuleRegistry {
    fn resolve_module(&self, descriptor: &ModuleDescriptor) -> Result<Arc<Module>> {
        self.get(&descriptor.name).ok_or_else(|| Error::UnresolvedModule {
            name: descriptor.name.clone(),
            version: descriptor.version,
        })
    }
}

impl<T: ModuleResolver + ?Sized> ModuleResolver for Arc<T> {
    fn resolve_module(&self, descriptor: &ModuleDescriptor) -> Result<Arc<Module>> {
        (**self).resolve_module(descriptor)
    }
}
