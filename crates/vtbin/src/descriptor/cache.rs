// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide descriptor cache.

use super::TypeDescriptor;
use crate::reflect::{Type, TypeKey};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

/// Concurrent map from type identity to its one descriptor.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: DashMap<TypeKey, Arc<TypeDescriptor>>,
}

static GLOBAL: OnceLock<DescriptorCache> = OnceLock::new();

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache shared by every session in the process.
    pub fn global() -> &'static DescriptorCache {
        GLOBAL.get_or_init(DescriptorCache::new)
    }

    /// Existing descriptor, or a fresh placeholder that is inserted first and
    /// populated after the shard lock is released.
    pub fn get_or_create(&self, ty: &Type) -> Arc<TypeDescriptor> {
        let (descriptor, created) = match self.entries.entry(ty.key().clone()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let descriptor = Arc::new(TypeDescriptor::placeholder(ty.clone()));
                entry.insert(Arc::clone(&descriptor));
                (descriptor, true)
            }
        };
        if created {
            descriptor.init();
        }
        descriptor
    }

    pub fn get(&self, key: &TypeKey) -> Option<Arc<TypeDescriptor>> {
        self.entries.get(key).map(|d| Arc::clone(d.value()))
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
