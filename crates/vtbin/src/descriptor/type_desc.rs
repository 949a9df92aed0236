// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors and the version tolerance check.

use super::cache::DescriptorCache;
use super::compare::{compare_fields, CompareResult};
use super::{FieldDescriptor, FieldPlan, FieldSlot};
use crate::error::{Error, Result};
use crate::module::ModuleDescriptor;
use crate::reflect::{FieldInfo, Type, TypeKey, TypeKind};
use crate::tolerance::VersionTolerance;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shape of a type as read from a structure stamp.
#[derive(Debug, Clone)]
pub struct StoredShape {
    /// Module identity recorded when the data was written.
    pub module: ModuleDescriptor,
    pub base: Option<Arc<TypeDescriptor>>,
    pub fields: Vec<FieldDescriptor>,
}

/// Most recent stream-derived shape of a type and the plan reconciled from it.
#[derive(Debug, Clone)]
pub struct StreamShape {
    pub stored: StoredShape,
    pub plan: FieldPlan,
}

// Shape of the type as currently defined.
struct LiveShape {
    generic_args: Vec<Arc<TypeDescriptor>>,
    base: Option<Arc<TypeDescriptor>>,
    fields: Vec<FieldDescriptor>,
    slots: FieldPlan,
}

impl LiveShape {
    fn compute(ty: &Type) -> Self {
        let generic_args = ty.generic_args().iter().map(TypeDescriptor::for_type).collect();
        let base = ty.base().map(|b| TypeDescriptor::for_type(&b));
        let ordered = ty.fields_in_serialization_order();
        let fields = ordered
            .iter()
            .filter(|f| !f.is_transient())
            .map(FieldDescriptor::from_field)
            .collect();
        let slots = ordered.into_iter().map(FieldSlot::Bound).collect();
        Self {
            generic_args,
            base,
            fields,
            slots,
        }
    }
}

#[derive(Default)]
struct DescriptorState {
    initialized: bool,
    generic_args: Vec<Arc<TypeDescriptor>>,
    base: Option<Arc<TypeDescriptor>>,
    fields: Vec<FieldDescriptor>,
    slots: Option<FieldPlan>,
    stamped: Option<StreamShape>,
}

/// Canonical, process-wide metadata for one runtime type.
///
/// Obtain descriptors through [`TypeDescriptor::for_type`]; there is exactly
/// one per type per process. Descriptors are inserted into the cache before
/// they are populated, so a descriptor reached while its own population is
/// still running reports `is_initialized() == false`.
pub struct TypeDescriptor {
    ty: Type,
    state: RwLock<DescriptorState>,
}

impl TypeDescriptor {
    pub(crate) fn placeholder(ty: Type) -> Self {
        Self {
            ty,
            state: RwLock::new(DescriptorState::default()),
        }
    }

    /// Cached descriptor for `ty`, created and populated on first access.
    pub fn for_type(ty: &Type) -> Arc<TypeDescriptor> {
        DescriptorCache::global().get_or_create(ty)
    }

    /// Populate from the runtime type. Idempotent; leaves the stream-derived
    /// shape untouched.
    pub(crate) fn init(&self) {
        if self.state.read().initialized {
            return;
        }
        // computed without holding the lock: field types may lead back here
        let live = LiveShape::compute(&self.ty);
        let mut state = self.state.write();
        state.generic_args = live.generic_args;
        state.base = live.base;
        state.fields = live.fields;
        state.slots = Some(live.slots);
        state.initialized = true;
        log::debug!(
            "[descriptor] initialized {} ({} fields)",
            self.ty.full_name(),
            state.fields.len()
        );
    }

    fn ensure_initialized(&self) {
        if !self.state.read().initialized {
            self.init();
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn key(&self) -> &TypeKey {
        self.ty.key()
    }

    pub fn full_name(&self) -> &str {
        self.ty.full_name()
    }

    pub fn definition_name(&self) -> &str {
        self.ty.definition_name()
    }

    pub fn kind(&self) -> TypeKind {
        self.ty.kind()
    }

    pub fn module_descriptor(&self) -> &ModuleDescriptor {
        self.ty.module_descriptor()
    }

    pub fn generic_args(&self) -> Vec<Arc<TypeDescriptor>> {
        self.ensure_initialized();
        self.state.read().generic_args.clone()
    }

    pub fn base(&self) -> Option<Arc<TypeDescriptor>> {
        self.ensure_initialized();
        self.state.read().base.clone()
    }

    /// Non-transient fields in serialization order.
    pub fn fields(&self) -> Vec<FieldDescriptor> {
        self.ensure_initialized();
        self.state.read().fields.clone()
    }

    /// Every field of the current type, transient or not, bound.
    pub fn field_slots(&self) -> FieldPlan {
        self.ensure_initialized();
        self.state
            .read()
            .slots
            .clone()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Plan from the most recent structure stamp read for this type, or the
    /// live slots when none has been read.
    pub fn fields_to_deserialize(&self) -> FieldPlan {
        if let Some(shape) = &self.state.read().stamped {
            return shape.plan.clone();
        }
        self.field_slots()
    }

    /// Most recent stream-derived shape.
    pub fn stream_shape(&self) -> Option<StreamShape> {
        self.state.read().stamped.clone()
    }

    pub(crate) fn record_stream_shape(&self, shape: StreamShape) {
        self.state.write().stamped = Some(shape);
    }

    /// Whether values of this type carry a structure stamp.
    pub fn needs_structure_stamp(&self, treat_collection_as_user_object: bool) -> bool {
        match self.kind() {
            TypeKind::Object => true,
            TypeKind::Collection => treat_collection_as_user_object,
            TypeKind::Primitive => false,
        }
    }

    /// Relaxed equality: identity under a strict policy; under
    /// `ALLOW_MODULE_VERSION_CHANGE`, equal full names in matching modules.
    pub fn matches(&self, other: &TypeDescriptor, policy: VersionTolerance) -> bool {
        if self == other {
            return true;
        }
        policy.contains(VersionTolerance::ALLOW_MODULE_VERSION_CHANGE)
            && self.full_name() == other.full_name()
            && self
                .module_descriptor()
                .matches(other.module_descriptor(), policy)
    }

    /// Compare the current persisted fields against `previous`.
    pub fn compare_with(&self, previous: &[FieldDescriptor], policy: VersionTolerance) -> CompareResult {
        let mut result = compare_fields(&self.fields(), previous, policy);
        result.recreated = recreated_fields(&self.field_slots());
        result
    }

    /// Reconcile a stored shape with the current type, producing the slot
    /// plan for values written under the stored shape.
    pub fn verify_structure(&self, stored: &StoredShape, policy: VersionTolerance) -> Result<FieldPlan> {
        let current_module = self.module_descriptor();

        if stored.module.version_id == current_module.version_id {
            log::debug!(
                "[descriptor] {}: module token unchanged, live plan",
                self.full_name()
            );
            return Ok(self.field_slots());
        }
        if !policy.contains(VersionTolerance::ALLOW_MODULE_ID_CHANGE) {
            return Err(Error::IncompatibleModuleIdentity {
                type_name: self.full_name().to_string(),
                stored: stored.module.version_id,
                current: current_module.version_id,
            });
        }
        log::warn!(
            "[descriptor] {}: module {} content changed ({} -> {}), tolerated",
            self.full_name(),
            current_module.name,
            stored.module.version_id,
            current_module.version_id
        );

        let current = LiveShape::compute(&self.ty);

        let same_base = match (&stored.base, &current.base) {
            (None, None) => true,
            (Some(old), Some(new)) => old.matches(new, policy),
            _ => false,
        };
        if !same_base {
            if !policy.contains(VersionTolerance::ALLOW_INHERITANCE_CHAIN_CHANGE) {
                return Err(Error::IncompatibleInheritance {
                    type_name: self.full_name().to_string(),
                    stored: base_name(stored.base.as_ref()),
                    current: base_name(current.base.as_ref()),
                });
            }
            log::warn!(
                "[descriptor] {}: base changed from {} to {}, tolerated",
                self.full_name(),
                base_name(stored.base.as_ref()),
                base_name(current.base.as_ref())
            );
        }

        if stored.module.version != current_module.version
            && !policy.contains(VersionTolerance::ALLOW_MODULE_VERSION_CHANGE)
        {
            return Err(Error::IncompatibleVersion {
                type_name: self.full_name().to_string(),
                module: current_module.name.clone(),
                stored: stored.module.version,
                current: current_module.version,
            });
        }

        let mut diff = compare_fields(&current.fields, &stored.fields, policy);
        diff.recreated = recreated_fields(&current.slots);

        if let Some(change) = diff.fields_changed.first() {
            return Err(Error::FieldTypeChanged {
                type_name: self.full_name().to_string(),
                field: change.current.qualified_name().to_string(),
                stored: change.previous.field_type().full_name().to_string(),
                current: change.current.field_type().full_name().to_string(),
            });
        }
        if !diff.fields_added.is_empty() {
            if !policy.contains(VersionTolerance::ALLOW_FIELD_ADDITION) {
                return Err(Error::FieldAdded {
                    type_name: self.full_name().to_string(),
                    fields: diff.added_names(),
                });
            }
            log::warn!(
                "[descriptor] {}: fields added, left at their defaults: {}",
                self.full_name(),
                diff.added_names().join(", ")
            );
        }
        if !diff.fields_removed.is_empty() {
            if !policy.contains(VersionTolerance::ALLOW_FIELD_REMOVAL) {
                return Err(Error::FieldRemoved {
                    type_name: self.full_name().to_string(),
                    fields: diff.removed_names(),
                });
            }
            log::warn!(
                "[descriptor] {}: fields removed, values skipped: {}",
                self.full_name(),
                diff.removed_names().join(", ")
            );
        }

        let bound: HashMap<&str, &FieldInfo> = current
            .fields
            .iter()
            .filter_map(|f| f.info().map(|info| (f.qualified_name(), info)))
            .collect();
        let mut plan = Vec::with_capacity(stored.fields.len() + diff.recreated.len());
        for field in stored.fields.iter().filter(|f| !f.is_transient()) {
            let slot = match bound.get(field.qualified_name()) {
                Some(info) if !diff.is_removed(field.qualified_name()) => FieldSlot::Bound((*info).clone()),
                _ => FieldSlot::Skipped(Arc::clone(field.field_type())),
            };
            plan.push(slot);
        }
        plan.extend(diff.recreated.into_iter().map(FieldSlot::Bound));

        log::debug!(
            "[descriptor] {}: reconciled plan of {} slots",
            self.full_name(),
            plan.len()
        );
        Ok(plan.into())
    }

    /// Multi-line dump of the current shape, plus the stream-derived shape
    /// when one has been read.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let module = self.module_descriptor();
        let _ = writeln!(out, "{} [{} {}]", self.full_name(), module.name, module.version);
        let _ = writeln!(out, "  base: {}", base_name(self.base().as_ref()));
        for slot in self.field_slots().iter() {
            if let FieldSlot::Bound(info) = slot {
                let flag = match (info.is_transient(), info.is_constructor_recreated()) {
                    (true, true) => " (constructor)",
                    (true, false) => " (transient)",
                    _ => "",
                };
                let _ = writeln!(out, "  {}: {}{}", info.qualified_name(), info.field_type(), flag);
            }
        }
        if let Some(shape) = self.stream_shape() {
            let _ = writeln!(out, "  stored in {}:", shape.stored.module);
            for field in &shape.stored.fields {
                let _ = writeln!(out, "    {}: {}", field.qualified_name(), field.field_type().full_name());
            }
            for slot in shape.plan.iter() {
                match slot {
                    FieldSlot::Bound(info) => {
                        let _ = writeln!(out, "    -> {}", info.qualified_name());
                    }
                    FieldSlot::Skipped(ty) => {
                        let _ = writeln!(out, "    -> skip {}", ty.full_name());
                    }
                }
            }
        }
        out
    }
}

fn recreated_fields(slots: &[FieldSlot]) -> Vec<FieldInfo> {
    slots
        .iter()
        .filter_map(FieldSlot::field)
        .filter(|f| f.is_constructor_recreated())
        .cloned()
        .collect()
}

fn base_name(base: Option<&Arc<TypeDescriptor>>) -> String {
    base.map_or_else(|| "none".to_string(), |b| b.full_name().to_string())
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.key().hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // names only: the graph may be cyclic
        let state = self.state.read();
        f.debug_struct("TypeDescriptor")
            .field("type", &self.ty)
            .field("initialized", &state.initialized)
            .field("base", &state.base.as_ref().map(|b| b.full_name().to_string()))
            .field(
                "fields",
                &state.fields.iter().map(FieldDescriptor::qualified_name).collect::<Vec<_>>(),
            )
            .field("stamped", &state.stamped.is_some())
            .finish()
    }
}
