// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::error::Error;
use crate::module::{Module, ModuleDescriptor, ModuleVersionId};
use crate::reflect::{core_types, LazyType, Reflect, Type, TypeBuilder};
use crate::tolerance::VersionTolerance;
use std::sync::Arc;

fn module(name: &str, version: &str, build: &str) -> Arc<Module> {
    Module::new(ModuleDescriptor::new(
        name,
        version.parse().expect("version"),
        ModuleVersionId::compute(build.as_bytes()),
    ))
}

fn person(m: &Arc<Module>, fields: &[(&str, LazyType)]) -> Arc<TypeDescriptor> {
    let mut builder = TypeBuilder::object(m, "Person");
    for (name, ty) in fields {
        builder = builder.field(*name, ty.clone());
    }
    TypeDescriptor::for_type(&builder.build())
}

fn stored(desc: &TypeDescriptor) -> StoredShape {
    StoredShape {
        module: desc.module_descriptor().clone(),
        base: desc.base(),
        fields: desc.fields(),
    }
}

fn slot_names(plan: &FieldPlan) -> Vec<String> {
    plan.iter()
        .map(|slot| match slot {
            FieldSlot::Bound(info) => info.qualified_name().to_string(),
            FieldSlot::Skipped(ty) => format!("skip {}", ty.full_name()),
        })
        .collect()
}

#[test]
fn test_cache_returns_same_instance() {
    let a = TypeDescriptor::for_type(&i32::reflect_type());
    let b = TypeDescriptor::for_type(&i32::reflect_type());
    assert!(Arc::ptr_eq(&a, &b));
    assert!(a.is_initialized());

    let c = TypeDescriptor::for_type(&i64::reflect_type());
    assert_ne!(a, c);
    assert!(DescriptorCache::global().contains(a.key()));
}

#[test]
fn test_same_name_in_distinct_modules_is_distinct() {
    let one = person(&module("desc.app", "1.0", "a"), &[]);
    let two = person(&module("desc.app", "1.0", "a"), &[]);
    assert_ne!(one, two);
    assert!(one.matches(&two, VersionTolerance::ALLOW_MODULE_VERSION_CHANGE));
    assert!(!one.matches(&two, VersionTolerance::EXACT));
}

#[test]
fn test_instantiations_over_distinct_builds_are_distinct() {
    let old = module("desc.gen", "1.0", "a");
    let new = module("desc.gen", "1.0", "a");
    let thing_old = TypeBuilder::object(&old, "Thing").build();
    let thing_new = TypeBuilder::object(&new, "Thing").build();

    let vec = &core_types().vec;
    let list_old = vec.close(&[thing_old.clone()]).expect("close");
    let list_new = vec.close(&[thing_new.clone()]).expect("close");
    assert_eq!(list_old.full_name(), list_new.full_name());
    assert_ne!(list_old, list_new);

    let d_old = TypeDescriptor::for_type(&list_old);
    let d_new = TypeDescriptor::for_type(&list_new);
    assert!(!Arc::ptr_eq(&d_old, &d_new));
    assert_ne!(d_old, d_new);
    assert_eq!(d_old.generic_args()[0].ty(), &thing_old);
    assert_eq!(d_new.generic_args()[0].ty(), &thing_new);
    assert_eq!(
        d_new.generic_args()[0].ty().module().load_id(),
        new.load_id()
    );
}

#[test]
fn test_cyclic_type_graph_terminates() {
    let m = module("desc.cycle", "1.0", "cycle");
    let (m1, m2) = (Arc::clone(&m), Arc::clone(&m));
    let node = TypeBuilder::object(&m, "Node")
        .field("value", LazyType::of::<i32>())
        .field(
            "next",
            LazyType::from_fn(move || {
                core_types()
                    .option
                    .instantiate(&[m1.get_type("Node").expect("registered")])
            }),
        )
        .field(
            "children",
            LazyType::from_fn(move || {
                core_types()
                    .vec
                    .instantiate(&[m2.get_type("Node").expect("registered")])
            }),
        )
        .build();

    let desc = TypeDescriptor::for_type(&node);
    let fields = desc.fields();
    assert_eq!(fields.len(), 3);
    let children = fields[2].field_type();
    assert!(Arc::ptr_eq(&children.generic_args()[0], &desc));
    assert!(children.is_initialized());
    assert_eq!(fields[1].field_type().generic_args()[0].fields().len(), 3);
}

#[test]
fn test_concurrent_lookup_of_cyclic_type_yields_one_descriptor() {
    let m = module("desc.cycle.mt", "1.0", "cycle-mt");
    let m1 = Arc::clone(&m);
    let node = TypeBuilder::object(&m, "Node")
        .field("value", LazyType::of::<i32>())
        .field(
            "children",
            LazyType::from_fn(move || {
                core_types()
                    .vec
                    .instantiate(&[m1.get_type("Node").expect("registered")])
            }),
        )
        .build();

    let descriptors: Vec<Arc<TypeDescriptor>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let desc = TypeDescriptor::for_type(&node);
                    assert_eq!(desc.fields().len(), 2);
                    desc
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("lookup thread"))
            .collect()
    });

    let first = &descriptors[0];
    assert!(descriptors.iter().all(|d| Arc::ptr_eq(d, first)));
    assert!(first.is_initialized());
    let first_fields = first.fields();
    let children = first_fields[1].field_type();
    assert!(Arc::ptr_eq(&children.generic_args()[0], first));
}

#[test]
fn test_transient_fields_excluded_from_persisted_list() {
    let m = module("desc.transient", "1.0", "t");
    let ty = TypeBuilder::object(&m, "Cached")
        .field("key", LazyType::of::<String>())
        .transient_field("hits", LazyType::of::<u64>())
        .constructor_field("index", LazyType::of::<u32>())
        .build();
    let desc = TypeDescriptor::for_type(&ty);
    assert_eq!(desc.fields().len(), 1);
    assert_eq!(desc.field_slots().len(), 3);
}

#[test]
fn test_identical_shape_strict_uses_current_order() {
    let m = module("desc.same", "1.0", "same");
    let desc = person(
        &m,
        &[("id", LazyType::of::<u32>()), ("name", LazyType::of::<String>())],
    );
    let plan = desc
        .verify_structure(&stored(&desc), VersionTolerance::EXACT)
        .expect("verify");
    assert_eq!(slot_names(&plan), ["Person::id", "Person::name"]);
}

#[test]
fn test_token_change_needs_permission() {
    let old = person(&module("desc.token", "1.0", "old"), &[("id", LazyType::of::<u32>())]);
    let new = person(&module("desc.token", "1.0", "new"), &[("id", LazyType::of::<u32>())]);

    let err = new
        .verify_structure(&stored(&old), VersionTolerance::EXACT)
        .unwrap_err();
    assert!(matches!(err, Error::IncompatibleModuleIdentity { .. }));

    let plan = new
        .verify_structure(&stored(&old), VersionTolerance::ALLOW_MODULE_ID_CHANGE)
        .expect("verify");
    assert_eq!(slot_names(&plan), ["Person::id"]);
}

#[test]
fn test_removed_field_becomes_skipped_slot() {
    let old = person(
        &module("desc.removed", "1.0", "old"),
        &[
            ("id", LazyType::of::<u32>()),
            ("nickname", LazyType::of::<String>()),
            ("age", LazyType::of::<u8>()),
        ],
    );
    let new = person(
        &module("desc.removed", "1.0", "new"),
        &[("id", LazyType::of::<u32>()), ("age", LazyType::of::<u8>())],
    );
    let policy = VersionTolerance::ALLOW_MODULE_ID_CHANGE | VersionTolerance::ALLOW_FIELD_REMOVAL;

    let plan = new.verify_structure(&stored(&old), policy).expect("verify");
    assert_eq!(slot_names(&plan), ["Person::id", "skip String", "Person::age"]);
    assert_eq!(plan.iter().filter(|s| s.is_skipped()).count(), 1);
    // bound to the current type's fields, not the stored ones
    assert_eq!(plan[2].field(), Some(&new.ty().declared_fields()[1]));

    let err = new
        .verify_structure(&stored(&old), VersionTolerance::ALLOW_MODULE_ID_CHANGE)
        .unwrap_err();
    assert!(matches!(err, Error::FieldRemoved { ref fields, .. } if fields == &["Person::nickname"]));
}

#[test]
fn test_changed_field_type_always_fails() {
    let old = person(&module("desc.changed", "1.0", "old"), &[("id", LazyType::of::<u32>())]);
    let new = person(&module("desc.changed", "1.0", "new"), &[("id", LazyType::of::<String>())]);

    for policy in [VersionTolerance::ALLOW_MODULE_ID_CHANGE, VersionTolerance::all()] {
        let err = new.verify_structure(&stored(&old), policy).unwrap_err();
        match err {
            Error::FieldTypeChanged {
                field,
                stored,
                current,
                ..
            } => {
                assert_eq!(field, "Person::id");
                assert_eq!(stored, "u32");
                assert_eq!(current, "String");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn test_added_field_needs_permission() {
    let old = person(&module("desc.added", "1.0", "old"), &[("id", LazyType::of::<u32>())]);
    let new = person(
        &module("desc.added", "1.0", "new"),
        &[("id", LazyType::of::<u32>()), ("email", LazyType::of::<String>())],
    );

    let err = new
        .verify_structure(&stored(&old), VersionTolerance::ALLOW_MODULE_ID_CHANGE)
        .unwrap_err();
    assert!(matches!(err, Error::FieldAdded { ref fields, .. } if fields == &["Person::email"]));

    let plan = new
        .verify_structure(
            &stored(&old),
            VersionTolerance::ALLOW_MODULE_ID_CHANGE | VersionTolerance::ALLOW_FIELD_ADDITION,
        )
        .expect("verify");
    assert_eq!(slot_names(&plan), ["Person::id"]);
}

#[test]
fn test_equal_token_short_circuits_field_checks() {
    let old = person(
        &module("desc.fast", "1.0", "same-build"),
        &[("id", LazyType::of::<u32>()), ("gone", LazyType::of::<u8>())],
    );
    let new = person(
        &module("desc.fast", "2.0", "same-build"),
        &[("id", LazyType::of::<u32>()), ("extra", LazyType::of::<bool>())],
    );

    let plan = new
        .verify_structure(&stored(&old), VersionTolerance::ALLOW_MODULE_VERSION_CHANGE)
        .expect("fast path");
    assert_eq!(slot_names(&plan), ["Person::id", "Person::extra"]);
    assert!(plan.iter().all(|s| !s.is_skipped()));
}

#[test]
fn test_version_change_needs_permission() {
    let old = person(&module("desc.version", "1.0", "old"), &[]);
    let new = person(&module("desc.version", "1.1", "new"), &[]);

    let err = new
        .verify_structure(&stored(&old), VersionTolerance::ALLOW_MODULE_ID_CHANGE)
        .unwrap_err();
    match err {
        Error::IncompatibleVersion { stored, current, .. } => {
            assert_eq!(stored.to_string(), "1.0.0.0");
            assert_eq!(current.to_string(), "1.1.0.0");
        }
        other => panic!("unexpected error: {other}"),
    }

    new.verify_structure(
        &stored(&old),
        VersionTolerance::ALLOW_MODULE_ID_CHANGE | VersionTolerance::ALLOW_MODULE_VERSION_CHANGE,
    )
    .expect("tolerated");
}

#[test]
fn test_inheritance_change_needs_permission() {
    let old_module = module("desc.base", "1.0", "old");
    let base = TypeBuilder::object(&old_module, "Entity").build();
    let old = TypeDescriptor::for_type(&TypeBuilder::object(&old_module, "Person").base(base).build());
    let new = person(&module("desc.base", "1.0", "new"), &[]);

    let err = new
        .verify_structure(&stored(&old), VersionTolerance::ALLOW_MODULE_ID_CHANGE)
        .unwrap_err();
    match err {
        Error::IncompatibleInheritance { stored, current, .. } => {
            assert_eq!(stored, "Entity");
            assert_eq!(current, "none");
        }
        other => panic!("unexpected error: {other}"),
    }

    new.verify_structure(
        &stored(&old),
        VersionTolerance::ALLOW_MODULE_ID_CHANGE | VersionTolerance::ALLOW_INHERITANCE_CHAIN_CHANGE,
    )
    .expect("tolerated");
}

#[test]
fn test_constructor_fields_appended_to_plan() {
    let old = person(
        &module("desc.ctor", "1.0", "old"),
        &[("id", LazyType::of::<u32>()), ("name", LazyType::of::<String>())],
    );
    let m = module("desc.ctor", "1.0", "new");
    let ty = TypeBuilder::object(&m, "Person")
        .constructor_field("lookup", LazyType::of::<u64>())
        .field("id", LazyType::of::<u32>())
        .transient_field("scratch", LazyType::of::<u8>())
        .field("name", LazyType::of::<String>())
        .build();
    let new = TypeDescriptor::for_type(&ty);

    let plan = new
        .verify_structure(&stored(&old), VersionTolerance::ALLOW_MODULE_ID_CHANGE)
        .expect("verify");
    assert_eq!(slot_names(&plan), ["Person::id", "Person::name", "Person::lookup"]);

    let diff = new.compare_with(&old.fields(), VersionTolerance::EXACT);
    assert!(diff.is_empty());
    assert_eq!(diff.recreated.len(), 1);
}

#[test]
fn test_compare_fields_classification() {
    let old = person(
        &module("desc.compare", "1.0", "old"),
        &[
            ("a", LazyType::of::<u8>()),
            ("b", LazyType::of::<u8>()),
            ("c", LazyType::of::<u8>()),
        ],
    );
    let new = person(
        &module("desc.compare", "1.0", "new"),
        &[
            ("a", LazyType::of::<u8>()),
            ("c", LazyType::of::<i64>()),
            ("d", LazyType::of::<u8>()),
        ],
    );
    let diff = compare_fields(&new.fields(), &old.fields(), VersionTolerance::all());
    assert_eq!(diff.added_names(), ["Person::d"]);
    assert_eq!(diff.removed_names(), ["Person::b"]);
    assert_eq!(diff.fields_changed.len(), 1);
    assert_eq!(diff.fields_changed[0].current.qualified_name(), "Person::c");
    assert!(!diff.is_empty());
}

#[test]
fn test_describe_lists_fields() {
    let m = module("desc.describe", "2.5", "d");
    let ty: Type = TypeBuilder::object(&m, "Order")
        .field("total", LazyType::of::<f64>())
        .transient_field("dirty", LazyType::of::<bool>())
        .build();
    let text = TypeDescriptor::for_type(&ty).describe();
    assert!(text.starts_with("Order [desc.describe 2.5.0.0]"));
    assert!(text.contains("Order::total: f64"));
    assert!(text.contains("Order::dirty: bool (transient)"));
}
