// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// How a field participates in the stream.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldMode {
    Persisted,
    Transient,
    /// Transient, rebuilt by construction logic after reading
    Constructor,
    /// Not part of the runtime type at all
    Skip,
}

/// Container-level `#[vtbin(...)]` options.
#[derive(Default)]
struct ContainerAttrs {
    module: Option<syn::Path>,
    name: Option<LitStr>,
    base: Option<syn::Type>,
}

fn parse_container_attrs(input: &DeriveInput) -> syn::Result<ContainerAttrs> {
    let mut attrs = ContainerAttrs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("vtbin")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("module") {
                attrs.module = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("name") {
                attrs.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("base") {
                attrs.base = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("expected `module`, `name` or `base`"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn parse_field_mode(field: &syn::Field) -> syn::Result<FieldMode> {
    let mut mode = FieldMode::Persisted;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("vtbin")) {
        attr.parse_nested_meta(|meta| {
            let next = if meta.path.is_ident("transient") {
                FieldMode::Transient
            } else if meta.path.is_ident("constructor") {
                FieldMode::Constructor
            } else if meta.path.is_ident("skip") {
                FieldMode::Skip
            } else {
                return Err(meta.error("expected `transient`, `constructor` or `skip`"));
            };
            if mode != FieldMode::Persisted && mode != next {
                return Err(meta.error("conflicting field modes"));
            }
            mode = next;
            Ok(())
        })?;
    }
    Ok(mode)
}

/// `#[derive(Reflect)]`: registers the struct as an object type in a module.
///
/// Container attributes:
/// - `module = path` (required): function returning `Arc<vtbin::Module>`
/// - `name = "..."`: type name inside the module (defaults to the ident)
/// - `base = Type`: base type, itself `Reflect`
///
/// Field attributes: `transient`, `constructor` (transient and recreated
/// after reading) and `skip` (left out of the runtime type).
///
/// Field types are resolved lazily, so self-referential structs work.
///
/// Example:
/// ```ignore
/// use vtbin::Reflect;
///
/// #[derive(Reflect)]
/// #[vtbin(module = crate::model::module, name = "Order")]
/// struct Order {
///     id: u64,
///     lines: Vec<Line>,
///     #[vtbin(constructor)]
///     total: f64,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(vtbin))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic types must be registered through GenericDefinition",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Only named fields are supported",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(input, "Only structs are supported")),
    };

    let attrs = parse_container_attrs(input)?;
    let Some(module) = attrs.module else {
        return Err(syn::Error::new_spanned(
            input,
            "missing #[vtbin(module = path::to::module_fn)]",
        ));
    };
    let type_name = attrs
        .name
        .map_or_else(|| ident.to_string(), |lit| lit.value());

    let base = attrs.base.map(|base| {
        quote! { .base(::vtbin::LazyType::of::<#base>()) }
    });

    let mut calls = Vec::with_capacity(fields.len());
    for field in fields {
        let mode = parse_field_mode(field)?;
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let field_name = field_ident.to_string();
        let ty = &field.ty;
        let method = match mode {
            FieldMode::Persisted => quote! { field },
            FieldMode::Transient => quote! { transient_field },
            FieldMode::Constructor => quote! { constructor_field },
            FieldMode::Skip => continue,
        };
        calls.push(quote! {
            .#method(#field_name, ::vtbin::LazyType::of::<#ty>())
        });
    }

    Ok(quote! {
        impl ::vtbin::reflect::Reflect for #ident {
            fn reflect_type() -> ::vtbin::Type {
                static TYPE: ::std::sync::OnceLock<::vtbin::Type> = ::std::sync::OnceLock::new();
                TYPE.get_or_init(|| {
                    ::vtbin::TypeBuilder::object(&#module(), #type_name)
                        #base
                        #(#calls)*
                        .build()
                })
                .clone()
            }
        }
    })
}
