// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Proc-macro host adapter for repogen.
//!
//! [`macro@persistence_unit`] turns rustc into a generator host: it runs
//! the pipeline over the declarations of an inline module, strips the
//! mapping attributes (they are data for the generator, not for the
//! compiler), and appends the generated artifacts inside the module.
//!
//! ```rust,ignore
//! use repogen::prelude::*;
//!
//! #[persistence_unit]
//! mod domain {
//!     use repogen::prelude::*;
//!
//!     #[entity]
//!     pub struct User {
//!         #[id]
//!         pub id: i64,
//!         #[column("email")]
//!         pub email: String,
//!     }
//!
//!     #[repository]
//!     pub trait UserRepository: CrudRepository<User, i64> {
//!         async fn find_by_email(&self, email: String) -> RepoResult<Option<User>>;
//!     }
//! }
//! ```
//!
//! Generator diagnostics of error severity become `compile_error!`
//! invocations at the module; warnings are dropped silently (rustc has no
//! stable warning channel for proc macros).

#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Item, ItemMod, parse_macro_input, parse_quote};

use repogen_codegen::{Generator, Severity};

/// Mapping attributes consumed by the generator and stripped afterwards.
const MAPPING_ATTRIBUTES: &[&str] = &[
    "entity",
    "table",
    "repository",
    "id",
    "generated_value",
    "column",
    "many_to_one",
    "one_to_one",
    "one_to_many",
    "many_to_many",
    "join_column",
    "join_table",
    "query",
    "stored_procedure",
    "multi_mapping",
    "bulk_operation",
];

/// Generate repository implementations for the declarations of a module.
///
/// The module must be inline (`mod name { … }`). Entities keep their
/// declarations minus the mapping attributes; repository traits gain
/// `#[repogen_core::async_trait]` so their async methods match the
/// generated implementations.
#[proc_macro_attribute]
pub fn persistence_unit(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let module = parse_macro_input!(item as ItemMod);
    match expand(module) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into()
    }
}

fn expand(mut module: ItemMod) -> syn::Result<TokenStream2> {
    let module_span = module.ident.span();
    let Some((_, items)) = module.content.as_mut() else {
        return Err(syn::Error::new_spanned(
            &module,
            "#[persistence_unit] requires an inline module body"
        ));
    };

    let namespace = module.ident.to_string();
    let output = Generator::new().run_items(items, &namespace);

    // Error-severity diagnostics become compile errors spanned to the
    // module name, so rustc points at user code rather than the expansion.
    let errors: TokenStream2 = output
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Error)
        .map(|diagnostic| {
            syn::Error::new(
                module_span,
                format!(
                    "{}: {} ({})",
                    diagnostic.code.as_str(),
                    diagnostic.message,
                    diagnostic.location
                )
            )
            .to_compile_error()
        })
        .collect();

    strip_mapping_attributes(items);

    for file in &output.files {
        let generated: syn::File = syn::parse_str(&file.source_text).map_err(|err| {
            syn::Error::new_spanned(
                &module.ident,
                format!("generated artifact `{}` failed to parse: {err}", file.hint_name)
            )
        })?;
        items.extend(generated.items);
    }

    Ok(quote!(#module #errors))
}

fn is_mapping_attribute(attr: &syn::Attribute) -> bool {
    attr.path()
        .get_ident()
        .map(|ident| MAPPING_ATTRIBUTES.contains(&ident.to_string().as_str()))
        .unwrap_or(false)
}

fn strip_mapping_attributes(items: &mut [Item]) {
    for item in items {
        match item {
            Item::Struct(structure) => {
                structure.attrs.retain(|attr| !is_mapping_attribute(attr));
                for field in &mut structure.fields {
                    field.attrs.retain(|attr| !is_mapping_attribute(attr));
                }
            }
            Item::Trait(definition) => {
                let was_repository = definition
                    .attrs
                    .iter()
                    .any(|attr| attr.path().is_ident("repository"));
                definition.attrs.retain(|attr| !is_mapping_attribute(attr));
                for member in &mut definition.items {
                    if let syn::TraitItem::Fn(method) = member {
                        method.attrs.retain(|attr| !is_mapping_attribute(attr));
                    }
                }
                if was_repository {
                    definition.attrs.push(parse_quote!(#[repogen_core::async_trait]));
                }
            }
            _ => {}
        }
    }
}
