// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Source emission.
//!
//! The emitter renders one repository plan into its textual artifacts:
//!
//! | Artifact | Hint name |
//! |----------|-----------|
//! | Extension trait + record types | `<repo>_ext.g.rs` |
//! | Implementation struct | `<repo>_impl.g.rs` |
//! | Relationship helpers | `<entity>_relationship_helper.g.rs` |
//! | Metadata provider (once per compilation) | `generated_metadata_provider.g.rs` |
//!
//! Token streams are built with `quote` and rendered through
//! `prettyplease`, so identical plans produce byte-identical text. All
//! runtime references are fully qualified `repogen_core::` paths — the
//! artifacts land inside the declaring module and must not collide on
//! imports.

mod extensions;
mod helpers;
mod implementation;
mod metadata;

pub use extensions::emit_extensions;
pub use helpers::emit_relationship_helpers;
pub use implementation::emit_implementation;
pub use metadata::emit_metadata_provider;

use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::{
    diagnostics::{Code, Diagnostic, DiagnosticSink},
    planner::{DerivedMethod, PlanParam, PlanReturn}
};

/// One generated source artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Stable host-facing name, `.g.rs` suffixed.
    pub hint_name:   String,
    /// Formatted source text.
    pub source_text: String
}

/// Hint name for a repository-scoped artifact.
pub fn hint_name(base: &str, suffix: &str) -> String {
    format!("{}_{suffix}.g.rs", base.to_case(Case::Snake))
}

/// Render a token stream to formatted source.
///
/// A parse failure here is a generator bug: the tokens are reported and
/// the artifact is skipped rather than emitting garbage.
pub fn render(tokens: TokenStream, location: &str, sink: &DiagnosticSink) -> Option<String> {
    match syn::parse2::<syn::File>(tokens) {
        Ok(file) => Some(prettyplease::unparse(&file)),
        Err(err) => {
            sink.push(Diagnostic::error(
                Code::InternalInvariant,
                location,
                format!("emitted tokens failed to parse: {err}")
            ));
            None
        }
    }
}

/// Tokens of a planned method's return type.
fn return_tokens(ret: &PlanReturn, entity_ident: &proc_macro2::Ident) -> TokenStream {
    match ret {
        PlanReturn::Entities => quote!(Vec<#entity_ident>),
        PlanReturn::OptionalEntity => quote!(Option<#entity_ident>),
        PlanReturn::Entity => quote!(#entity_ident),
        PlanReturn::TargetEntities(ty) => quote!(Vec<#ty>),
        PlanReturn::Count => quote!(i64),
        PlanReturn::Bool => quote!(bool),
        PlanReturn::Affected => quote!(u64),
        PlanReturn::Scalar(ty) => quote!(#ty),
        PlanReturn::OptionalScalar(ty) => quote!(Option<#ty>),
        PlanReturn::Map {
            key,
            value
        } => quote!(std::collections::HashMap<#key, #value>),
        PlanReturn::Rows(name) => {
            let ident = format_ident!("{}", name);
            quote!(Vec<#ident>)
        }
    }
}

/// Tokens of a planned method's parameter list, receiver excluded.
fn param_tokens(params: &[PlanParam]) -> Vec<TokenStream> {
    params
        .iter()
        .map(|param| {
            let ident = format_ident!("{}", param.name);
            let ty = &param.ty;
            quote!(#ident: #ty)
        })
        .collect()
}

/// Signature tokens of a planned method, without body or semicolon.
fn signature_tokens(method: &DerivedMethod, entity_ident: &proc_macro2::Ident) -> TokenStream {
    let name = format_ident!("{}", method.name);
    let params = param_tokens(&method.params);
    let ret = return_tokens(&method.ret, entity_ident);
    quote! {
        async fn #name(&self #(, #params)*) -> repogen_core::RepoResult<#ret>
    }
}

/// Bound-parameter array expression for a method's SQL parameters.
fn bound_params(params: &[PlanParam]) -> TokenStream {
    let entries: Vec<TokenStream> = params
        .iter()
        .filter(|p| p.bind)
        .map(|p| {
            let name = &p.name;
            let ident = format_ident!("{}", p.name);
            quote!(repogen_core::SqlParam::new(#name, #ident))
        })
        .collect();
    quote!(&[#(#entries),*])
}
