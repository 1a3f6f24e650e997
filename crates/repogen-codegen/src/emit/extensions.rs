// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Extension-trait emission.
//!
//! One sibling trait per repository, `<Trait>Ext`, declaring every derived
//! method, plus the record types the derived methods return: GROUP BY
//! summary rows and multi-mapping records, each with its row conversion.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use super::{GeneratedFile, hint_name, render, signature_tokens};
use crate::{
    diagnostics::DiagnosticSink,
    planner::{MultiMapType, RepositoryPlan, SummaryType}
};

/// Emit `<repo>_ext.g.rs` for one plan.
pub fn emit_extensions(plan: &RepositoryPlan, sink: &DiagnosticSink) -> Option<GeneratedFile> {
    let trait_name = format_ident!("{}Ext", plan.repository.trait_name);
    let entity_ident = format_ident!("{}", plan.entity.simple_name);

    let methods: Vec<TokenStream> = plan
        .derived
        .iter()
        .map(|method| {
            let doc = &method.doc;
            let signature = signature_tokens(method, &entity_ident);
            quote! {
                #[doc = #doc]
                #signature;
            }
        })
        .collect();

    let summaries: Vec<TokenStream> =
        plan.summary_types.iter().map(summary_struct).collect();
    let multi_maps: Vec<TokenStream> =
        plan.multi_map_types.iter().map(multi_map_struct).collect();

    let user_trait = &plan.repository.trait_name;
    let trait_doc = format!(
        "Methods derived from the entity graph for [`{user_trait}`]."
    );
    let tokens = quote! {
        #[doc = #trait_doc]
        #[repogen_core::async_trait]
        pub trait #trait_name {
            #(#methods)*
        }

        #(#summaries)*
        #(#multi_maps)*
    };

    let source_text = render(tokens, &format!("{user_trait}Ext"), sink)?;
    Some(GeneratedFile {
        hint_name: hint_name(&plan.repository.trait_name, "ext"),
        source_text
    })
}

/// Record type for a GROUP BY summary, with its row conversion.
fn summary_struct(summary: &SummaryType) -> TokenStream {
    let name = format_ident!("{}", summary.name);
    let fields: Vec<TokenStream> = summary
        .fields
        .iter()
        .map(|(field, ty, nullable)| {
            let ident = format_ident!("{}", field);
            if *nullable {
                quote!(pub #ident: Option<#ty>,)
            } else {
                quote!(pub #ident: #ty,)
            }
        })
        .collect();
    let reads: Vec<TokenStream> = summary
        .fields
        .iter()
        .map(|(field, _, _)| {
            let ident = format_ident!("{}", field);
            quote!(#ident: row.get(#field)?,)
        })
        .collect();
    let doc = format!("One row of the `{}` rollup.", summary.name);
    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, PartialEq)]
        pub struct #name {
            #(#fields)*
        }

        impl repogen_core::FromSqlRow for #name {
            fn from_row(row: &repogen_core::SqlRow) -> Result<Self, repogen_core::SessionError> {
                Ok(Self {
                    #(#reads)*
                })
            }
        }
    }
}

/// Record type for a multi-mapping method: one source row, several objects.
fn multi_map_struct(record: &MultiMapType) -> TokenStream {
    let name = format_ident!("{}", record.name);
    let fields: Vec<TokenStream> = record
        .fields
        .iter()
        .map(|(field, ty)| {
            let ident = format_ident!("{}", field);
            quote!(pub #ident: #ty,)
        })
        .collect();
    let reads: Vec<TokenStream> = record
        .fields
        .iter()
        .map(|(field, ty)| {
            let ident = format_ident!("{}", field);
            quote!(#ident: <#ty as repogen_core::FromSqlRow>::from_row(row)?,)
        })
        .collect();
    let doc = if record.split_on.is_empty() {
        format!("Multi-mapping record `{}`.", record.name)
    } else {
        format!(
            "Multi-mapping record `{}`, split on `{}`.",
            record.name,
            record.split_on.join(", ")
        )
    };
    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, PartialEq)]
        pub struct #name {
            #(#fields)*
        }

        impl repogen_core::FromSqlRow for #name {
            fn from_row(row: &repogen_core::SqlRow) -> Result<Self, repogen_core::SessionError> {
                Ok(Self {
                    #(#reads)*
                })
            }
        }
    }
}
