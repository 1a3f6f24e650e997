// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Metadata-provider emission.
//!
//! Once per compilation: a static descriptor table mapping entity types to
//! their full `EntityMetadata` records, a `MetadataProvider` implementation
//! over it, and one `FromSqlRow` implementation per entity — the runtime
//! face of the descriptor table, since the session maps rows by property
//! name.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use super::{GeneratedFile, render};
use crate::{
    diagnostics::DiagnosticSink,
    model::{EntityModel, EntitySet, Relationship}
};

/// Emit `generated_metadata_provider.g.rs` for the whole compilation.
pub fn emit_metadata_provider(
    entities: &EntitySet,
    sink: &DiagnosticSink
) -> Option<GeneratedFile> {
    if entities.is_empty() {
        return None;
    }

    let records: Vec<TokenStream> = entities.iter().map(metadata_record).collect();
    let lookups: Vec<TokenStream> = entities
        .iter()
        .enumerate()
        .map(|(index, entity)| {
            let ident = format_ident!("{}", entity.simple_name);
            quote! {
                if type_id == std::any::TypeId::of::<#ident>() {
                    return Some(&ENTITY_METADATA[#index]);
                }
            }
        })
        .collect();
    let row_impls: Vec<TokenStream> = entities.iter().map(from_row_impl).collect();

    let tokens = quote! {
        /// Entity descriptors of this compilation, in declaration order.
        static ENTITY_METADATA: &[repogen_core::EntityMetadata] = &[
            #(#records),*
        ];

        /// Metadata lookup backed by the generated descriptor table.
        #[derive(Debug, Default, Clone, Copy)]
        pub struct GeneratedMetadataProvider;

        impl repogen_core::MetadataProvider for GeneratedMetadataProvider {
            fn get_by_type(
                &self,
                type_id: std::any::TypeId
            ) -> Option<&'static repogen_core::EntityMetadata> {
                #(#lookups)*
                None
            }

            fn all(&self) -> &'static [repogen_core::EntityMetadata] {
                ENTITY_METADATA
            }
        }

        #(#row_impls)*
    };

    let source_text = render(tokens, "GeneratedMetadataProvider", sink)?;
    Some(GeneratedFile {
        hint_name: "generated_metadata_provider.g.rs".to_owned(),
        source_text
    })
}

fn option_str(value: &Option<String>) -> TokenStream {
    match value {
        Some(text) => quote!(Some(#text)),
        None => quote!(None)
    }
}

fn metadata_record(entity: &EntityModel) -> TokenStream {
    let entity_name = &entity.simple_name;
    let qualified_name = &entity.qualified_name;
    let table_name = &entity.table.name;
    let schema = option_str(&entity.table.schema);
    let primary_key: Vec<&String> = entity.primary_key.iter().collect();

    let columns: Vec<TokenStream> = entity
        .properties
        .iter()
        .map(|property| {
            let prop = &property.name;
            let column = &property.column.name;
            let sql_type = option_str(&property.column.sql_type);
            let nullable = property.nullable;
            let unique = property.column.unique;
            let generated = property.is_generated();
            let is_key = property.is_key();
            quote! {
                repogen_core::ColumnMetadata {
                    property: #prop,
                    column: #column,
                    sql_type: #sql_type,
                    nullable: #nullable,
                    unique: #unique,
                    generated: #generated,
                    is_key: #is_key
                }
            }
        })
        .collect();

    let relationships: Vec<TokenStream> = entity
        .relationships
        .iter()
        .map(|relationship| {
            let property = relationship.property();
            let target = relationship.target_entity();
            let (kind, fk, mapped_by, join_table) = match relationship {
                Relationship::ManyToOne(r) => (
                    quote!(repogen_core::RelationshipKind::ManyToOne),
                    option_str(&Some(r.join_column.clone())),
                    option_str(&None),
                    option_str(&None)
                ),
                Relationship::OneToMany(r) => (
                    quote!(repogen_core::RelationshipKind::OneToMany),
                    option_str(&None),
                    option_str(&r.mapped_by),
                    option_str(&None)
                ),
                Relationship::OneToOne(r) => (
                    quote!(repogen_core::RelationshipKind::OneToOne),
                    option_str(&r.join_column),
                    option_str(&r.mapped_by),
                    option_str(&None)
                ),
                Relationship::ManyToMany(r) => (
                    quote!(repogen_core::RelationshipKind::ManyToMany),
                    option_str(&None),
                    option_str(&r.mapped_by),
                    option_str(&Some(r.join_table.clone()))
                )
            };
            quote! {
                repogen_core::RelationshipMetadata {
                    property: #property,
                    kind: #kind,
                    target_entity: #target,
                    foreign_key_column: #fk,
                    mapped_by: #mapped_by,
                    join_table: #join_table
                }
            }
        })
        .collect();

    quote! {
        repogen_core::EntityMetadata {
            entity_name: #entity_name,
            qualified_name: #qualified_name,
            table_name: #table_name,
            schema: #schema,
            primary_key: &[#(#primary_key),*],
            columns: &[#(#columns),*],
            relationships: &[#(#relationships),*]
        }
    }
}

/// Row conversion reading by property name, falling back to the column
/// name so `SELECT *` statements materialize too.
fn from_row_impl(entity: &EntityModel) -> TokenStream {
    let ident = format_ident!("{}", entity.simple_name);

    let mut fields: Vec<TokenStream> = entity
        .properties
        .iter()
        .map(|property| {
            let field = format_ident!("{}", property.name);
            let prop = &property.name;
            let column = &property.column.name;
            if prop == column {
                quote!(#field: row.get(#prop)?,)
            } else {
                quote!(#field: row.get(#prop).or_else(|_| row.get(#column))?,)
            }
        })
        .collect();

    // Navigation fields start detached; the session returns flat rows.
    for relationship in &entity.relationships {
        let field = format_ident!("{}", relationship.property());
        let value = match relationship {
            Relationship::ManyToOne(r) => {
                if r.nullable {
                    quote!(None)
                } else {
                    quote!(Default::default())
                }
            }
            Relationship::OneToOne(r) => {
                if r.nullable {
                    quote!(None)
                } else {
                    quote!(Default::default())
                }
            }
            Relationship::OneToMany(r) => {
                if r.collection_nullable {
                    quote!(None)
                } else {
                    quote!(Vec::new())
                }
            }
            Relationship::ManyToMany(_) => quote!(Vec::new())
        };
        fields.push(quote!(#field: #value,));
    }

    quote! {
        impl repogen_core::FromSqlRow for #ident {
            fn from_row(row: &repogen_core::SqlRow) -> Result<Self, repogen_core::SessionError> {
                Ok(Self {
                    #(#fields)*
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;
    use crate::model::extract;

    fn fixture() -> EntitySet {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            #[table("orders", schema = "sales")]
            pub struct Order {
                #[id]
                #[generated_value]
                pub id: i32,
                #[column("order_date")]
                pub placed_at: String,
                #[many_to_one]
                #[join_column("customer_id")]
                pub customer: Option<Customer>,
            }

            #[entity]
            pub struct Customer {
                #[id]
                pub id: i32,
                pub name: String,
            }
        };
        let (entities, _) = extract(&file.items, "", &sink);
        entities
    }

    #[test]
    fn provider_emits_descriptor_table() {
        let sink = DiagnosticSink::new();
        let file = emit_metadata_provider(&fixture(), &sink).unwrap();
        assert_eq!(file.hint_name, "generated_metadata_provider.g.rs");
        assert!(file.source_text.contains("static ENTITY_METADATA"));
        assert!(file.source_text.contains("GeneratedMetadataProvider"));
        assert!(file.source_text.contains("\"orders\""));
        assert!(file.source_text.contains("Some(\"sales\")"));
        assert!(file.source_text.contains("RelationshipKind::ManyToOne"));
        assert!(file.source_text.contains("Some(\"customer_id\")"));
    }

    #[test]
    fn row_impl_reads_property_then_column() {
        let sink = DiagnosticSink::new();
        let file = emit_metadata_provider(&fixture(), &sink).unwrap();
        assert!(file.source_text.contains("row.get(\"placed_at\")"));
        assert!(file.source_text.contains("row.get(\"order_date\")"));
        assert!(file.source_text.contains("customer: None"));
    }

    #[test]
    fn empty_compilation_emits_nothing() {
        let sink = DiagnosticSink::new();
        assert!(emit_metadata_provider(&EntitySet::default(), &sink).is_none());
    }
}
