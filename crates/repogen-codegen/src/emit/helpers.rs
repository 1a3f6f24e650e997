// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Bidirectional relationship helper emission.
//!
//! Entities participating in a bidirectional association get a helper
//! module keeping both sides synchronized in memory:
//!
//! - parents: `add_to_<collection>` / `remove_from_<collection>`
//! - children: `set_<navigation>` and `validate_relationship_consistency`
//!
//! The helpers write the scalar foreign key when the entity declares one,
//! clear nullable inverse navigations on removal (a non-nullable navigation
//! keeps its reference and only the key clears), and the validator reports
//! a `RelationshipError` whenever key and navigation disagree.

use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use super::{GeneratedFile, hint_name, render};
use crate::{
    diagnostics::DiagnosticSink,
    model::{EntityModel, EntitySet, ManyToOne, OneToMany, Property, Relationship}
};

/// A parent-side pairing: this entity's collection and the owning child.
struct ParentSide<'a> {
    collection: &'a OneToMany,
    child:      &'a EntityModel,
    owner:      &'a ManyToOne
}

/// A child-side pairing: this entity's navigation and the collecting parent.
struct ChildSide<'a> {
    owner:  &'a ManyToOne,
    parent: &'a EntityModel
}

fn parent_sides<'a>(entity: &'a EntityModel, entities: &'a EntitySet) -> Vec<ParentSide<'a>> {
    entity
        .relationships
        .iter()
        .filter_map(|relationship| {
            let Relationship::OneToMany(collection) = relationship else {
                return None;
            };
            let mapped_by = collection.mapped_by.as_ref()?;
            let child = entities.get(&collection.target_entity)?;
            let Some(Relationship::ManyToOne(owner)) = child.relationship(mapped_by) else {
                return None;
            };
            Some(ParentSide {
                collection,
                child,
                owner
            })
        })
        .collect()
}

fn child_sides<'a>(entity: &'a EntityModel, entities: &'a EntitySet) -> Vec<ChildSide<'a>> {
    entity
        .relationships
        .iter()
        .filter_map(|relationship| {
            let Relationship::ManyToOne(owner) = relationship else {
                return None;
            };
            let parent = entities.get(&owner.target_entity)?;
            let collects_this = parent.relationships.iter().any(|r| {
                matches!(
                    r,
                    Relationship::OneToMany(om)
                        if om.target_entity == entity.simple_name
                            && om.mapped_by.as_deref() == Some(owner.property.as_str())
                )
            });
            collects_this.then_some(ChildSide {
                owner,
                parent
            })
        })
        .collect()
}

/// Emit one `<entity>_relationship_helper.g.rs` per participating entity.
pub fn emit_relationship_helpers(
    entities: &EntitySet,
    sink: &DiagnosticSink
) -> Vec<GeneratedFile> {
    let mut files = Vec::new();
    for entity in entities.iter() {
        let parents = parent_sides(entity, entities);
        let children = child_sides(entity, entities);
        if parents.is_empty() && children.is_empty() {
            continue;
        }

        let module = format_ident!("{}_relationships", entity.simple_name.to_case(Case::Snake));
        let module_doc = format!(
            "Bidirectional relationship helpers for [`{}`].",
            entity.simple_name
        );

        let parent_fns: Vec<TokenStream> = parents
            .iter()
            .flat_map(|side| [add_to(entity, side), remove_from(entity, side)])
            .collect();
        let child_fns: Vec<TokenStream> = children
            .iter()
            .map(|side| set_parent(entity, side))
            .collect();
        let validator = if children.is_empty() {
            quote!()
        } else {
            validate(entity, &children)
        };

        let tokens = quote! {
            #[doc = #module_doc]
            pub mod #module {
                use super::*;

                #(#parent_fns)*
                #(#child_fns)*
                #validator
            }
        };

        if let Some(source_text) = render(tokens, &entity.simple_name, sink) {
            files.push(GeneratedFile {
                hint_name: hint_name(&entity.simple_name, "relationship_helper"),
                source_text
            });
        }
    }
    files
}

fn snake_ident(name: &str) -> proc_macro2::Ident {
    format_ident!("{}", name.to_case(Case::Snake))
}

/// Child-value identifier, kept distinct from the parent's for
/// self-referential associations.
fn child_ident_for(parent: &EntityModel, child: &EntityModel) -> proc_macro2::Ident {
    if parent.simple_name == child.simple_name {
        format_ident!("child_{}", child.simple_name.to_case(Case::Snake))
    } else {
        snake_ident(&child.simple_name)
    }
}

/// The child's scalar foreign-key property for an owner relationship.
fn fk_property<'a>(child: &'a EntityModel, owner: &ManyToOne) -> Option<&'a Property> {
    child.property_by_column(&owner.join_column)
}

/// `child.<fk> = parent key` tokens, if a scalar key property exists.
fn fk_write(
    child_ident: &proc_macro2::Ident,
    parent_ident: &proc_macro2::Ident,
    child: &EntityModel,
    parent: &EntityModel,
    owner: &ManyToOne
) -> TokenStream {
    let Some(fk) = fk_property(child, owner) else {
        return quote!();
    };
    let fk_field = format_ident!("{}", fk.name);
    let parent_key = format_ident!("{}", parent.primary_key[0]);
    if fk.nullable {
        quote!(#child_ident.#fk_field = Some(#parent_ident.#parent_key);)
    } else {
        quote!(#child_ident.#fk_field = #parent_ident.#parent_key;)
    }
}

/// `child.<navigation> = parent` tokens.
fn nav_write(
    child_ident: &proc_macro2::Ident,
    parent_ident: &proc_macro2::Ident,
    owner: &ManyToOne
) -> TokenStream {
    let nav = format_ident!("{}", owner.property);
    if owner.nullable {
        quote!(#child_ident.#nav = Some(#parent_ident.clone());)
    } else {
        quote!(#child_ident.#nav = #parent_ident.clone();)
    }
}

/// Append `child` to the parent's collection when not already present.
fn append(
    parent_ident: &proc_macro2::Ident,
    child_ident: &proc_macro2::Ident,
    side: &ParentSide<'_>
) -> TokenStream {
    let collection = format_ident!("{}", side.collection.property);
    let child_key = format_ident!("{}", side.child.primary_key[0]);
    if side.collection.collection_nullable {
        quote! {
            let items = #parent_ident.#collection.get_or_insert_with(Vec::new);
            if !items.iter().any(|existing| existing.#child_key == #child_ident.#child_key) {
                items.push(#child_ident.clone());
            }
        }
    } else {
        quote! {
            if !#parent_ident
                .#collection
                .iter()
                .any(|existing| existing.#child_key == #child_ident.#child_key)
            {
                #parent_ident.#collection.push(#child_ident.clone());
            }
        }
    }
}

/// Remove `child` from the parent's collection by key.
fn retain(
    parent_ident: &proc_macro2::Ident,
    child_ident: &proc_macro2::Ident,
    side: &ParentSide<'_>
) -> TokenStream {
    let collection = format_ident!("{}", side.collection.property);
    let child_key = format_ident!("{}", side.child.primary_key[0]);
    if side.collection.collection_nullable {
        quote! {
            if let Some(items) = #parent_ident.#collection.as_mut() {
                items.retain(|existing| existing.#child_key != #child_ident.#child_key);
            }
        }
    } else {
        quote! {
            #parent_ident
                .#collection
                .retain(|existing| existing.#child_key != #child_ident.#child_key);
        }
    }
}

fn add_to(entity: &EntityModel, side: &ParentSide<'_>) -> TokenStream {
    let name = format_ident!("add_to_{}", side.collection.property);
    let parent_ident = snake_ident(&entity.simple_name);
    let child_ident = child_ident_for(entity, side.child);
    let parent_ty = format_ident!("{}", entity.simple_name);
    let child_ty = format_ident!("{}", side.child.simple_name);

    let fk = fk_write(&child_ident, &parent_ident, side.child, entity, side.owner);
    let nav = nav_write(&child_ident, &parent_ident, side.owner);
    let push = append(&parent_ident, &child_ident, side);
    let doc = format!(
        "Attach one `{}` to this `{}`, synchronizing both sides.",
        side.child.simple_name, entity.simple_name
    );

    quote! {
        #[doc = #doc]
        pub fn #name(#parent_ident: &mut #parent_ty, #child_ident: &mut #child_ty) {
            #fk
            #nav
            #push
        }
    }
}

fn remove_from(entity: &EntityModel, side: &ParentSide<'_>) -> TokenStream {
    let name = format_ident!("remove_from_{}", side.collection.property);
    let parent_ident = snake_ident(&entity.simple_name);
    let child_ident = child_ident_for(entity, side.child);
    let parent_ty = format_ident!("{}", entity.simple_name);
    let child_ty = format_ident!("{}", side.child.simple_name);

    let take_out = retain(&parent_ident, &child_ident, side);
    let nav = format_ident!("{}", side.owner.property);
    let (nav_clear, nav_doc) = if side.owner.nullable {
        (quote!(#child_ident.#nav = None;), String::new())
    } else {
        // The navigation type is not nullable; only the key clears.
        (
            quote!(),
            format!(
                " The `{nav}` navigation is not nullable and keeps its reference; only the scalar key clears."
            )
        )
    };
    let fk_clear = match fk_property(side.child, side.owner) {
        Some(fk) => {
            let fk_field = format_ident!("{}", fk.name);
            if fk.nullable {
                quote!(#child_ident.#fk_field = None;)
            } else {
                quote!(#child_ident.#fk_field = Default::default();)
            }
        }
        None => quote!()
    };
    let doc = format!(
        "Detach one `{}` from this `{}`.{nav_doc}",
        side.child.simple_name, entity.simple_name
    );

    quote! {
        #[doc = #doc]
        pub fn #name(#parent_ident: &mut #parent_ty, #child_ident: &mut #child_ty) {
            #take_out
            #nav_clear
            #fk_clear
        }
    }
}

fn set_parent(entity: &EntityModel, side: &ChildSide<'_>) -> TokenStream {
    let name = format_ident!("set_{}", side.owner.property);
    let child_ident = child_ident_for(side.parent, entity);
    let child_ty = format_ident!("{}", entity.simple_name);
    let parent_ty = format_ident!("{}", side.parent.simple_name);
    let old_ident = format_ident!("old_{}", side.owner.property);
    let new_ident = format_ident!("new_{}", side.owner.property);

    // Reconstruct the parent-side view for the collection bookkeeping.
    let collection = side.parent.relationships.iter().find_map(|r| match r {
        Relationship::OneToMany(om)
            if om.target_entity == entity.simple_name
                && om.mapped_by.as_deref() == Some(side.owner.property.as_str()) =>
        {
            Some(om)
        }
        _ => None
    });
    let Some(collection) = collection else {
        return quote!();
    };
    let parent_side = ParentSide {
        collection,
        child: entity,
        owner: side.owner
    };

    let old_retain = {
        let tokens = retain(&old_ident, &child_ident, &parent_side);
        quote! {
            if let Some(#old_ident) = #old_ident {
                #tokens
            }
        }
    };
    let fk = fk_write(&child_ident, &new_ident, entity, side.parent, side.owner);
    let nav = nav_write(&child_ident, &new_ident, side.owner);
    let push = append(&new_ident, &child_ident, &parent_side);
    let doc = format!(
        "Move this `{}` from one `{}` to another, synchronizing all sides.",
        entity.simple_name, side.parent.simple_name
    );

    quote! {
        #[doc = #doc]
        pub fn #name(
            #child_ident: &mut #child_ty,
            #old_ident: Option<&mut #parent_ty>,
            #new_ident: &mut #parent_ty
        ) {
            #old_retain
            #fk
            #nav
            #push
        }
    }
}

/// Consistency check over every owner-side navigation with a scalar key.
fn validate(entity: &EntityModel, children: &[ChildSide<'_>]) -> TokenStream {
    let child_ident = snake_ident(&entity.simple_name);
    let child_ty = format_ident!("{}", entity.simple_name);

    let checks: Vec<TokenStream> = children
        .iter()
        .filter_map(|side| {
            let fk = fk_property(entity, side.owner)?;
            let nav = format_ident!("{}", side.owner.property);
            let nav_name = &side.owner.property;
            let fk_field = format_ident!("{}", fk.name);
            let parent_key = format_ident!("{}", side.parent.primary_key[0]);

            let check = match (side.owner.nullable, fk.nullable) {
                (true, true) => quote! {
                    match (&#child_ident.#nav, &#child_ident.#fk_field) {
                        (Some(parent), Some(key)) if parent.#parent_key != *key => {
                            return Err(repogen_core::RelationshipError::inconsistent(
                                #nav_name,
                                "scalar key does not match the navigation's key"
                            ));
                        }
                        (Some(_), None) => {
                            return Err(repogen_core::RelationshipError::inconsistent(
                                #nav_name,
                                "navigation is set but the scalar key is missing"
                            ));
                        }
                        (None, Some(_)) => {
                            return Err(repogen_core::RelationshipError::inconsistent(
                                #nav_name,
                                "scalar key is set but the navigation is missing"
                            ));
                        }
                        _ => {}
                    }
                },
                (true, false) => quote! {
                    if let Some(parent) = &#child_ident.#nav {
                        if parent.#parent_key != #child_ident.#fk_field {
                            return Err(repogen_core::RelationshipError::inconsistent(
                                #nav_name,
                                "scalar key does not match the navigation's key"
                            ));
                        }
                    }
                },
                (false, true) => quote! {
                    match &#child_ident.#fk_field {
                        Some(key) if #child_ident.#nav.#parent_key != *key => {
                            return Err(repogen_core::RelationshipError::inconsistent(
                                #nav_name,
                                "scalar key does not match the navigation's key"
                            ));
                        }
                        None => {
                            return Err(repogen_core::RelationshipError::inconsistent(
                                #nav_name,
                                "navigation is set but the scalar key is missing"
                            ));
                        }
                        _ => {}
                    }
                },
                (false, false) => quote! {
                    if #child_ident.#nav.#parent_key != #child_ident.#fk_field {
                        return Err(repogen_core::RelationshipError::inconsistent(
                            #nav_name,
                            "scalar key does not match the navigation's key"
                        ));
                    }
                }
            };
            Some(check)
        })
        .collect();

    if checks.is_empty() {
        return quote!();
    }

    let doc = format!(
        "Check that every scalar key of a `{}` agrees with its navigation.",
        entity.simple_name
    );
    quote! {
        #[doc = #doc]
        pub fn validate_relationship_consistency(
            #child_ident: &#child_ty
        ) -> Result<(), repogen_core::RelationshipError> {
            #(#checks)*
            Ok(())
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
            pub struct Customer {
                #[id]
                pub id: i32,
                pub name: String,
                #[one_to_many("customer")]
                pub orders: Vec<Order>,
            }

            #[entity]
            #[table("orders")]
            pub struct Order {
                #[id]
                pub id: i32,
                #[many_to_one]
                #[join_column("customer_id")]
                pub customer: Option<Customer>,
                pub customer_id: i32,
            }
        };
        let (entities, _) = extract(&file.items, "", &sink);
        entities
    }

    #[test]
    fn parent_and_child_files_emit() {
        let sink = DiagnosticSink::new();
        let files = emit_relationship_helpers(&fixture(), &sink);
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.hint_name == "customer_relationship_helper.g.rs"));
        assert!(files.iter().any(|f| f.hint_name == "order_relationship_helper.g.rs"));
    }

    #[test]
    fn add_to_sets_key_navigation_and_collection() {
        let sink = DiagnosticSink::new();
        let files = emit_relationship_helpers(&fixture(), &sink);
        let customer = files
            .iter()
            .find(|f| f.hint_name.starts_with("customer"))
            .unwrap();
        assert!(customer.source_text.contains("pub fn add_to_orders"));
        assert!(customer.source_text.contains("customer_id = customer.id"));
        assert!(customer.source_text.contains("Some(customer.clone())"));
        assert!(customer.source_text.contains("pub fn remove_from_orders"));
        assert!(customer.source_text.contains("order.customer = None"));
    }

    #[test]
    fn child_file_carries_set_and_validate() {
        let sink = DiagnosticSink::new();
        let files = emit_relationship_helpers(&fixture(), &sink);
        let order = files
            .iter()
            .find(|f| f.hint_name.starts_with("order"))
            .unwrap();
        assert!(order.source_text.contains("pub fn set_customer"));
        assert!(order.source_text.contains("pub fn validate_relationship_consistency"));
        assert!(order.source_text.contains("RelationshipError"));
    }

    #[test]
    fn add_then_remove_restores_the_graph() {
        // The emitted pair must be inverse operations; the generated code
        // clears exactly what it set.
        let sink = DiagnosticSink::new();
        let files = emit_relationship_helpers(&fixture(), &sink);
        let customer = files
            .iter()
            .find(|f| f.hint_name.starts_with("customer"))
            .unwrap();
        assert!(customer.source_text.contains("push(order.clone())"));
        assert!(customer.source_text.contains("retain(|existing| existing.id != order.id)"));
        assert!(customer.source_text.contains("order.customer_id = Default::default()"));
    }

    #[test]
    fn unrelated_entity_gets_no_helper() {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct Lone {
                #[id]
                pub id: i64,
            }
        };
        let (entities, _) = extract(&file.items, "", &sink);
        assert!(emit_relationship_helpers(&entities, &sink).is_empty());
    }
}
