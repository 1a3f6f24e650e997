// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Metadata extraction.
//!
//! Turns the declarations of one compilation unit into [`EntityModel`] and
//! [`RepositoryModel`] values. Extraction is two-phase: entities are parsed
//! first so relationship targets can resolve against the **full** entity
//! set, then repositories match their `CrudRepository<Entity, Key>` bound
//! against the built models.
//!
//! Failure semantics: unknown attributes warn; an unresolved relationship
//! target drops the relationship; a duplicate `#[id]` drops the entity; an
//! unresolved repository entity drops the repository. Siblings always
//! proceed.

use std::collections::BTreeSet;

use convert_case::{Case, Casing};
use syn::{FnArg, Item, ItemStruct, ItemTrait, Pat, ReturnType, TraitItem};

use super::{
    ColumnSpec, EntityModel, EntitySet, ManyToMany, ManyToOne, MethodParam, OneToMany, OneToOne,
    Property, Relationship, RepositoryModel, ReturnShape, Role, TableSpec, UserMethod, ValueKind,
    generic_argument, last_segment, strip_wrappers
};
use crate::{
    attrs::{
        AttributeArgs, BulkOperationArgs, ColumnArgs, GeneratedValueArgs, JoinColumnArgs,
        JoinTableArgs, ManyToManyArgs, ManyToOneArgs, MultiMappingArgs, OneToManyArgs,
        OneToOneArgs, QueryArgs, StoredProcedureArgs, TableArgs, warn_unknown_attributes
    },
    diagnostics::{Code, Diagnostic, DiagnosticSink}
};

/// Build the type model for one compilation unit.
///
/// `namespace` is the module path the declarations live in; it qualifies
/// every model name and ends up in the repository fingerprint.
pub fn extract(
    items: &[Item],
    namespace: &str,
    sink: &DiagnosticSink
) -> (EntitySet, Vec<RepositoryModel>) {
    let entity_items: Vec<&ItemStruct> = items
        .iter()
        .filter_map(|item| match item {
            Item::Struct(s) if AttributeArgs::present(&s.attrs, "entity") => Some(s),
            _ => None
        })
        .collect();
    let entity_names: BTreeSet<String> =
        entity_items.iter().map(|s| s.ident.to_string()).collect();

    let mut entities: Vec<EntityModel> = entity_items
        .iter()
        .filter_map(|item| extract_entity(item, namespace, sink))
        .collect();
    resolve_targets(&mut entities, &entity_names, sink);
    assign_foreign_key_roles(&mut entities);
    let entities = EntitySet::new(entities);

    let repositories = items
        .iter()
        .filter_map(|item| match item {
            Item::Trait(t) if AttributeArgs::present(&t.attrs, "repository") => {
                extract_repository(t, namespace, &entities, sink)
            }
            _ => None
        })
        .collect();

    (entities, repositories)
}

fn extract_entity(item: &ItemStruct, namespace: &str, sink: &DiagnosticSink) -> Option<EntityModel> {
    let simple_name = item.ident.to_string();
    warn_unknown_attributes(&item.attrs, sink, &simple_name);

    let syn::Fields::Named(fields) = &item.fields else {
        sink.push(Diagnostic::error(
            Code::MissingId,
            &simple_name,
            "entities must be structs with named fields"
        ));
        return None;
    };

    let table_args = TableArgs::read(&item.attrs, sink, &simple_name).unwrap_or_default();
    let table = TableSpec {
        name:   table_args
            .name
            .unwrap_or_else(|| format!("{}s", simple_name.to_lowercase())),
        schema: table_args.schema
    };

    let mut properties = Vec::new();
    let mut relationships = Vec::new();
    let mut primary_key = Vec::new();

    for field in &fields.named {
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = ident.to_string();
        let location = format!("{simple_name}.{name}");
        warn_unknown_attributes(&field.attrs, sink, &location);

        if let Some(relationship) = extract_relationship(field, &name, &simple_name, &table, sink) {
            relationships.push(relationship);
            continue;
        }

        let nullable_type = last_segment(&field.ty).as_deref() == Some("Option");
        let value_ty = strip_wrappers(&field.ty).clone();
        let column_args = ColumnArgs::read(&field.attrs, sink, &location);
        let generated = GeneratedValueArgs::read(&field.attrs, sink, &location);
        let is_id = AttributeArgs::present(&field.attrs, "id");

        let mut roles = BTreeSet::new();
        if is_id {
            roles.insert(Role::Id);
            primary_key.push(name.clone());
        }
        if generated.is_some() {
            roles.insert(Role::GeneratedValue);
        }
        if column_args.is_some() {
            roles.insert(Role::Column);
        }

        let column_args = column_args.unwrap_or_default();
        let nullable = nullable_type || column_args.nullable.unwrap_or(false);
        properties.push(Property {
            kind: ValueKind::of(&value_ty),
            ty: value_ty,
            nullable,
            column: ColumnSpec {
                name: column_args.name.unwrap_or_else(|| name.clone()),
                sql_type: column_args.sql_type,
                length: column_args.length,
                precision: column_args.precision,
                scale: column_args.scale,
                nullable,
                unique: column_args.unique.unwrap_or(false)
            },
            roles,
            name
        });
    }

    if primary_key.len() > 1 {
        sink.push(Diagnostic::error(
            Code::DuplicateId,
            &simple_name,
            format!(
                "entity declares {} #[id] properties; exactly one is required",
                primary_key.len()
            )
        ));
        return None;
    }
    if primary_key.is_empty() {
        sink.push(Diagnostic::error(
            Code::MissingId,
            &simple_name,
            "entity declares no #[id] property"
        ));
        return None;
    }

    Some(EntityModel {
        qualified_name: qualify(namespace, &simple_name),
        simple_name,
        table,
        properties,
        relationships,
        primary_key
    })
}

fn extract_relationship(
    field: &syn::Field,
    name: &str,
    owner: &str,
    owner_table: &TableSpec,
    sink: &DiagnosticSink
) -> Option<Relationship> {
    let location = format!("{owner}.{name}");
    let nullable = last_segment(&field.ty).as_deref() == Some("Option");

    if let Some(args) = ManyToOneArgs::read(&field.attrs, sink, &location) {
        let target = target_of(&field.ty)?;
        let join = JoinColumnArgs::read(&field.attrs, sink, &location).unwrap_or_default();
        return Some(Relationship::ManyToOne(ManyToOne {
            property: name.to_owned(),
            join_column: join.name.unwrap_or_else(|| default_fk_column(name)),
            optional: args.optional.unwrap_or(true),
            nullable,
            target_entity: target
        }));
    }

    if let Some(args) = OneToManyArgs::read(&field.attrs, sink, &location) {
        let target = element_of(&field.ty)?;
        return Some(Relationship::OneToMany(OneToMany {
            property: name.to_owned(),
            mapped_by: args.mapped_by,
            cascade: args.cascade,
            orphan_removal: args.orphan_removal.unwrap_or(false),
            collection_nullable: nullable,
            target_entity: target
        }));
    }

    if let Some(args) = OneToOneArgs::read(&field.attrs, sink, &location) {
        let target = target_of(&field.ty)?;
        let join = JoinColumnArgs::read(&field.attrs, sink, &location).unwrap_or_default();
        // Without mapped_by this side owns the association; the default
        // join column mirrors the many-to-one rule.
        let join_column = if args.mapped_by.is_some() {
            join.name
        } else {
            Some(join.name.unwrap_or_else(|| default_fk_column(name)))
        };
        return Some(Relationship::OneToOne(OneToOne {
            property: name.to_owned(),
            join_column,
            mapped_by: args.mapped_by,
            orphan_removal: args.orphan_removal.unwrap_or(false),
            nullable,
            target_entity: target
        }));
    }

    if let Some(args) = ManyToManyArgs::read(&field.attrs, sink, &location) {
        let target = element_of(&field.ty)?;
        let join = JoinTableArgs::read(&field.attrs, sink, &location).unwrap_or_default();
        let owner_snake = owner.to_case(Case::Snake);
        let target_snake = target.to_case(Case::Snake);
        let join_table = join
            .name
            .unwrap_or_else(|| format!("{}_{}s", owner_table.name.trim_end_matches('s'), target_snake));
        let join_columns = if join.join_columns.is_empty() {
            vec![format!("{owner_snake}_id")]
        } else {
            join.join_columns
        };
        let inverse_join_columns = if join.inverse_join_columns.is_empty() {
            vec![format!("{target_snake}_id")]
        } else {
            join.inverse_join_columns
        };
        return Some(Relationship::ManyToMany(ManyToMany {
            property: name.to_owned(),
            join_table,
            join_columns,
            inverse_join_columns,
            mapped_by: args.mapped_by,
            target_entity: target
        }));
    }

    None
}

/// Default foreign-key column for a navigation property: the **simple**
/// navigation name plus `_id`. Qualified type names never leak in here.
fn default_fk_column(navigation: &str) -> String {
    format!("{navigation}_id")
}

fn target_of(ty: &syn::Type) -> Option<String> {
    last_segment(strip_wrappers(ty))
}

fn element_of(ty: &syn::Type) -> Option<String> {
    let stripped = strip_wrappers(ty);
    if last_segment(stripped).as_deref() == Some("Vec") {
        generic_argument(stripped).and_then(last_segment)
    } else {
        None
    }
}

/// Drop relationships whose target entity is not in this compilation.
///
/// Derived methods that would need the target fall away with it.
fn resolve_targets(
    entities: &mut [EntityModel],
    entity_names: &BTreeSet<String>,
    sink: &DiagnosticSink
) {
    for entity in entities.iter_mut() {
        let owner = entity.simple_name.clone();
        entity.relationships.retain(|relationship| {
            let target = relationship.target_entity();
            if entity_names.contains(target) {
                true
            } else {
                sink.push(Diagnostic::warning(
                    Code::UnresolvedTarget,
                    format!("{owner}.{}", relationship.property()),
                    format!("relationship target `{target}` is not an entity in this compilation; relationship dropped")
                ));
                false
            }
        });
    }
}

/// Mark scalar properties that back a relationship's join column.
fn assign_foreign_key_roles(entities: &mut [EntityModel]) {
    for entity in entities.iter_mut() {
        let mut fk_columns: Vec<String> = Vec::new();
        for relationship in &entity.relationships {
            match relationship {
                Relationship::ManyToOne(r) => fk_columns.push(r.join_column.clone()),
                Relationship::OneToOne(r) => {
                    if let Some(column) = &r.join_column {
                        fk_columns.push(column.clone());
                    }
                }
                Relationship::OneToMany(_) | Relationship::ManyToMany(_) => {}
            }
        }
        for property in &mut entity.properties {
            if fk_columns.contains(&property.column.name) {
                property.roles.insert(Role::ForeignKey);
            }
        }
    }
}

fn extract_repository(
    item: &ItemTrait,
    namespace: &str,
    entities: &EntitySet,
    sink: &DiagnosticSink
) -> Option<RepositoryModel> {
    let trait_name = item.ident.to_string();
    warn_unknown_attributes(&item.attrs, sink, &trait_name);

    let Some((entity_ty, key_type)) = crud_bound(item) else {
        sink.push(Diagnostic::error(
            Code::MissingCrudBound,
            &trait_name,
            "repository traits must extend CrudRepository<Entity, Key>"
        ));
        return None;
    };

    let Some(entity_name) = last_segment(&entity_ty) else {
        sink.push(Diagnostic::error(
            Code::UnresolvedRepositoryEntity,
            &trait_name,
            "entity type parameter is not a named type"
        ));
        return None;
    };
    if !entities.contains(&entity_name) {
        sink.push(Diagnostic::error(
            Code::UnresolvedRepositoryEntity,
            &trait_name,
            format!("`{entity_name}` is not an entity in this compilation; repository omitted")
        ));
        return None;
    }

    let mut user_methods = Vec::new();
    for trait_item in &item.items {
        let TraitItem::Fn(method) = trait_item else {
            continue;
        };
        let name = method.sig.ident.to_string();
        let location = format!("{trait_name}::{name}");
        warn_unknown_attributes(&method.attrs, sink, &location);

        let params = method
            .sig
            .inputs
            .iter()
            .filter_map(|input| match input {
                FnArg::Receiver(_) => None,
                FnArg::Typed(typed) => {
                    let name = match typed.pat.as_ref() {
                        Pat::Ident(ident) => ident.ident.to_string(),
                        _ => return None
                    };
                    Some(MethodParam {
                        name,
                        ty: (*typed.ty).clone()
                    })
                }
            })
            .collect();

        user_methods.push(UserMethod {
            signature: method.sig.clone(),
            params,
            return_shape: return_shape(&method.sig.output),
            query: QueryArgs::read(&method.attrs, sink, &location),
            stored_procedure: StoredProcedureArgs::read(&method.attrs, sink, &location),
            multi_mapping: MultiMappingArgs::read(&method.attrs, sink, &location),
            bulk: BulkOperationArgs::read(&method.attrs, sink, &location),
            name
        });
    }

    Some(RepositoryModel {
        qualified_name: qualify(namespace, &trait_name),
        namespace: namespace.to_owned(),
        trait_name,
        entity: entity_name,
        key_type,
        user_methods
    })
}

/// Pull `(Entity, Key)` out of the `CrudRepository<Entity, Key>` supertrait.
fn crud_bound(item: &ItemTrait) -> Option<(syn::Type, syn::Type)> {
    for supertrait in &item.supertraits {
        let syn::TypeParamBound::Trait(bound) = supertrait else {
            continue;
        };
        let segment = bound.path.segments.last()?;
        if segment.ident != "CrudRepository" {
            continue;
        }
        let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
            continue;
        };
        let types: Vec<&syn::Type> = args
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(t) => Some(t),
                _ => None
            })
            .collect();
        if let [entity, key] = types.as_slice() {
            return Some(((*entity).clone(), (*key).clone()));
        }
    }
    None
}

/// Unwrap `RepoResult<T>` / `Result<T, E>` and classify the payload.
fn return_shape(output: &ReturnType) -> ReturnShape {
    let ReturnType::Type(_, ty) = output else {
        return ReturnShape::Unit;
    };
    let inner = match last_segment(ty).as_deref() {
        Some("RepoResult") | Some("Result") => match generic_argument(ty) {
            Some(t) => t.clone(),
            None => return ReturnShape::Unit
        },
        _ => (**ty).clone()
    };
    match last_segment(&inner).as_deref() {
        Some("Vec") => match generic_argument(&inner) {
            Some(t) => ReturnShape::Many(t.clone()),
            None => ReturnShape::Value(inner)
        },
        Some("Option") => match generic_argument(&inner) {
            Some(t) => ReturnShape::Single(t.clone()),
            None => ReturnShape::Value(inner)
        },
        _ => {
            if matches!(&inner, syn::Type::Tuple(t) if t.elems.is_empty()) {
                ReturnShape::Unit
            } else {
                ReturnShape::Value(inner)
            }
        }
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_owned()
    } else {
        format!("{namespace}::{name}")
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn unit() -> Vec<Item> {
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct Customer {
                #[id]
                #[generated_value]
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
                #[column("order_date")]
                pub order_date: String,
                #[many_to_one]
                #[join_column("customer_id")]
                pub customer: Option<Customer>,
                pub customer_id: i32,
            }

            #[repository]
            pub trait OrderRepository: CrudRepository<Order, i32> {
                async fn find_by_customer_id(&self, customer_id: i32) -> RepoResult<Vec<Order>>;
            }
        };
        file.items
    }

    #[test]
    fn partitions_entities_and_repositories() {
        let sink = DiagnosticSink::new();
        let (entities, repositories) = extract(&unit(), "domain", &sink);
        assert_eq!(entities.len(), 2);
        assert_eq!(repositories.len(), 1);
        assert!(sink.is_empty(), "{:?}", sink.to_vec());
    }

    #[test]
    fn default_table_name_is_lowercase_plural() {
        let sink = DiagnosticSink::new();
        let (entities, _) = extract(&unit(), "", &sink);
        assert_eq!(entities.get("Customer").unwrap().table.name, "customers");
        assert_eq!(entities.get("Order").unwrap().table.name, "orders");
    }

    #[test]
    fn column_override_and_default() {
        let sink = DiagnosticSink::new();
        let (entities, _) = extract(&unit(), "", &sink);
        let order = entities.get("Order").unwrap();
        assert_eq!(order.property("order_date").unwrap().column.name, "order_date");
        assert_eq!(order.property("customer_id").unwrap().column.name, "customer_id");
    }

    #[test]
    fn join_column_backs_foreign_key_role() {
        let sink = DiagnosticSink::new();
        let (entities, _) = extract(&unit(), "", &sink);
        let order = entities.get("Order").unwrap();
        assert!(order.property("customer_id").unwrap().is_foreign_key());
        let Relationship::ManyToOne(rel) = order.relationship("customer").unwrap() else {
            panic!("expected many-to-one");
        };
        assert_eq!(rel.join_column, "customer_id");
        assert!(rel.nullable);
    }

    #[test]
    fn unresolved_target_drops_relationship_not_entity() {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct Order {
                #[id]
                pub id: i32,
                #[many_to_one]
                pub customer: Option<Customer>,
            }
        };
        let (entities, _) = extract(&file.items, "", &sink);
        let order = entities.get("Order").unwrap();
        assert!(order.relationships.is_empty());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.to_vec()[0].code, Code::UnresolvedTarget);
    }

    #[test]
    fn duplicate_id_is_fatal_for_that_entity_only() {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct Broken {
                #[id]
                pub a: i32,
                #[id]
                pub b: i32,
            }

            #[entity]
            pub struct Fine {
                #[id]
                pub id: i32,
            }
        };
        let (entities, _) = extract(&file.items, "", &sink);
        assert!(entities.get("Broken").is_none());
        assert!(entities.get("Fine").is_some());
        assert!(sink.has_errors());
    }

    #[test]
    fn repository_without_known_entity_is_omitted() {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[repository]
            pub trait GhostRepository: CrudRepository<Ghost, i64> {}
        };
        let (_, repositories) = extract(&file.items, "", &sink);
        assert!(repositories.is_empty());
        assert!(sink.has_errors());
    }

    #[test]
    fn default_fk_column_uses_simple_navigation_name() {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct Customer {
                #[id]
                pub id: i32,
            }

            #[entity]
            pub struct Order {
                #[id]
                pub id: i32,
                #[many_to_one]
                pub customer: Option<domain::billing::Customer>,
            }
        };
        let (entities, _) = extract(&file.items, "", &sink);
        let order = entities.get("Order").unwrap();
        let Relationship::ManyToOne(rel) = order.relationship("customer").unwrap() else {
            panic!("expected many-to-one");
        };
        assert_eq!(rel.join_column, "customer_id");
    }

    #[test]
    fn nullability_from_option_or_override() {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct Note {
                #[id]
                pub id: i64,
                pub body: Option<String>,
                #[column(nullable = true)]
                pub hint: String,
                pub title: String,
            }
        };
        let (entities, _) = extract(&file.items, "", &sink);
        let note = entities.get("Note").unwrap();
        assert!(note.property("body").unwrap().nullable);
        assert!(note.property("hint").unwrap().nullable);
        assert!(!note.property("title").unwrap().nullable);
    }

    #[test]
    fn return_shapes() {
        let sig: syn::Signature = parse_quote! {
            fn f(&self) -> RepoResult<Vec<Order>>
        };
        assert!(matches!(return_shape(&sig.output), ReturnShape::Many(_)));
        let sig: syn::Signature = parse_quote! {
            fn f(&self) -> RepoResult<Option<Order>>
        };
        assert!(matches!(return_shape(&sig.output), ReturnShape::Single(_)));
        let sig: syn::Signature = parse_quote! {
            fn f(&self) -> RepoResult<i64>
        };
        assert!(matches!(return_shape(&sig.output), ReturnShape::Value(_)));
        let sig: syn::Signature = parse_quote! {
            fn f(&self) -> RepoResult<()>
        };
        assert!(matches!(return_shape(&sig.output), ReturnShape::Unit));
    }
}
