// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Base CRUD planning.
//!
//! Every repository gets the `CrudRepository<Entity, Key>` surface:
//! find_by_id, find_all, save, update, delete_by_id, count, exists_by_id.
//! Generated keys route the INSERT through `execute_scalar` with a
//! `SCOPE_IDENTITY()` read-back; everything else is plain statements.

use super::{DerivedMethod, EntityBinding, PlanBody, PlanParam, PlanReturn};
use crate::{
    model::{EntityModel, Property, RepositoryModel, ValueKind},
    sql
};

/// Whether binding this property requires a `.clone()`.
fn needs_clone(property: &Property) -> bool {
    matches!(property.kind, ValueKind::Text | ValueKind::Other)
}

fn binding(property: &Property) -> EntityBinding {
    EntityBinding {
        param: property.name.clone(),
        field: property.name.clone(),
        clone: needs_clone(property)
    }
}

/// Plan the base CRUD methods for one repository.
pub fn plan(entity: &EntityModel, repository: &RepositoryModel) -> Vec<DerivedMethod> {
    let table = entity.table.qualified();
    let pk_column = entity.pk_column().to_owned();
    let key_ty = repository.key_type.clone();
    let entity_ty: syn::Type = {
        let ident = quote::format_ident!("{}", entity.simple_name);
        syn::parse_quote!(#ident)
    };

    let mut methods = Vec::new();

    methods.push(DerivedMethod {
        name:   "find_by_id".to_owned(),
        doc:    "Fetch one entity by primary key.".to_owned(),
        params: vec![PlanParam::bound("id", key_ty.clone())],
        ret:    PlanReturn::OptionalEntity,
        body:   PlanBody::QuerySingle {
            sql: sql::select(&sql::SelectSpec {
                columns: "*".to_owned(),
                table: table.clone(),
                where_sql: Some(format!("{pk_column} = @id")),
                ..sql::SelectSpec::default()
            })
        }
    });

    methods.push(DerivedMethod {
        name:   "find_all".to_owned(),
        doc:    "Fetch all entities, ordered by primary key.".to_owned(),
        params: Vec::new(),
        ret:    PlanReturn::Entities,
        body:   PlanBody::Query {
            sql: sql::select(&sql::SelectSpec {
                columns: "*".to_owned(),
                table: table.clone(),
                order_by: Some(pk_column.clone()),
                ..sql::SelectSpec::default()
            })
        }
    });

    methods.push(plan_save(entity, &table, repository, entity_ty.clone()));

    methods.push(plan_update(entity, &table, &pk_column, entity_ty));

    methods.push(DerivedMethod {
        name:   "delete_by_id".to_owned(),
        doc:    "Delete by primary key, returning affected rows.".to_owned(),
        params: vec![PlanParam::bound("id", key_ty.clone())],
        ret:    PlanReturn::Affected,
        body:   PlanBody::Execute {
            sql: sql::delete(&table, Some(&format!("{pk_column} = @id")))
        }
    });

    methods.push(DerivedMethod {
        name:   "count".to_owned(),
        doc:    "Count all entities.".to_owned(),
        params: Vec::new(),
        ret:    PlanReturn::Count,
        body:   PlanBody::Count {
            sql: sql::count(&table, None)
        }
    });

    methods.push(DerivedMethod {
        name:   "exists_by_id".to_owned(),
        doc:    "Whether an entity with the given key exists.".to_owned(),
        params: vec![PlanParam::bound("id", key_ty)],
        ret:    PlanReturn::Bool,
        body:   PlanBody::Exists {
            sql: sql::exists(&table, &format!("{pk_column} = @id"))
        }
    });

    methods
}

fn plan_save(
    entity: &EntityModel,
    table: &str,
    repository: &RepositoryModel,
    entity_ty: syn::Type
) -> DerivedMethod {
    let generated = entity.pk_property().is_some_and(Property::is_generated);
    let insertable: Vec<&Property> = entity
        .properties
        .iter()
        .filter(|p| !(generated && p.is_key()))
        .collect();
    let columns: Vec<String> = insertable.iter().map(|p| p.column.name.clone()).collect();
    let params: Vec<String> = insertable.iter().map(|p| p.name.clone()).collect();
    let bindings: Vec<EntityBinding> = insertable.iter().map(|p| binding(p)).collect();

    let insert_sql = sql::insert(table, &columns, &params);
    let (sql_text, generated_key) = if generated {
        let key_property = entity.primary_key[0].clone();
        (
            format!("{insert_sql}; SELECT SCOPE_IDENTITY()"),
            Some((key_property, repository.key_type.clone()))
        )
    } else {
        (insert_sql, None)
    };

    DerivedMethod {
        name:   "save".to_owned(),
        doc:    "Insert a new entity, returning it with any generated key applied.".to_owned(),
        params: vec![PlanParam::unbound("entity", entity_ty)],
        ret:    PlanReturn::Entity,
        body:   PlanBody::Insert {
            sql: sql_text,
            generated_key,
            bindings
        }
    }
}

fn plan_update(
    entity: &EntityModel,
    table: &str,
    pk_column: &str,
    entity_ty: syn::Type
) -> DerivedMethod {
    let updatable: Vec<&Property> =
        entity.properties.iter().filter(|p| !p.is_key()).collect();
    // Key-only entities keep a valid statement: the key reassigns itself.
    let assignments: Vec<(String, String)> = if updatable.is_empty() {
        vec![(pk_column.to_owned(), entity.primary_key[0].clone())]
    } else {
        updatable
            .iter()
            .map(|p| (p.column.name.clone(), p.name.clone()))
            .collect()
    };
    let key_property = entity.primary_key[0].clone();
    let mut bindings: Vec<EntityBinding> = updatable.iter().map(|p| binding(p)).collect();
    if let Some(pk) = entity.pk_property() {
        bindings.push(binding(pk));
    }

    DerivedMethod {
        name:   "update".to_owned(),
        doc:    "Update an existing entity by primary key.".to_owned(),
        params: vec![PlanParam::unbound("entity", entity_ty)],
        ret:    PlanReturn::Affected,
        body:   PlanBody::UpdateEntity {
            sql: sql::update(table, &assignments, &format!("{pk_column} = @{key_property}")),
            bindings
        }
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;
    use crate::{diagnostics::DiagnosticSink, model::extract};

    fn fixture() -> (EntityModel, RepositoryModel) {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct User {
                #[id]
                #[generated_value]
                pub id: i64,
                #[column("email")]
                pub email: String,
                pub active: bool,
            }

            #[repository]
            pub trait UserRepository: CrudRepository<User, i64> {}
        };
        let (entities, mut repositories) = extract(&file.items, "", &sink);
        (entities.get("User").unwrap().clone(), repositories.remove(0))
    }

    #[test]
    fn find_by_id_targets_the_key_column() {
        let (entity, repository) = fixture();
        let methods = plan(&entity, &repository);
        let find = methods.iter().find(|m| m.name == "find_by_id").unwrap();
        assert_eq!(
            find.body.sql().unwrap(),
            "SELECT * FROM users WHERE id = @id"
        );
    }

    #[test]
    fn save_skips_generated_key_and_reads_it_back() {
        let (entity, repository) = fixture();
        let methods = plan(&entity, &repository);
        let save = methods.iter().find(|m| m.name == "save").unwrap();
        let PlanBody::Insert {
            sql,
            generated_key,
            bindings
        } = &save.body
        else {
            panic!("expected insert body");
        };
        assert_eq!(
            sql,
            "INSERT INTO users (email, active) VALUES (@email, @active); SELECT SCOPE_IDENTITY()"
        );
        assert_eq!(generated_key.as_ref().unwrap().0, "id");
        assert_eq!(bindings.len(), 2);
        assert!(bindings[0].clone);
        assert!(!bindings[1].clone);
    }

    #[test]
    fn update_binds_key_last() {
        let (entity, _repository) = fixture();
        let methods = plan(&entity, &fixture().1);
        let update = methods.iter().find(|m| m.name == "update").unwrap();
        let PlanBody::UpdateEntity {
            sql,
            bindings
        } = &update.body
        else {
            panic!("expected update body");
        };
        assert_eq!(sql, "UPDATE users SET email = @email, active = @active WHERE id = @id");
        assert_eq!(bindings.last().unwrap().field, "id");
    }

    #[test]
    fn exists_uses_count_one() {
        let (entity, repository) = fixture();
        let methods = plan(&entity, &repository);
        let exists = methods.iter().find(|m| m.name == "exists_by_id").unwrap();
        assert_eq!(
            exists.body.sql().unwrap(),
            "SELECT COUNT(1) FROM users WHERE id = @id"
        );
    }
}
