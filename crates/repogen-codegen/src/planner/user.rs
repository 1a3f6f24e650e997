// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! User-method planning.
//!
//! A declared method resolves through, in priority order: `#[bulk_operation]`,
//! `#[query]` (CPQL translated unless `native`), `#[stored_procedure]`, and
//! finally its own name via the derived-query DSL. Whatever fails leaves a
//! diagnostic and a guarded body behind — the repository always emits a
//! complete implementation.

use convert_case::{Case, Casing};

use super::{EntityBinding, MultiMapType, PlannedUserMethod, UserBody, UserCall, lower_intent};
use crate::{
    cpql::{self, CpqlEntity, CpqlMetadata, CpqlOptions},
    diagnostics::{Code, Diagnostic, DiagnosticSink},
    method_name::{self, ParseErrorKind, Verb},
    model::{
        EntityModel, EntitySet, Property, RepositoryModel, ReturnShape, UserMethod, ValueKind,
        generic_argument, last_segment, strip_wrappers
    },
    sql
};

/// Plan every declared method of a repository.
pub fn plan(
    repository: &RepositoryModel,
    entity: &EntityModel,
    entities: &EntitySet,
    sink: &DiagnosticSink
) -> (Vec<PlannedUserMethod>, Vec<MultiMapType>) {
    let mut planned = Vec::new();
    let mut multi_maps = Vec::new();
    for method in &repository.user_methods {
        let body = plan_method(method, repository, entity, entities, &mut multi_maps, sink);
        planned.push(PlannedUserMethod {
            method: method.clone(),
            body
        });
    }
    (planned, multi_maps)
}

fn location(repository: &RepositoryModel, method: &UserMethod) -> String {
    format!("{}::{}", repository.trait_name, method.name)
}

fn plan_method(
    method: &UserMethod,
    repository: &RepositoryModel,
    entity: &EntityModel,
    entities: &EntitySet,
    multi_maps: &mut Vec<MultiMapType>,
    sink: &DiagnosticSink
) -> UserBody {
    if let Some(bulk) = &method.bulk {
        return plan_bulk(method, bulk, repository, entity, sink);
    }
    if let Some(query) = &method.query {
        return plan_query(method, query, repository, entities, multi_maps, sink);
    }
    if let Some(procedure) = &method.stored_procedure {
        return plan_stored_procedure(method, procedure);
    }
    plan_from_name(method, repository, entity, entities, sink)
}

/// Call shape for a fixed statement, from the statement and return shape.
fn call_for_statement(sql_text: &str, method: &UserMethod) -> UserCall {
    let head = sql_text.trim_start().to_ascii_uppercase();
    let mutating = head.starts_with("INSERT") || head.starts_with("UPDATE")
        || head.starts_with("DELETE") || head.starts_with("EXEC");
    match &method.return_shape {
        ReturnShape::Many(ty) => UserCall::Query(ty.clone()),
        ReturnShape::Single(ty) => {
            // `Option<scalar>` reads a nullable scalar, not a row.
            if ValueKind::of(strip_wrappers(ty)) == ValueKind::Other {
                UserCall::QuerySingle(ty.clone())
            } else {
                UserCall::Scalar(syn::parse_quote!(Option<#ty>))
            }
        }
        ReturnShape::Unit => UserCall::Unit,
        ReturnShape::Value(ty) => {
            let kind = ValueKind::of(strip_wrappers(ty));
            if mutating || last_segment(ty).as_deref() == Some("u64") {
                UserCall::Execute
            } else if kind == ValueKind::Other && last_segment(ty).as_deref() != Some("bool") {
                UserCall::One(ty.clone())
            } else {
                UserCall::Scalar(ty.clone())
            }
        }
    }
}

fn plan_query(
    method: &UserMethod,
    args: &crate::attrs::QueryArgs,
    repository: &RepositoryModel,
    entities: &EntitySet,
    multi_maps: &mut Vec<MultiMapType>,
    sink: &DiagnosticSink
) -> UserBody {
    let Some(source) = &args.sql else {
        sink.push(Diagnostic::error(
            Code::CpqlRewrite,
            location(repository, method),
            "#[query] requires a query string"
        ));
        return UserBody::Guarded {
            message: "query string missing on #[query] attribute".to_owned()
        };
    };

    let sql_text = if args.native.unwrap_or(false) {
        source.clone()
    } else {
        let metadata = cpql_metadata(entities);
        match cpql::translate(source, Some(&metadata), &CpqlOptions::default()) {
            Ok(sql_text) => sql_text,
            Err(err) => {
                sink.push(Diagnostic::error(
                    Code::CpqlRewrite,
                    location(repository, method),
                    format!("query failed to translate: {err}")
                ));
                return UserBody::Guarded {
                    message: format!("query failed to translate: {err}")
                };
            }
        }
    };

    if let Some(mapping) = &method.multi_mapping {
        register_multi_map(method, mapping, multi_maps);
    }

    UserBody::Sql {
        call: call_for_statement(&sql_text, method),
        sql:  sql_text
    }
}

/// Record the multi-mapping record type behind the declared element type.
fn register_multi_map(
    method: &UserMethod,
    mapping: &crate::attrs::MultiMappingArgs,
    multi_maps: &mut Vec<MultiMapType>
) {
    let element = match &method.return_shape {
        ReturnShape::Many(ty) | ReturnShape::Single(ty) | ReturnShape::Value(ty) => ty,
        ReturnShape::Unit => return
    };
    let Some(name) = last_segment(element) else {
        return;
    };
    if mapping.map_types.is_empty() || multi_maps.iter().any(|m| m.name == name) {
        return;
    }
    let fields = mapping
        .map_types
        .iter()
        .filter_map(|type_name| {
            let ident = syn::parse_str::<syn::Type>(type_name).ok()?;
            Some((type_name.to_case(Case::Snake), ident))
        })
        .collect();
    multi_maps.push(MultiMapType {
        name,
        fields,
        split_on: mapping.split_on.clone()
    });
}

fn plan_stored_procedure(method: &UserMethod, args: &crate::attrs::StoredProcedureArgs) -> UserBody {
    let name = args
        .procedure_name
        .clone()
        .unwrap_or_else(|| method.name.to_case(Case::Pascal));
    let qualified = match &args.schema {
        Some(schema) => format!("{schema}.{name}"),
        None => name
    };
    let assignments: Vec<String> = method
        .params
        .iter()
        .map(|p| format!("@{} = @{}", p.name, p.name))
        .collect();
    let sql_text = if assignments.is_empty() {
        format!("EXEC {qualified}")
    } else {
        format!("EXEC {qualified} {}", assignments.join(", "))
    };
    UserBody::Sql {
        call: call_for_statement(&sql_text, method),
        sql:  sql_text
    }
}

fn plan_bulk(
    method: &UserMethod,
    args: &crate::attrs::BulkOperationArgs,
    repository: &RepositoryModel,
    entity: &EntityModel,
    sink: &DiagnosticSink
) -> UserBody {
    let items = method.params.iter().find(|p| {
        let stripped = strip_wrappers(&p.ty);
        last_segment(stripped).as_deref() == Some("Vec")
            && generic_argument(stripped)
                .and_then(last_segment)
                .as_deref()
                == Some(entity.simple_name.as_str())
    });
    let Some(items) = items else {
        sink.push(Diagnostic::error(
            Code::UnparsableMethod,
            location(repository, method),
            format!(
                "bulk operations need a Vec<{}> parameter",
                entity.simple_name
            )
        ));
        return UserBody::Guarded {
            message: "bulk operation has no entity collection parameter".to_owned()
        };
    };

    let generated = entity.pk_property().is_some_and(Property::is_generated);
    let insertable: Vec<&Property> = entity
        .properties
        .iter()
        .filter(|p| !(generated && p.is_key()))
        .collect();
    let columns: Vec<String> = insertable.iter().map(|p| p.column.name.clone()).collect();
    let params: Vec<String> = insertable.iter().map(|p| p.name.clone()).collect();
    let bindings: Vec<EntityBinding> = insertable
        .iter()
        .map(|p| EntityBinding {
            param: p.name.clone(),
            field: p.name.clone(),
            clone: matches!(p.kind, ValueKind::Text | ValueKind::Other)
        })
        .collect();

    UserBody::Bulk {
        sql: sql::insert(&entity.table.qualified(), &columns, &params),
        batch_size: args.batch_size.unwrap_or(100),
        use_transaction: args.use_transaction.unwrap_or(true),
        items_param: items.name.clone(),
        bindings
    }
}

fn plan_from_name(
    method: &UserMethod,
    repository: &RepositoryModel,
    entity: &EntityModel,
    entities: &EntitySet,
    sink: &DiagnosticSink
) -> UserBody {
    let intent = match method_name::parse(&method.name, entity, entities) {
        Ok(intent) => intent,
        Err(err) => {
            let code = match err.kind {
                ParseErrorKind::UnknownProperty => Code::UnknownProperty,
                ParseErrorKind::OperatorType => Code::OperatorType,
                ParseErrorKind::UnknownVerb | ParseErrorKind::Trailing => Code::UnparsableMethod
            };
            sink.push(Diagnostic::error(
                code,
                location(repository, method),
                err.message.clone()
            ));
            return UserBody::Guarded {
                message: err.message
            };
        }
    };

    let param_names: Vec<String> = method.params.iter().map(|p| p.name.clone()).collect();
    let sql_text = match lower_intent(&intent, entity, &param_names) {
        Ok(sql_text) => sql_text,
        Err(err) => {
            sink.push(Diagnostic::error(
                Code::ParameterCount,
                location(repository, method),
                err.message.clone()
            ));
            return UserBody::Guarded {
                message: err.message
            };
        }
    };

    let call = match intent.verb {
        Verb::Select => match &method.return_shape {
            ReturnShape::Many(ty) => UserCall::Query(ty.clone()),
            ReturnShape::Single(ty) => UserCall::QuerySingle(ty.clone()),
            ReturnShape::Value(ty) => UserCall::One(ty.clone()),
            ReturnShape::Unit => {
                sink.push(Diagnostic::error(
                    Code::UnparsableMethod,
                    location(repository, method),
                    "finder methods must return a value"
                ));
                return UserBody::Guarded {
                    message: "finder method returns nothing".to_owned()
                };
            }
        },
        Verb::Count => UserCall::Scalar(syn::parse_quote!(i64)),
        Verb::Exists => UserCall::Exists,
        Verb::Delete => match &method.return_shape {
            ReturnShape::Unit => UserCall::Unit,
            _ => UserCall::Execute
        }
    };

    UserBody::Sql {
        sql: sql_text,
        call
    }
}

/// Translator view of the entity set.
pub fn cpql_metadata(entities: &EntitySet) -> CpqlMetadata {
    CpqlMetadata::new(
        entities
            .iter()
            .map(|entity| CpqlEntity {
                name:       entity.simple_name.clone(),
                table:      entity.table.qualified(),
                properties: entity
                    .properties
                    .iter()
                    .map(|p| (p.name.clone(), p.column.name.clone()))
                    .collect()
            })
            .collect()
    )
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;
    use crate::model::extract;

    fn fixture() -> (EntitySet, Vec<RepositoryModel>, DiagnosticSink) {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct User {
                #[id]
                #[generated_value]
                pub id: i64,
                #[column("email")]
                pub email: String,
                pub age: i32,
            }

            #[repository]
            pub trait UserRepository: CrudRepository<User, i64> {
                async fn find_by_email(&self, email: String) -> RepoResult<Option<User>>;
                async fn count_by_age_greater_than(&self, age: i32) -> RepoResult<i64>;
                #[query("SELECT u FROM User u WHERE u.age > :age")]
                async fn adults(&self, age: i32) -> RepoResult<Vec<User>>;
                #[query("SELECT COUNT(*) FROM users", native = true)]
                async fn raw_count(&self) -> RepoResult<i64>;
                async fn find_by_nickname(&self, nickname: String) -> RepoResult<Vec<User>>;
                #[bulk_operation(batch_size = 2)]
                async fn import(&self, items: Vec<User>) -> RepoResult<u64>;
                #[stored_procedure("PruneUsers", schema = "ops")]
                async fn prune(&self, cutoff: i32) -> RepoResult<u64>;
            }
        };
        let (entities, repositories) = extract(&file.items, "", &sink);
        (entities, repositories, sink)
    }

    fn body_of<'a>(planned: &'a [PlannedUserMethod], name: &str) -> &'a UserBody {
        &planned.iter().find(|m| m.method.name == name).unwrap().body
    }

    #[test]
    fn name_derived_single_row_method() {
        let (entities, repositories, sink) = fixture();
        let entity = entities.get("User").unwrap();
        let (planned, _) = plan(&repositories[0], entity, &entities, &sink);
        let UserBody::Sql {
            sql,
            call
        } = body_of(&planned, "find_by_email")
        else {
            panic!("expected sql body");
        };
        assert_eq!(sql, "SELECT * FROM users WHERE email = @email");
        assert!(matches!(call, UserCall::QuerySingle(_)));
    }

    #[test]
    fn count_method_uses_scalar_call() {
        let (entities, repositories, sink) = fixture();
        let entity = entities.get("User").unwrap();
        let (planned, _) = plan(&repositories[0], entity, &entities, &sink);
        let UserBody::Sql {
            sql,
            call
        } = body_of(&planned, "count_by_age_greater_than")
        else {
            panic!("expected sql body");
        };
        assert_eq!(sql, "SELECT COUNT(*) FROM users WHERE age > @age");
        assert!(matches!(call, UserCall::Scalar(_)));
    }

    #[test]
    fn cpql_query_translates() {
        let (entities, repositories, sink) = fixture();
        let entity = entities.get("User").unwrap();
        let (planned, _) = plan(&repositories[0], entity, &entities, &sink);
        let UserBody::Sql {
            sql, ..
        } = body_of(&planned, "adults")
        else {
            panic!("expected sql body");
        };
        assert_eq!(
            sql,
            "SELECT u.id AS id, u.email AS email, u.age AS age FROM users u WHERE age > @age"
        );
    }

    #[test]
    fn native_query_passes_through() {
        let (entities, repositories, sink) = fixture();
        let entity = entities.get("User").unwrap();
        let (planned, _) = plan(&repositories[0], entity, &entities, &sink);
        let UserBody::Sql {
            sql, ..
        } = body_of(&planned, "raw_count")
        else {
            panic!("expected sql body");
        };
        assert_eq!(sql, "SELECT COUNT(*) FROM users");
    }

    #[test]
    fn unknown_property_degrades_to_guarded_body() {
        let (entities, repositories, sink) = fixture();
        let entity = entities.get("User").unwrap();
        let (planned, _) = plan(&repositories[0], entity, &entities, &sink);
        assert!(matches!(
            body_of(&planned, "find_by_nickname"),
            UserBody::Guarded { .. }
        ));
        assert!(
            sink.to_vec()
                .iter()
                .any(|d| d.code == Code::UnknownProperty)
        );
    }

    #[test]
    fn bulk_operation_plans_batches() {
        let (entities, repositories, sink) = fixture();
        let entity = entities.get("User").unwrap();
        let (planned, _) = plan(&repositories[0], entity, &entities, &sink);
        let UserBody::Bulk {
            sql,
            batch_size,
            use_transaction,
            items_param,
            bindings
        } = body_of(&planned, "import")
        else {
            panic!("expected bulk body");
        };
        assert_eq!(sql, "INSERT INTO users (email, age) VALUES (@email, @age)");
        assert_eq!(*batch_size, 2);
        assert!(*use_transaction);
        assert_eq!(items_param, "items");
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn stored_procedure_builds_exec() {
        let (entities, repositories, sink) = fixture();
        let entity = entities.get("User").unwrap();
        let (planned, _) = plan(&repositories[0], entity, &entities, &sink);
        let UserBody::Sql {
            sql,
            call
        } = body_of(&planned, "prune")
        else {
            panic!("expected sql body");
        };
        assert_eq!(sql, "EXEC ops.PruneUsers @cutoff = @cutoff");
        assert!(matches!(call, UserCall::Execute));
    }
}
