// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Relationship-derived method catalog.
//!
//! For each relationship of the repository's entity the planner emits the
//! fixed catalog: foreign-key finders with paged and sorted overloads,
//! existence and count probes on the inverse side, per-parent aggregates
//! with zero-coalesced sums, GROUP BY rollup maps, a combined summary
//! record, join-table operations, and complex filter pairs. A name already
//! claimed by the user or an earlier method is skipped.

use convert_case::{Case, Casing};

use super::{DerivedMethod, PlanBody, PlanParam, PlanReturn, SummaryType};
use crate::{
    diagnostics::{Code, Diagnostic, DiagnosticSink},
    method_name::inverse_fk_column,
    model::{
        EntityModel, EntitySet, ManyToMany, ManyToOne, OneToMany, OneToOne, Property,
        Relationship, RepositoryModel
    },
    sql::{self, AggregateFn, SelectSpec}
};

struct Catalog<'a> {
    methods:   Vec<DerivedMethod>,
    summaries: Vec<SummaryType>,
    taken:     &'a mut Vec<String>
}

impl Catalog<'_> {
    fn push(&mut self, method: DerivedMethod) {
        if self.taken.iter().any(|name| *name == method.name) {
            return;
        }
        self.taken.push(method.name.clone());
        self.methods.push(method);
    }
}

/// Plan the derived catalog for one repository.
pub fn plan(
    repository: &RepositoryModel,
    entity: &EntityModel,
    entities: &EntitySet,
    taken: &mut Vec<String>,
    sink: &DiagnosticSink
) -> (Vec<DerivedMethod>, Vec<SummaryType>) {
    let mut catalog = Catalog {
        methods: Vec::new(),
        summaries: Vec::new(),
        taken
    };

    for relationship in &entity.relationships {
        match relationship {
            Relationship::ManyToOne(r) => {
                many_to_one(&mut catalog, entity, entities, r, sink);
            }
            Relationship::OneToMany(r) => {
                one_to_many(&mut catalog, repository, entity, entities, r, sink);
            }
            Relationship::OneToOne(r) => {
                one_to_one(&mut catalog, entity, entities, r);
            }
            Relationship::ManyToMany(r) => {
                many_to_many(&mut catalog, repository, entity, entities, r, sink);
            }
        }
    }

    complex_filters(&mut catalog, entity, entities);

    (catalog.methods, catalog.summaries)
}

fn key_type(entity: &EntityModel) -> Option<syn::Type> {
    entity.pk_property().map(|p| p.ty.clone())
}

fn entity_finder(entity: &EntityModel, where_sql: String, paged: bool) -> PlanBody {
    PlanBody::Query {
        sql: sql::select(&SelectSpec {
            columns: "*".to_owned(),
            table: entity.table.qualified(),
            where_sql: Some(where_sql),
            order_by: Some(entity.pk_column().to_owned()),
            paged,
            ..SelectSpec::default()
        })
    }
}

fn scalar_targets(entity: &EntityModel) -> impl Iterator<Item = &Property> {
    entity.properties.iter().filter(|p| !p.is_key())
}

fn numeric_properties(entity: &EntityModel) -> impl Iterator<Item = &Property> {
    scalar_targets(entity).filter(|p| p.kind.is_numeric() && !p.is_foreign_key())
}

fn many_to_one(
    catalog: &mut Catalog<'_>,
    entity: &EntityModel,
    entities: &EntitySet,
    relationship: &ManyToOne,
    sink: &DiagnosticSink
) {
    let navigation = &relationship.property;
    let Some(target) = entities.get(&relationship.target_entity) else {
        return;
    };
    let Some(target_key) = key_type(target) else {
        sink.push(Diagnostic::error(
            Code::InternalInvariant,
            format!("{}.{navigation}", entity.simple_name),
            format!("target entity `{}` has no usable key", target.simple_name)
        ));
        return;
    };
    let fk = &relationship.join_column;
    let table = entity.table.qualified();
    let pk_column = entity.pk_column().to_owned();
    let id_param = format!("{navigation}_id");
    let i64_ty: syn::Type = syn::parse_quote!(i64);

    catalog.push(DerivedMethod {
        name:   format!("find_by_{id_param}"),
        doc:    format!("All rows owned by one `{}`.", target.simple_name),
        params: vec![PlanParam::bound(&id_param, target_key.clone())],
        ret:    PlanReturn::Entities,
        body:   entity_finder(entity, format!("{fk} = @{id_param}"), false)
    });

    catalog.push(DerivedMethod {
        name:   format!("find_by_{id_param}_paged"),
        doc:    format!("A window of rows owned by one `{}`.", target.simple_name),
        params: vec![
            PlanParam::bound(&id_param, target_key.clone()),
            PlanParam::bound("skip", i64_ty.clone()),
            PlanParam::bound("take", i64_ty.clone()),
        ],
        ret:    PlanReturn::Entities,
        body:   entity_finder(entity, format!("{fk} = @{id_param}"), true)
    });

    catalog.push(DerivedMethod {
        name:   format!("find_by_{id_param}_sorted"),
        doc:    "Windowed variant with a caller-chosen sort property.".to_owned(),
        params: vec![
            PlanParam::bound(&id_param, target_key.clone()),
            PlanParam::bound("skip", i64_ty.clone()),
            PlanParam::bound("take", i64_ty.clone()),
            PlanParam::unbound("order_by", syn::parse_quote!(Option<String>)),
            PlanParam::unbound("ascending", syn::parse_quote!(bool)),
        ],
        ret:    PlanReturn::Entities,
        body:   PlanBody::SortedPage {
            sql_prefix: format!("SELECT * FROM {table} WHERE {fk} = @{id_param}")
        }
    });

    catalog.push(DerivedMethod {
        name:   format!("count_by_{id_param}"),
        doc:    format!("Count of rows owned by one `{}`.", target.simple_name),
        params: vec![PlanParam::bound(&id_param, target_key.clone())],
        ret:    PlanReturn::Count,
        body:   PlanBody::Count {
            sql: sql::count(&table, Some(&format!("{fk} = @{id_param}")))
        }
    });

    // Finders over the target's scalar properties, joined as `r`.
    for property in scalar_targets(target) {
        let param = property.name.clone();
        catalog.push(DerivedMethod {
            name:   format!("find_by_{navigation}_{param}"),
            doc:    format!(
                "Rows whose `{navigation}` has the given `{param}`."
            ),
            params: vec![PlanParam::bound(&param, property.ty.clone())],
            ret:    PlanReturn::Entities,
            body:   PlanBody::Query {
                sql: sql::select(&SelectSpec {
                    columns: "e.*".to_owned(),
                    table: table.clone(),
                    alias: Some("e".to_owned()),
                    joins: vec![sql::Join {
                        kind:  sql::JoinKind::Inner,
                        table: target.table.qualified(),
                        alias: "r".to_owned(),
                        on:    format!("e.{fk} = r.{}", target.pk_column())
                    }],
                    where_sql: Some(sql::comparison(
                        &format!("r.{}", property.column.name),
                        crate::method_name::Operator::Eq,
                        &[&param],
                        false
                    )),
                    order_by: Some(format!("e.{pk_column}")),
                    ..SelectSpec::default()
                })
            }
        });
    }

    // Date-range filters over this entity's temporal properties.
    for property in scalar_targets(entity).filter(|p| p.kind.is_temporal()) {
        let d = property.name.clone();
        let column = property.column.name.clone();
        catalog.push(DerivedMethod {
            name:   format!("find_by_{navigation}_and_{d}_range"),
            doc:    format!("Rows of one `{}` within a `{d}` range.", target.simple_name),
            params: vec![
                PlanParam::bound(&id_param, target_key.clone()),
                PlanParam::bound(format!("start_{d}"), property.ty.clone()),
                PlanParam::bound(format!("end_{d}"), property.ty.clone()),
            ],
            ret:    PlanReturn::Entities,
            body:   entity_finder(
                entity,
                format!("{fk} = @{id_param} AND {column} BETWEEN @start_{d} AND @end_{d}"),
                false
            )
        });
    }

    // Amount filters over this entity's numeric properties.
    for property in numeric_properties(entity) {
        let n = property.name.clone();
        let column = property.column.name.clone();
        catalog.push(DerivedMethod {
            name:   format!("find_{navigation}_{n}_above"),
            doc:    format!("Rows of one `{}` with `{n}` above a floor.", target.simple_name),
            params: vec![
                PlanParam::bound(&id_param, target_key.clone()),
                PlanParam::bound(format!("min_{n}"), property.ty.clone()),
            ],
            ret:    PlanReturn::Entities,
            body:   entity_finder(
                entity,
                format!("{fk} = @{id_param} AND {column} > @min_{n}"),
                false
            )
        });
    }
}

fn one_to_one(
    catalog: &mut Catalog<'_>,
    entity: &EntityModel,
    entities: &EntitySet,
    relationship: &OneToOne
) {
    // Owner side only; the inverse side has no column to filter.
    let Some(fk) = &relationship.join_column else {
        return;
    };
    let Some(target) = entities.get(&relationship.target_entity) else {
        return;
    };
    let Some(target_key) = key_type(target) else {
        return;
    };
    let navigation = &relationship.property;
    let id_param = format!("{navigation}_id");
    let table = entity.table.qualified();

    catalog.push(DerivedMethod {
        name:   format!("find_by_{id_param}"),
        doc:    format!("The row paired with one `{}`.", target.simple_name),
        params: vec![PlanParam::bound(&id_param, target_key.clone())],
        ret:    PlanReturn::OptionalEntity,
        body:   PlanBody::QuerySingle {
            sql: sql::select(&SelectSpec {
                columns: "*".to_owned(),
                table: table.clone(),
                where_sql: Some(format!("{fk} = @{id_param}")),
                ..SelectSpec::default()
            })
        }
    });

    catalog.push(DerivedMethod {
        name:   format!("count_by_{id_param}"),
        doc:    "Count of rows carrying the pairing key.".to_owned(),
        params: vec![PlanParam::bound(&id_param, target_key)],
        ret:    PlanReturn::Count,
        body:   PlanBody::Count {
            sql: sql::count(&table, Some(&format!("{fk} = @{id_param}")))
        }
    });
}

fn one_to_many(
    catalog: &mut Catalog<'_>,
    repository: &RepositoryModel,
    entity: &EntityModel,
    entities: &EntitySet,
    relationship: &OneToMany,
    sink: &DiagnosticSink
) {
    let collection = &relationship.property;
    let Some(mapped_by) = &relationship.mapped_by else {
        return;
    };
    let Some(child) = entities.get(&relationship.target_entity) else {
        return;
    };
    let Some(fk) = inverse_fk_column(child, mapped_by) else {
        sink.push(Diagnostic::warning(
            Code::MappedByMissing,
            format!("{}.{collection}", entity.simple_name),
            format!(
                "mapped_by `{mapped_by}` names no owning relationship on `{}`; derived methods dropped",
                child.simple_name
            )
        ));
        return;
    };

    let key_ty = repository.key_type.clone();
    let parent_table = entity.table.qualified();
    let parent_pk = entity.pk_column().to_owned();
    let child_table = child.table.qualified();
    let child_pk = child.pk_column().to_owned();
    let parent_word = entity.simple_name.to_case(Case::Snake);
    let i64_ty: syn::Type = syn::parse_quote!(i64);
    let f64_ty: syn::Type = syn::parse_quote!(f64);

    catalog.push(DerivedMethod {
        name:   format!("has_{collection}"),
        doc:    format!("Whether the parent has any `{collection}`."),
        params: vec![PlanParam::bound("id", key_ty.clone())],
        ret:    PlanReturn::Bool,
        body:   PlanBody::Exists {
            sql: sql::count(&child_table, Some(&format!("{fk} = @id")))
        }
    });

    catalog.push(DerivedMethod {
        name:   format!("count_{collection}"),
        doc:    format!("Number of `{collection}` of one parent."),
        params: vec![PlanParam::bound("id", key_ty.clone())],
        ret:    PlanReturn::Count,
        body:   PlanBody::Count {
            sql: sql::count(&child_table, Some(&format!("{fk} = @id")))
        }
    });

    let exists_clause =
        format!("EXISTS (SELECT 1 FROM {child_table} c WHERE c.{fk} = e.{parent_pk})");
    catalog.push(DerivedMethod {
        name:   format!("find_with_{collection}"),
        doc:    format!("Parents that have at least one of `{collection}`."),
        params: Vec::new(),
        ret:    PlanReturn::Entities,
        body:   PlanBody::Query {
            sql: sql::select(&SelectSpec {
                columns: "e.*".to_owned(),
                table: parent_table.clone(),
                alias: Some("e".to_owned()),
                where_sql: Some(exists_clause.clone()),
                order_by: Some(format!("e.{parent_pk}")),
                ..SelectSpec::default()
            })
        }
    });

    catalog.push(DerivedMethod {
        name:   format!("find_without_{collection}"),
        doc:    format!("Parents that have none of `{collection}`."),
        params: Vec::new(),
        ret:    PlanReturn::Entities,
        body:   PlanBody::Query {
            sql: sql::select(&SelectSpec {
                columns: "e.*".to_owned(),
                table: parent_table.clone(),
                alias: Some("e".to_owned()),
                where_sql: Some(format!("NOT {exists_clause}")),
                order_by: Some(format!("e.{parent_pk}")),
                ..SelectSpec::default()
            })
        }
    });

    catalog.push(DerivedMethod {
        name:   format!("find_with_{collection}_count"),
        doc:    format!("Parents with at least `min_count` of `{collection}`."),
        params: vec![PlanParam::bound("min_count", i64_ty.clone())],
        ret:    PlanReturn::Entities,
        body:   PlanBody::Query {
            sql: sql::select(&SelectSpec {
                columns: "e.*".to_owned(),
                table: parent_table.clone(),
                alias: Some("e".to_owned()),
                where_sql: Some(format!(
                    "(SELECT COUNT(*) FROM {child_table} c WHERE c.{fk} = e.{parent_pk}) >= @min_count"
                )),
                order_by: Some(format!("e.{parent_pk}")),
                ..SelectSpec::default()
            })
        }
    });

    // Per-parent aggregates over the child side's numeric properties.
    for property in numeric_properties(child) {
        let n = property.name.clone();
        let column = property.column.name.clone();
        let aggregates = [
            (AggregateFn::Sum, PlanReturn::Scalar(property.ty.clone())),
            (AggregateFn::Avg, PlanReturn::OptionalScalar(f64_ty.clone())),
            (AggregateFn::Min, PlanReturn::OptionalScalar(property.ty.clone())),
            (AggregateFn::Max, PlanReturn::OptionalScalar(property.ty.clone())),
        ];
        for (function, ret) in aggregates {
            let sql_text = format!(
                "SELECT {} FROM {child_table} WHERE {fk} = @id",
                sql::aggregate(function, &column)
            );
            let body = match function {
                AggregateFn::Sum => PlanBody::Scalar {
                    sql: sql_text
                },
                _ => PlanBody::OptionalScalar {
                    sql: sql_text
                }
            };
            catalog.push(DerivedMethod {
                name: format!("get_{}_{collection}_{n}", function.word()),
                doc: format!("`{}` of `{n}` across one parent's `{collection}`.", function.word()),
                params: vec![PlanParam::bound("id", key_ty.clone())],
                ret,
                body
            });
        }
    }

    // GROUP BY rollups keyed by parent.
    let rollup = |select_value: String| {
        sql::group_by_summary(&sql::GroupBySummarySpec {
            parent_table: parent_table.clone(),
            parent_alias: "e".to_owned(),
            child_table:  child_table.clone(),
            child_alias:  "c".to_owned(),
            fk_column:    fk.clone(),
            parent_pk:    parent_pk.clone(),
            select_list:  format!("e.{parent_pk} AS key, {select_value} AS value"),
            group_by:     vec![format!("e.{parent_pk}")],
            order_by:     Some(format!("e.{parent_pk}"))
        })
    };

    catalog.push(DerivedMethod {
        name:   format!("get_{collection}_counts_by_{parent_word}"),
        doc:    format!("`{collection}` counts per parent."),
        params: Vec::new(),
        ret:    PlanReturn::Map {
            key:   key_ty.clone(),
            value: i64_ty.clone()
        },
        body:   PlanBody::GroupMap {
            sql: rollup(format!("COUNT(c.{child_pk})"))
        }
    });

    for property in numeric_properties(child) {
        let n = property.name.clone();
        let column = property.column.name.clone();
        let maps = [
            (
                AggregateFn::Sum,
                format!("get_{collection}_{n}_totals_by_{parent_word}"),
                property.ty.clone(),
                false
            ),
            (
                AggregateFn::Avg,
                format!("get_{collection}_{n}_averages_by_{parent_word}"),
                f64_ty.clone(),
                true
            ),
            (
                AggregateFn::Min,
                format!("get_{collection}_{n}_mins_by_{parent_word}"),
                property.ty.clone(),
                true
            ),
            (
                AggregateFn::Max,
                format!("get_{collection}_{n}_maxes_by_{parent_word}"),
                property.ty.clone(),
                true
            ),
        ];
        for (function, name, value_ty, nullable) in maps {
            let value: syn::Type = if nullable {
                syn::parse_quote!(Option<#value_ty>)
            } else {
                value_ty.clone()
            };
            catalog.push(DerivedMethod {
                name,
                doc: format!(
                    "Per-parent `{}` of `{n}` across `{collection}`.",
                    function.word()
                ),
                params: Vec::new(),
                ret: PlanReturn::Map {
                    key: key_ty.clone(),
                    value
                },
                body: PlanBody::GroupMap {
                    sql: rollup(sql::aggregate(function, &format!("c.{column}")))
                }
            });
        }
    }

    summary(catalog, entity, child, relationship, &fk);
}

/// Combined per-parent summary: parent columns plus every aggregate.
fn summary(
    catalog: &mut Catalog<'_>,
    entity: &EntityModel,
    child: &EntityModel,
    relationship: &OneToMany,
    fk: &str
) {
    let collection = &relationship.property;
    let parent_word = entity.simple_name.to_case(Case::Snake);
    let struct_name = format!(
        "{}{}Summary",
        entity.simple_name,
        collection.to_case(Case::Pascal)
    );
    let parent_pk = entity.pk_column().to_owned();
    let child_pk = child.pk_column().to_owned();

    let mut select_list: Vec<String> = entity
        .properties
        .iter()
        .map(|p| format!("e.{} AS {}", p.column.name, p.name))
        .collect();
    let mut fields: Vec<(String, syn::Type, bool)> = entity
        .properties
        .iter()
        .map(|p| (p.name.clone(), p.ty.clone(), p.nullable))
        .collect();

    select_list.push(format!("COUNT(c.{child_pk}) AS {collection}_count"));
    fields.push((
        format!("{collection}_count"),
        syn::parse_quote!(i64),
        false
    ));

    for property in numeric_properties(child) {
        let n = &property.name;
        let column = format!("c.{}", property.column.name);
        select_list.push(format!(
            "{} AS total_{n}",
            sql::aggregate(AggregateFn::Sum, &column)
        ));
        fields.push((format!("total_{n}"), property.ty.clone(), false));
        select_list.push(format!(
            "{} AS average_{n}",
            sql::aggregate(AggregateFn::Avg, &column)
        ));
        fields.push((format!("average_{n}"), syn::parse_quote!(f64), true));
        select_list.push(format!(
            "{} AS min_{n}",
            sql::aggregate(AggregateFn::Min, &column)
        ));
        fields.push((format!("min_{n}"), property.ty.clone(), true));
        select_list.push(format!(
            "{} AS max_{n}",
            sql::aggregate(AggregateFn::Max, &column)
        ));
        fields.push((format!("max_{n}"), property.ty.clone(), true));
    }

    let sql_text = sql::group_by_summary(&sql::GroupBySummarySpec {
        parent_table: entity.table.qualified(),
        parent_alias: "e".to_owned(),
        child_table:  child.table.qualified(),
        child_alias:  "c".to_owned(),
        fk_column:    fk.to_owned(),
        parent_pk:    parent_pk.clone(),
        select_list:  select_list.join(", "),
        group_by:     entity
            .properties
            .iter()
            .map(|p| format!("e.{}", p.column.name))
            .collect(),
        order_by:     Some(format!("e.{parent_pk}"))
    });

    catalog.push(DerivedMethod {
        name:   format!("get_{parent_word}_{collection}_summary"),
        doc:    format!("Each parent with its `{collection}` aggregates."),
        params: Vec::new(),
        ret:    PlanReturn::Rows(struct_name.clone()),
        body:   PlanBody::Rows {
            sql:         sql_text,
            struct_name: struct_name.clone()
        }
    });
    if !catalog.summaries.iter().any(|s| s.name == struct_name) {
        catalog.summaries.push(SummaryType {
            name:   struct_name,
            fields
        });
    }
}

fn many_to_many(
    catalog: &mut Catalog<'_>,
    repository: &RepositoryModel,
    entity: &EntityModel,
    entities: &EntitySet,
    relationship: &ManyToMany,
    sink: &DiagnosticSink
) {
    let collection = &relationship.property;
    let Some(target) = entities.get(&relationship.target_entity) else {
        return;
    };
    let Some(target_key) = key_type(target) else {
        return;
    };

    // The inverse side reads the owner's join-table declaration with the
    // column roles swapped.
    let (join_table, own_column, other_column) = match &relationship.mapped_by {
        None => (
            relationship.join_table.clone(),
            relationship.join_columns[0].clone(),
            relationship.inverse_join_columns[0].clone()
        ),
        Some(mapped_by) => {
            let owner = target.relationships.iter().find_map(|r| match r {
                Relationship::ManyToMany(m) if m.property == *mapped_by => Some(m),
                _ => None
            });
            match owner {
                Some(owner) => (
                    owner.join_table.clone(),
                    owner.inverse_join_columns[0].clone(),
                    owner.join_columns[0].clone()
                ),
                None => {
                    sink.push(Diagnostic::warning(
                        Code::MappedByMissing,
                        format!("{}.{collection}", entity.simple_name),
                        format!(
                            "mapped_by `{mapped_by}` names no many-to-many on `{}`; join-table methods dropped",
                            target.simple_name
                        )
                    ));
                    return;
                }
            }
        }
    };

    let key_ty = repository.key_type.clone();
    let target_word = target.simple_name.to_case(Case::Snake);
    let other_param = format!("{target_word}_id");
    let target_table = target.table.qualified();
    let target_pk = target.pk_column();
    let target_ty: syn::Type = {
        let ident = quote::format_ident!("{}", target.simple_name);
        syn::parse_quote!(#ident)
    };

    catalog.push(DerivedMethod {
        name:   format!("get_{collection}"),
        doc:    format!("The `{collection}` linked to one row."),
        params: vec![PlanParam::bound("id", key_ty.clone())],
        ret:    PlanReturn::TargetEntities(target_ty.clone()),
        body:   PlanBody::QueryTarget {
            sql: format!(
                "SELECT t.* FROM {target_table} t INNER JOIN {join_table} j \
                 ON j.{other_column} = t.{target_pk} WHERE j.{own_column} = @id \
                 ORDER BY t.{target_pk}"
            ),
            ty:  target_ty
        }
    });

    catalog.push(DerivedMethod {
        name:   format!("add_{collection}"),
        doc:    "Link one target through the join table.".to_owned(),
        params: vec![
            PlanParam::bound("id", key_ty.clone()),
            PlanParam::bound(&other_param, target_key.clone()),
        ],
        ret:    PlanReturn::Affected,
        body:   PlanBody::Execute {
            sql: format!(
                "INSERT INTO {join_table} ({own_column}, {other_column}) \
                 VALUES (@id, @{other_param})"
            )
        }
    });

    catalog.push(DerivedMethod {
        name:   format!("remove_{collection}"),
        doc:    "Unlink one target from the join table.".to_owned(),
        params: vec![
            PlanParam::bound("id", key_ty.clone()),
            PlanParam::bound(&other_param, target_key.clone()),
        ],
        ret:    PlanReturn::Affected,
        body:   PlanBody::Execute {
            sql: format!(
                "DELETE FROM {join_table} WHERE {own_column} = @id \
                 AND {other_column} = @{other_param}"
            )
        }
    });

    catalog.push(DerivedMethod {
        name:   format!("has_{collection}"),
        doc:    "Whether the link exists in the join table.".to_owned(),
        params: vec![
            PlanParam::bound("id", key_ty),
            PlanParam::bound(&other_param, target_key),
        ],
        ret:    PlanReturn::Bool,
        body:   PlanBody::Exists {
            sql: format!(
                "SELECT COUNT(1) FROM {join_table} WHERE {own_column} = @id \
                 AND {other_column} = @{other_param}"
            )
        }
    });
}

/// OR-pairs over the first two to-one relationships, and status filters.
///
/// Pair synthesis is capped at the first two owner-side relationships in
/// declaration order; wide entities otherwise explode combinatorially.
fn complex_filters(catalog: &mut Catalog<'_>, entity: &EntityModel, entities: &EntitySet) {
    let owners: Vec<&ManyToOne> = entity
        .relationships
        .iter()
        .filter_map(|r| match r {
            Relationship::ManyToOne(m) => Some(m),
            _ => None
        })
        .take(2)
        .collect();

    if let [a, b] = owners.as_slice() {
        let (Some(ta), Some(tb)) = (
            entities.get(&a.target_entity).and_then(key_type),
            entities.get(&b.target_entity).and_then(key_type)
        ) else {
            return;
        };
        let a_param = format!("{}_id", a.property);
        let b_param = format!("{}_id", b.property);
        catalog.push(DerivedMethod {
            name:   format!("find_by_{a_param}_or_{b_param}"),
            doc:    format!(
                "Rows owned by either `{}` or `{}`.",
                a.property, b.property
            ),
            params: vec![
                PlanParam::bound(&a_param, ta),
                PlanParam::bound(&b_param, tb),
            ],
            ret:    PlanReturn::Entities,
            body:   entity_finder(
                entity,
                format!(
                    "{} = @{a_param} OR {} = @{b_param}",
                    a.join_column, b.join_column
                ),
                false
            )
        });
    }

    if let Some(status) = entity.property("status") {
        for owner in &owners {
            let Some(target_key) = entities.get(&owner.target_entity).and_then(key_type) else {
                continue;
            };
            let id_param = format!("{}_id", owner.property);
            catalog.push(DerivedMethod {
                name:   format!("find_by_{id_param}_and_status"),
                doc:    format!("Rows of one `{}` in a given status.", owner.property),
                params: vec![
                    PlanParam::bound(&id_param, target_key),
                    PlanParam::bound("status", status.ty.clone()),
                ],
                ret:    PlanReturn::Entities,
                body:   entity_finder(
                    entity,
                    format!(
                        "{} = @{id_param} AND {} = @status",
                        owner.join_column, status.column.name
                    ),
                    false
                )
            });
        }
    }
}
