// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Intent lowering.
//!
//! Turns a parsed [`Intent`] into one SQL statement: join chains from the
//! resolved paths, a WHERE clause from the predicate terms, ORDER BY from
//! the sort keys, and the statement head from the verb. Placeholder names
//! come from the declared method parameters, in order — SQL references
//! columns, placeholders reference parameters, and the two never mix.

use crate::{
    method_name::{HopKind, Intent, PathHop, Verb},
    model::EntityModel,
    sql
};

/// Lowering failure; the method resolution diagnostic's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerError {
    /// One-line explanation.
    pub message: String
}

impl LowerError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into()
        }
    }
}

/// Join chains discovered while lowering, in first-use order.
#[derive(Default)]
struct JoinTable {
    chains: Vec<(Vec<String>, String)>,
    joins:  Vec<sql::Join>
}

impl JoinTable {
    fn alias_of(&self, chain: &[String]) -> Option<&str> {
        self.chains
            .iter()
            .find(|(c, _)| c == chain)
            .map(|(_, a)| a.as_str())
    }

    /// Ensure every prefix of `hops` has a join, returning the final alias.
    fn ensure(&mut self, hops: &[PathHop]) -> String {
        let mut chain: Vec<String> = Vec::new();
        let mut previous_alias = "e".to_owned();
        for hop in hops {
            chain.push(hop.navigation.clone());
            if let Some(alias) = self.alias_of(&chain) {
                previous_alias = alias.to_owned();
                continue;
            }
            let alias = if self.chains.is_empty() {
                "r".to_owned()
            } else {
                format!("r{}", self.chains.len() + 1)
            };
            let on = match &hop.kind {
                HopKind::ToOne { fk_column } => format!(
                    "{previous_alias}.{fk_column} = {alias}.{}",
                    hop.target_pk_column
                ),
                HopKind::ToMany { child_fk_column } => format!(
                    "{alias}.{child_fk_column} = {previous_alias}.{}",
                    hop.source_pk_column
                )
            };
            self.joins.push(sql::Join {
                kind: sql::JoinKind::Inner,
                table: hop.target_table.clone(),
                alias: alias.clone(),
                on
            });
            self.chains.push((chain.clone(), alias.clone()));
            previous_alias = alias;
        }
        previous_alias
    }
}

/// Lower an intent to SQL, drawing placeholder names from `param_names`.
///
/// # Errors
///
/// Parameter-count mismatches and unsupported verb/join combinations.
pub fn lower_intent(
    intent: &Intent,
    entity: &EntityModel,
    param_names: &[String]
) -> Result<String, LowerError> {
    let mut joins = JoinTable::default();

    // First pass assigns aliases in term order so output is deterministic.
    let mut term_aliases: Vec<String> = Vec::new();
    for term in &intent.terms {
        term_aliases.push(joins.ensure(&term.path.hops));
    }
    let mut sort_aliases: Vec<String> = Vec::new();
    for key in &intent.sort {
        sort_aliases.push(joins.ensure(&key.path.hops));
    }

    let joined = !joins.joins.is_empty();
    let column_expr = |alias: &str, hops: &[PathHop], column: &str| -> String {
        if hops.is_empty() {
            if joined {
                format!("e.{column}")
            } else {
                column.to_owned()
            }
        } else {
            format!("{alias}.{column}")
        }
    };

    let mut where_sql = String::new();
    let mut next_param = 0;
    for (term, alias) in intent.terms.iter().zip(&term_aliases) {
        let needed = term.op.param_count();
        if next_param + needed > param_names.len() {
            return Err(LowerError::new(format!(
                "operator `{}` needs {} parameter(s) but the method declares only {}",
                term.op.canonical(),
                needed,
                param_names.len()
            )));
        }
        let names: Vec<&str> = param_names[next_param..next_param + needed]
            .iter()
            .map(String::as_str)
            .collect();
        next_param += needed;

        if !where_sql.is_empty() {
            where_sql.push_str(match term.connector {
                crate::method_name::Connector::And => " AND ",
                crate::method_name::Connector::Or => " OR "
            });
        }
        let column = column_expr(alias, &term.path.hops, &term.path.column);
        where_sql.push_str(&sql::comparison(&column, term.op, &names, term.ignore_case));
    }
    if next_param < param_names.len() {
        return Err(LowerError::new(format!(
            "method declares {} parameter(s) but the name consumes {}",
            param_names.len(),
            next_param
        )));
    }

    let order_by = if intent.sort.is_empty() {
        // OFFSET/FETCH needs a stable order; limited queries sort by key.
        intent.limit.map(|_| {
            column_expr("e", &[], entity.pk_column())
        })
    } else {
        Some(
            intent
                .sort
                .iter()
                .zip(&sort_aliases)
                .map(|(key, alias)| {
                    let column = column_expr(alias, &key.path.hops, &key.path.column);
                    match key.order {
                        crate::method_name::SortOrder::Asc => format!("{column} ASC"),
                        crate::method_name::SortOrder::Desc => format!("{column} DESC")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ")
        )
    };

    let table = entity.table.qualified();
    let where_opt = (!where_sql.is_empty()).then_some(where_sql);
    match intent.verb {
        Verb::Select => Ok(sql::select(&sql::SelectSpec {
            columns: if joined { "e.*".to_owned() } else { "*".to_owned() },
            table,
            alias: joined.then(|| "e".to_owned()),
            joins: joins.joins,
            where_sql: where_opt,
            order_by,
            top: intent.limit,
            distinct: intent.distinct,
            ..sql::SelectSpec::default()
        })),
        Verb::Count => Ok(sql::select(&sql::SelectSpec {
            columns: "COUNT(*)".to_owned(),
            table,
            alias: joined.then(|| "e".to_owned()),
            joins: joins.joins,
            where_sql: where_opt,
            ..sql::SelectSpec::default()
        })),
        Verb::Exists => Ok(sql::select(&sql::SelectSpec {
            columns: "COUNT(1)".to_owned(),
            table,
            alias: joined.then(|| "e".to_owned()),
            joins: joins.joins,
            where_sql: where_opt,
            ..sql::SelectSpec::default()
        })),
        Verb::Delete => {
            if joined {
                return Err(LowerError::new(
                    "delete methods cannot navigate relationships"
                ));
            }
            Ok(sql::delete(&entity.table.qualified(), where_opt.as_deref()))
        }
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;
    use crate::{
        diagnostics::DiagnosticSink,
        method_name,
        model::{EntitySet, extract}
    };

    fn fixture() -> EntitySet {
        let sink = DiagnosticSink::new();
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct Customer {
                #[id]
                pub id: i32,
                pub name: String,
            }

            #[entity]
            #[table("orders")]
            pub struct Order {
                #[id]
                pub id: i32,
                pub total: f64,
                pub status: String,
                #[many_to_one]
                #[join_column("customer_id")]
                pub customer: Option<Customer>,
            }
        };
        let (entities, _) = extract(&file.items, "", &sink);
        entities
    }

    fn lower(name: &str, params: &[&str]) -> Result<String, LowerError> {
        let entities = fixture();
        let entity = entities.get("Order").unwrap();
        let intent = method_name::parse(name, entity, &entities).unwrap();
        let names: Vec<String> = params.iter().map(|p| (*p).to_owned()).collect();
        lower_intent(&intent, entity, &names)
    }

    #[test]
    fn flat_equality_without_order_by() {
        let sql = lower("find_by_status", &["status"]).unwrap();
        assert_eq!(sql, "SELECT * FROM orders WHERE status = @status");
    }

    #[test]
    fn fk_shortcut_filters_owner_column() {
        let sql = lower("find_by_customer_id", &["customer_id"]).unwrap();
        assert_eq!(sql, "SELECT * FROM orders WHERE customer_id = @customer_id");
    }

    #[test]
    fn join_path_aliases_root_and_target() {
        let sql = lower("find_by_customer_name", &["name"]).unwrap();
        assert_eq!(
            sql,
            "SELECT e.* FROM orders e INNER JOIN customers r ON e.customer_id = r.id \
             WHERE r.name = @name"
        );
    }

    #[test]
    fn placeholders_use_parameter_names_not_columns() {
        let sql = lower("find_by_status", &["current"]).unwrap();
        assert_eq!(sql, "SELECT * FROM orders WHERE status = @current");
    }

    #[test]
    fn count_and_delete_heads() {
        assert_eq!(
            lower("count_by_status", &["status"]).unwrap(),
            "SELECT COUNT(*) FROM orders WHERE status = @status"
        );
        assert_eq!(
            lower("delete_by_status", &["status"]).unwrap(),
            "DELETE FROM orders WHERE status = @status"
        );
    }

    #[test]
    fn limit_adds_key_order() {
        let sql = lower("find_top5_by_status", &["status"]).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM orders WHERE status = @status ORDER BY id \
             OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn parameter_count_mismatch() {
        assert!(lower("find_by_total_between", &["min"]).is_err());
        assert!(lower("find_by_status", &["status", "extra"]).is_err());
    }

    #[test]
    fn sorted_query_orders_by_resolved_columns() {
        let sql = lower("find_by_status_order_by_total_desc", &["status"]).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM orders WHERE status = @status ORDER BY total DESC"
        );
    }
}
