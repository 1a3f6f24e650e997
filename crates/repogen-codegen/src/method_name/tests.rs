// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use syn::parse_quote;

use super::*;
use crate::{diagnostics::DiagnosticSink, model::extract};

fn fixture() -> EntitySet {
    let sink = DiagnosticSink::new();
    let file: syn::File = parse_quote! {
        #[entity]
        pub struct Customer {
            #[id]
            pub id: i32,
            pub name: String,
            pub email: String,
            pub active: bool,
            #[one_to_many("customer")]
            pub orders: Vec<Order>,
        }

        #[entity]
        #[table("orders")]
        pub struct Order {
            #[id]
            pub id: i32,
            #[column("order_date")]
            pub order_date: DateTime<Utc>,
            pub total: f64,
            pub status: String,
            #[many_to_one]
            #[join_column("customer_id")]
            pub customer: Option<Customer>,
        }

        #[entity]
        pub struct OrderItem {
            #[id]
            pub id: i64,
            pub quantity: i32,
            #[many_to_one]
            #[join_column("order_id")]
            pub order: Option<Order>,
        }
    };
    let (entities, _) = extract(&file.items, "", &sink);
    assert!(sink.is_empty(), "{:?}", sink.to_vec());
    entities
}

fn order(entities: &EntitySet) -> &EntityModel {
    entities.get("Order").unwrap()
}

#[test]
fn simple_equality() {
    let entities = fixture();
    let customer = entities.get("Customer").unwrap();
    let intent = parse("find_by_email", customer, &entities).unwrap();
    assert_eq!(intent.verb, Verb::Select);
    assert_eq!(intent.terms.len(), 1);
    let term = &intent.terms[0];
    assert_eq!(term.op, Operator::Eq);
    assert_eq!(term.path.column, "email");
    assert!(term.path.hops.is_empty());
}

#[test]
fn async_suffix_is_stripped() {
    let entities = fixture();
    let customer = entities.get("Customer").unwrap();
    let intent = parse("find_by_email_async", customer, &entities).unwrap();
    assert_eq!(intent.terms[0].path.column, "email");
}

#[test]
fn longest_property_match_wins() {
    let entities = fixture();
    // `order_date` must bind as one property, not as navigation `order`
    // followed by a dangling segment.
    let intent = parse("find_by_order_date_between", order(&entities), &entities).unwrap();
    let term = &intent.terms[0];
    assert_eq!(term.op, Operator::Between);
    assert_eq!(term.path.column, "order_date");
    assert!(term.path.hops.is_empty());
}

#[test]
fn is_prefix_is_an_operator_modifier() {
    let entities = fixture();
    let a = parse("find_by_total_is_greater_than", order(&entities), &entities).unwrap();
    let b = parse("find_by_total_greater_than", order(&entities), &entities).unwrap();
    assert_eq!(a.terms[0].op, Operator::Gt);
    assert_eq!(a.terms[0].op, b.terms[0].op);
}

#[test]
fn bare_is_suffix_means_equality() {
    let entities = fixture();
    let intent = parse("find_by_status_is", order(&entities), &entities).unwrap();
    assert_eq!(intent.terms[0].op, Operator::Eq);
}

#[test]
fn numberless_first_means_one() {
    let entities = fixture();
    let intent = parse("find_first_by_status", order(&entities), &entities).unwrap();
    assert_eq!(intent.limit, Some(1));
}

#[test]
fn top_with_attached_and_detached_numbers() {
    let entities = fixture();
    let attached = parse("find_top5_by_status", order(&entities), &entities).unwrap();
    assert_eq!(attached.limit, Some(5));
    let detached = parse("find_top_10_by_status", order(&entities), &entities).unwrap();
    assert_eq!(detached.limit, Some(10));
}

#[test]
fn distinct_flag() {
    let entities = fixture();
    let intent = parse("find_distinct_by_status", order(&entities), &entities).unwrap();
    assert!(intent.distinct);
}

#[test]
fn and_or_bind_left_to_right() {
    let entities = fixture();
    let intent = parse(
        "find_by_status_or_total_greater_than_and_order_date_is_not_null",
        order(&entities),
        &entities
    )
    .unwrap();
    assert_eq!(intent.terms.len(), 3);
    assert_eq!(intent.terms[1].connector, Connector::Or);
    assert_eq!(intent.terms[1].op, Operator::Gt);
    assert_eq!(intent.terms[2].connector, Connector::And);
    assert_eq!(intent.terms[2].op, Operator::IsNotNull);
}

#[test]
fn foreign_key_shortcut_has_no_joins() {
    let entities = fixture();
    let intent = parse("find_by_customer_id", order(&entities), &entities).unwrap();
    let term = &intent.terms[0];
    assert_eq!(term.path.column, "customer_id");
    assert!(term.path.hops.is_empty());
    assert_eq!(term.path.properties, vec!["customer", "id"]);
}

#[test]
fn multi_level_path_resolves_through_intermediate_entities() {
    let entities = fixture();
    let item = entities.get("OrderItem").unwrap();
    let intent = parse("find_by_order_customer_name", item, &entities).unwrap();
    let term = &intent.terms[0];
    assert_eq!(term.path.hops.len(), 2);
    assert_eq!(term.path.hops[0].target_entity, "Order");
    assert_eq!(term.path.hops[1].target_entity, "Customer");
    assert_eq!(term.path.column, "name");
    // The second hop uses Order's relationship definition.
    let HopKind::ToOne { fk_column } = &term.path.hops[1].kind else {
        panic!("expected to-one hop");
    };
    assert_eq!(fk_column, "customer_id");
}

#[test]
fn sort_keys_parse_with_then_separator() {
    let entities = fixture();
    let intent = parse(
        "find_by_status_order_by_order_date_desc_then_total_asc",
        order(&entities),
        &entities
    )
    .unwrap();
    assert_eq!(intent.sort.len(), 2);
    assert_eq!(intent.sort[0].order, SortOrder::Desc);
    assert_eq!(intent.sort[0].path.column, "order_date");
    assert_eq!(intent.sort[1].order, SortOrder::Asc);
}

#[test]
fn ignore_case_after_operator() {
    let entities = fixture();
    let intent = parse(
        "find_by_status_containing_ignore_case",
        order(&entities),
        &entities
    )
    .unwrap();
    assert_eq!(intent.terms[0].op, Operator::Containing);
    assert!(intent.terms[0].ignore_case);
}

#[test]
fn boolean_literal_operators() {
    let entities = fixture();
    let customer = entities.get("Customer").unwrap();
    let intent = parse("find_by_active_true", customer, &entities).unwrap();
    assert_eq!(intent.terms[0].op, Operator::True);
    assert_eq!(intent.terms[0].op.param_count(), 0);
}

#[test]
fn count_exists_delete_verbs() {
    let entities = fixture();
    assert_eq!(
        parse("count_by_status", order(&entities), &entities).unwrap().verb,
        Verb::Count
    );
    assert_eq!(
        parse("exists_by_status", order(&entities), &entities).unwrap().verb,
        Verb::Exists
    );
    assert_eq!(
        parse("delete_by_status", order(&entities), &entities).unwrap().verb,
        Verb::Delete
    );
    assert_eq!(
        parse("remove_by_status", order(&entities), &entities).unwrap().verb,
        Verb::Delete
    );
}

#[test]
fn unknown_property_is_reported() {
    let entities = fixture();
    let err = parse("find_by_ghost", order(&entities), &entities).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnknownProperty);
}

#[test]
fn operator_type_mismatch_is_reported() {
    let entities = fixture();
    let err = parse("find_by_status_greater_than", order(&entities), &entities).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::OperatorType);
}

#[test]
fn trailing_garbage_is_reported() {
    let entities = fixture();
    let err = parse("find_by_status_wobbles", order(&entities), &entities).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Trailing);
}

#[test]
fn unknown_verb_is_reported() {
    let entities = fixture();
    let err = parse("fetch_by_status", order(&entities), &entities).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnknownVerb);
}

#[test]
fn parse_of_emitted_name_round_trips() {
    let entities = fixture();
    let names = [
        "find_by_email",
        "find_by_status_and_total_greater_than",
        "find_distinct_by_status_order_by_order_date_desc",
        "find_first_by_status",
        "count_by_customer_id",
        "find_by_status_containing_ignore_case",
        "exists_by_email_is_null",
    ];
    for name in names {
        let entity = if name.contains("email") && !name.contains("customer") {
            entities.get("Customer").unwrap()
        } else {
            order(&entities)
        };
        let intent = parse(name, entity, &entities).unwrap();
        let reparsed = parse(&intent.method_name(), entity, &entities).unwrap();
        assert_eq!(intent, reparsed, "round-trip failed for `{name}`");
    }
}
