// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use pretty_assertions::assert_eq;

use super::*;

fn product_metadata() -> CpqlMetadata {
    CpqlMetadata::new(vec![CpqlEntity {
        name:       "Product".to_owned(),
        table:      "products".to_owned(),
        properties: vec![
            ("id".to_owned(), "id".to_owned()),
            ("price".to_owned(), "unit_price".to_owned()),
            ("category".to_owned(), "category_id".to_owned()),
        ]
    }])
}

fn student_metadata() -> CpqlMetadata {
    CpqlMetadata::new(vec![CpqlEntity {
        name:       "Student".to_owned(),
        table:      "students".to_owned(),
        properties: vec![
            ("id".to_owned(), "id".to_owned()),
            ("email".to_owned(), "email".to_owned()),
            ("first_name".to_owned(), "first_name".to_owned()),
            ("last_name".to_owned(), "last_name".to_owned()),
        ]
    }])
}

fn single_line(input: &str, metadata: Option<&CpqlMetadata>) -> String {
    translate(input, metadata, &CpqlOptions::default()).unwrap()
}

#[test]
fn plain_sql_passes_through_unchanged() {
    let inputs = [
        "SELECT * FROM users WHERE email = @email",
        "SELECT COUNT(*) FROM orders",
        "DELETE FROM logs WHERE created < GETDATE()",
        "SELECT  id,  name   FROM users",
    ];
    for input in inputs {
        assert_eq!(single_line(input, None), input);
        assert_eq!(single_line(input, Some(&product_metadata())), input);
    }
}

#[test]
fn params_translate_outside_literals() {
    let out = single_line("SELECT * FROM users WHERE email = :email AND note = ':keep'", None);
    assert_eq!(
        out,
        "SELECT * FROM users WHERE email = @email AND note = ':keep'"
    );
}

#[test]
fn aggregate_with_metadata() {
    // §8 scenario: AVG over a mapped column, alias dropped everywhere.
    let out = single_line(
        "SELECT AVG(p.price) FROM Product p WHERE p.category = :category",
        Some(&product_metadata())
    );
    assert_eq!(
        out,
        "SELECT AVG(unit_price) FROM products WHERE category_id = @category"
    );
}

#[test]
fn bare_alias_select_expands_to_aliased_columns() {
    // §8 scenario: never SELECT * — the session maps by property name.
    let out = single_line(
        "SELECT s FROM Student s WHERE s.email = :email",
        Some(&student_metadata())
    );
    assert_eq!(
        out,
        "SELECT s.id AS id, s.email AS email, s.first_name AS first_name, \
         s.last_name AS last_name FROM students s WHERE email = @email"
    );
}

#[test]
fn count_alias_becomes_count_star() {
    let out = single_line(
        "SELECT COUNT(p) FROM Product p WHERE p.price > :min",
        Some(&product_metadata())
    );
    assert_eq!(
        out,
        "SELECT COUNT(*) FROM products WHERE unit_price > @min"
    );
}

#[test]
fn without_metadata_aliases_strip_and_select_star() {
    let out = single_line("SELECT p FROM Product p WHERE p.Price > :min", None);
    assert_eq!(out, "SELECT * FROM Product WHERE Price > @min");
}

#[test]
fn property_casing_preserved_without_metadata() {
    let out = single_line("SELECT o FROM Order o WHERE o.OrderDate >= :start", None);
    assert!(out.contains("OrderDate"));
    assert!(!out.contains("o.OrderDate"));
}

#[test]
fn update_statement_rewrites_table_and_set_columns() {
    let out = single_line(
        "UPDATE Product p SET p.price = :price WHERE p.id = :id",
        Some(&product_metadata())
    );
    assert_eq!(out, "UPDATE products SET unit_price = @price WHERE id = @id");
}

#[test]
fn delete_statement_rewrites_table() {
    let out = single_line(
        "DELETE FROM Product p WHERE p.category = :category",
        Some(&product_metadata())
    );
    assert_eq!(out, "DELETE FROM products WHERE category_id = @category");
}

#[test]
fn multi_alias_join_keeps_qualifiers() {
    let metadata = CpqlMetadata::new(vec![
        CpqlEntity {
            name:       "Order".to_owned(),
            table:      "orders".to_owned(),
            properties: vec![
                ("id".to_owned(), "id".to_owned()),
                ("customer_id".to_owned(), "customer_id".to_owned()),
            ]
        },
        CpqlEntity {
            name:       "Customer".to_owned(),
            table:      "customers".to_owned(),
            properties: vec![
                ("id".to_owned(), "id".to_owned()),
                ("name".to_owned(), "name".to_owned()),
            ]
        },
    ]);
    let out = single_line(
        "SELECT o.id FROM Order o INNER JOIN Customer c ON o.customer_id = c.id WHERE c.name = :name",
        Some(&metadata)
    );
    assert_eq!(
        out,
        "SELECT o.id FROM orders o INNER JOIN customers c ON o.customer_id = c.id \
         WHERE c.name = @name"
    );
}

#[test]
fn pretty_printer_breaks_major_clauses() {
    let out = translate(
        "SELECT p FROM Product p WHERE p.price > :min AND p.category = :cat ORDER BY p.price",
        Some(&product_metadata()),
        &CpqlOptions {
            pretty: true
        }
    )
    .unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines.len() >= 4, "{out}");
    assert!(lines.iter().any(|l| l.starts_with("FROM")));
    assert!(lines.iter().any(|l| l.starts_with("WHERE")));
    assert!(lines.iter().any(|l| l.starts_with("AND")));
    assert!(lines.iter().any(|l| l.starts_with("ORDER")));
}

#[test]
fn unknown_property_is_left_verbatim() {
    let out = single_line(
        "SELECT p FROM Product p WHERE p.sku = :sku",
        Some(&product_metadata())
    );
    assert!(out.contains("sku = @sku"));
}

#[test]
fn empty_input_is_an_error() {
    assert!(translate("", None, &CpqlOptions::default()).is_err());
    assert!(translate("   ", None, &CpqlOptions::default()).is_err());
}

#[test]
fn unterminated_literal_is_an_error() {
    assert!(translate("SELECT * FROM t WHERE a = 'x", None, &CpqlOptions::default()).is_err());
}
