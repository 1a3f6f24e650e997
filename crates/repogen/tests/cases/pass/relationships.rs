// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! A bidirectional pair: derived finders, aggregates, rollups, helpers.

use repogen::prelude::*;

#[persistence_unit]
mod domain {
    use repogen::prelude::*;

    #[entity]
    #[derive(Debug, Clone)]
    pub struct Customer {
        #[id]
        pub id: i32,
        pub name: String,
        #[one_to_many("customer")]
        pub orders: Vec<Order>,
    }

    #[entity]
    #[table("orders")]
    #[derive(Debug, Clone)]
    pub struct Order {
        #[id]
        pub id: i32,
        pub total: f64,
        pub status: String,
        #[many_to_one]
        #[join_column("customer_id")]
        pub customer: Option<Customer>,
        pub customer_id: i32,
    }

    #[repository]
    pub trait OrderRepository: CrudRepository<Order, i32> {
        async fn find_by_status(&self, status: String) -> RepoResult<Vec<Order>>;
    }

    #[repository]
    pub trait CustomerRepository: CrudRepository<Customer, i32> {
        async fn find_by_name_containing(&self, name: String) -> RepoResult<Vec<Customer>>;
    }
}

fn _exercise_helpers() {
    let mut customer = domain::Customer {
        id: 1,
        name: "Ada".to_owned(),
        orders: Vec::new(),
    };
    let mut order = domain::Order {
        id: 7,
        total: 19.5,
        status: "open".to_owned(),
        customer: None,
        customer_id: 0,
    };

    domain::customer_relationships::add_to_orders(&mut customer, &mut order);
    assert_eq!(order.customer_id, 1);
    assert_eq!(customer.orders.len(), 1);
    domain::order_relationships::validate_relationship_consistency(&order).unwrap();
    domain::customer_relationships::remove_from_orders(&mut customer, &mut order);
    assert!(customer.orders.is_empty());
    assert!(order.customer.is_none());
}

fn _assert_surfaces<S: repogen_core::SqlSession>() {
    fn order_ext<T: domain::OrderRepositoryExt>() {}
    fn customer_ext<T: domain::CustomerRepositoryExt>() {}
    order_ext::<domain::OrderRepositoryImpl<S>>();
    customer_ext::<domain::CustomerRepositoryImpl<S>>();
}

fn main() {
    _exercise_helpers();
}
