// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Attribute-driven methods: CPQL, native SQL, stored procedures, bulk
//! operations, and a multi-mapping record.

use repogen::prelude::*;

#[persistence_unit]
mod domain {
    use repogen::prelude::*;

    #[entity]
    #[derive(Debug, Clone, PartialEq)]
    pub struct Customer {
        #[id]
        pub id: i32,
        pub name: String,
    }

    #[entity]
    #[table("orders")]
    #[derive(Debug, Clone, PartialEq)]
    pub struct Order {
        #[id]
        pub id: i32,
        pub total: f64,
        #[many_to_one]
        #[join_column("customer_id")]
        pub customer: Option<Customer>,
        pub customer_id: i32,
    }

    #[repository]
    pub trait OrderRepository: CrudRepository<Order, i32> {
        #[query("SELECT o FROM Order o WHERE o.total > :floor")]
        async fn above(&self, floor: f64) -> RepoResult<Vec<Order>>;

        #[query("SELECT COUNT(*) FROM orders", native = true)]
        async fn raw_count(&self) -> RepoResult<i64>;

        #[query("SELECT o FROM Order o INNER JOIN Customer c ON o.customer_id = c.id")]
        #[multi_mapping("id", split_on = "id", map_types = "Order, Customer")]
        async fn with_customers(&self) -> RepoResult<Vec<OrderWithCustomer>>;

        #[stored_procedure("ArchiveOrders", schema = "ops")]
        async fn archive(&self, cutoff: i32) -> RepoResult<u64>;

        #[bulk_operation(batch_size = 50)]
        async fn import(&self, items: Vec<Order>) -> RepoResult<u64>;
    }
}

fn _assert_record_shape(record: domain::OrderWithCustomer) -> (domain::Order, domain::Customer) {
    (record.order, record.customer)
}

fn _assert_surfaces<S: repogen_core::SqlSession>() {
    fn repo<T: domain::OrderRepository>() {}
    repo::<domain::OrderRepositoryImpl<S>>();
}

fn main() {}
