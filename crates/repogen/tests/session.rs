// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Generated repositories driven against a recording session double.

use std::sync::{Mutex, PoisonError};

use domain::{OrderRepositoryExt, UserRepository};
use repogen::prelude::*;

#[persistence_unit]
mod domain {
    use repogen::prelude::*;

    #[entity]
    #[derive(Debug, Clone)]
    pub struct User {
        #[id]
        pub id: i64,
        #[column("email")]
        pub email: String,
        pub active: bool,
    }

    #[repository]
    pub trait UserRepository: CrudRepository<User, i64> {
        async fn find_by_email(&self, email: String) -> RepoResult<Option<User>>;
        async fn count_by_active_true(&self) -> RepoResult<i64>;
    }

    #[entity]
    #[derive(Debug, Clone)]
    pub struct Customer {
        #[id]
        pub id: i32,
        pub name: String,
    }

    #[entity]
    #[derive(Debug, Clone)]
    pub struct Order {
        #[id]
        pub id: i32,
        pub total: f64,
        #[many_to_one]
        #[join_column("customer_id")]
        pub customer: Option<Customer>,
    }

    #[repository]
    pub trait OrderRepository: CrudRepository<Order, i32> {}
}

/// Records every statement and answers with canned values.
#[derive(Default)]
struct RecordingSession {
    log:    Mutex<Vec<(String, Vec<String>)>>,
    scalar: Mutex<Option<SqlValue>>
}

impl RecordingSession {
    fn record(&self, sql: &str, params: &[SqlParam]) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((
                sql.to_owned(),
                params.iter().map(|p| p.name.to_owned()).collect()
            ));
    }

    fn take_log(&self) -> Vec<(String, Vec<String>)> {
        std::mem::take(&mut self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn set_scalar(&self, value: SqlValue) {
        *self.scalar.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }
}

struct NoopTransaction;

#[async_trait]
impl SqlTransaction for NoopTransaction {
    async fn commit(self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn rollback(self) -> Result<(), SessionError> {
        Ok(())
    }
}

#[async_trait]
impl SqlSession for RecordingSession {
    type Transaction = NoopTransaction;

    async fn query<T>(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<T>, SessionError>
    where
        T: FromSqlRow + Send
    {
        self.record(sql, params);
        Ok(Vec::new())
    }

    async fn query_single<T>(
        &self,
        sql: &str,
        params: &[SqlParam]
    ) -> Result<Option<T>, SessionError>
    where
        T: FromSqlRow + Send
    {
        self.record(sql, params);
        Ok(None)
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, SessionError> {
        self.record(sql, params);
        Ok(1)
    }

    async fn execute_scalar<T>(&self, sql: &str, params: &[SqlParam]) -> Result<T, SessionError>
    where
        T: FromSqlValue + Send
    {
        self.record(sql, params);
        let value = self
            .scalar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or(SqlValue::I64(0));
        T::from_sql(&value).ok_or_else(|| SessionError::backend("unexpected scalar kind"))
    }

    async fn open_transaction(&self) -> Result<Self::Transaction, SessionError> {
        Ok(NoopTransaction)
    }
}

#[tokio::test]
async fn finder_runs_a_single_row_query_with_named_parameters() {
    let repo = domain::UserRepositoryImpl::new(RecordingSession::default());
    let found = repo.find_by_email("ada@example.com".to_owned()).await.unwrap();
    assert!(found.is_none());

    let log = repo.session().take_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, "SELECT * FROM users WHERE email = @email");
    assert_eq!(log[0].1, vec!["email".to_owned()]);
}

#[tokio::test]
async fn count_method_reads_a_scalar() {
    let repo = domain::UserRepositoryImpl::new(RecordingSession::default());
    repo.session().set_scalar(SqlValue::I64(3));
    let count = repo.count_by_active_true().await.unwrap();
    assert_eq!(count, 3);

    let log = repo.session().take_log();
    assert_eq!(log[0].0, "SELECT COUNT(*) FROM users WHERE active = 1");
    assert!(log[0].1.is_empty());
}

#[tokio::test]
async fn sorted_overload_resolves_order_by_through_metadata() {
    let repo = domain::OrderRepositoryImpl::new(RecordingSession::default());
    repo.find_by_customer_id_sorted(1, 0, 10, Some("total".to_owned()), false)
        .await
        .unwrap();
    repo.find_by_customer_id_sorted(1, 0, 10, Some("'; DROP TABLE orders; --".to_owned()), true)
        .await
        .unwrap();

    let log = repo.session().take_log();
    assert_eq!(
        log[0].0,
        "SELECT * FROM orders WHERE customer_id = @customer_id ORDER BY total DESC \
         OFFSET @skip ROWS FETCH NEXT @take ROWS ONLY"
    );
    // An unknown property never reaches the SQL; the key column sorts.
    assert_eq!(
        log[1].0,
        "SELECT * FROM orders WHERE customer_id = @customer_id ORDER BY id ASC \
         OFFSET @skip ROWS FETCH NEXT @take ROWS ONLY"
    );
    assert_eq!(
        log[0].1,
        vec!["customer_id".to_owned(), "skip".to_owned(), "take".to_owned()]
    );
}

#[test]
fn metadata_provider_answers_entity_queries() {
    use std::any::TypeId;

    let provider = domain::GeneratedMetadataProvider;
    assert!(provider.is_entity(TypeId::of::<domain::User>()));
    assert!(provider.is_entity(TypeId::of::<domain::Order>()));
    assert!(!provider.is_entity(TypeId::of::<String>()));

    let user = provider.get::<domain::User>().unwrap();
    assert_eq!(user.table_name, "users");
    assert_eq!(user.order_column("email"), "email");
    assert_eq!(user.order_column("'; DROP TABLE users; --"), "id");
}

#[tokio::test]
async fn base_crud_surface_is_generated() {
    let repo = domain::UserRepositoryImpl::new(RecordingSession::default());

    let exists = repo.exists_by_id(7).await.unwrap();
    assert!(!exists);

    let all = repo.find_all().await.unwrap();
    assert!(all.is_empty());

    let affected = repo
        .update(domain::User {
            id:     7,
            email:  "ada@example.com".to_owned(),
            active: true
        })
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let log = repo.session().take_log();
    assert_eq!(log[0].0, "SELECT COUNT(1) FROM users WHERE id = @id");
    assert_eq!(log[1].0, "SELECT * FROM users ORDER BY id");
    assert_eq!(
        log[2].0,
        "UPDATE users SET email = @email, active = @active WHERE id = @id"
    );
    assert_eq!(log[2].1, vec!["email".to_owned(), "active".to_owned(), "id".to_owned()]);
}
