// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Database session facade.
//!
//! Generated repository implementations never talk to a driver directly.
//! They call the five operations of [`SqlSession`] with SQL text carrying
//! named `@param` placeholders and a slice of [`SqlParam`] values. Concrete
//! sessions (a connection pool adapter, a test double) implement the trait
//! and take care of placeholder binding and row materialization.
//!
//! # Parameter convention
//!
//! Placeholders in SQL are `@name`; each [`SqlParam`] pairs that name with a
//! [`SqlValue`]. List values expand to `IN` argument lists by the driver.
//!
//! # Row mapping
//!
//! Rows come back as [`SqlRow`] — column values keyed by **property name**
//! (generated SELECT lists alias every column accordingly). Entities convert
//! via [`FromSqlRow`], which repogen emits alongside the metadata provider.

use async_trait::async_trait;
use thiserror::Error;

/// Result alias used by generated repository methods.
pub type RepoResult<T> = Result<T, SessionError>;

/// Errors surfaced by [`SqlSession`] operations and generated code.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The driver reported a failure executing a statement.
    #[error("database error: {0}")]
    Backend(String),

    /// A row did not contain the requested column.
    #[error("missing column `{name}` in result row")]
    MissingColumn {
        /// Property name the row was probed with.
        name: String
    },

    /// A column value could not convert to the requested Rust type.
    #[error("column `{column}` cannot convert to {expected}")]
    TypeMismatch {
        /// Property name of the offending column.
        column:   String,
        /// Rust type the caller requested.
        expected: &'static str
    },

    /// A `#[query]` method whose query string failed translation at
    /// generation time. The generated body returns this error at call site.
    #[error("query could not be translated: {0}")]
    QueryTranslation(String)
}

impl SessionError {
    /// Shortcut for driver-reported failures.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// A database value crossing the session boundary.
///
/// The variant set covers the property types the generator recognises.
/// Temporal and UUID variants are feature-gated the same way the optional
/// dependencies are.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 16-bit integer.
    I16(i16),
    /// 32-bit integer.
    I32(i32),
    /// 64-bit integer.
    I64(i64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Argument list, expanded by the driver for `IN @list` placeholders.
    List(Vec<SqlValue>),
    /// Timestamp with time zone.
    #[cfg(feature = "chrono")]
    DateTime(chrono::DateTime<chrono::Utc>),
    /// Calendar date.
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    /// UUID.
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid)
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Text,
}

impl From<&[u8]> for SqlValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::DateTime<chrono::Utc>> for SqlValue {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self::DateTime(value)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDate> for SqlValue {
    fn from(value: chrono::NaiveDate) -> Self {
        Self::Date(value)
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for SqlValue {
    fn from(value: uuid::Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Self::Null
        }
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// A named parameter for a session operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    /// Placeholder name without the `@` sigil.
    pub name:  &'static str,
    /// Bound value.
    pub value: SqlValue
}

impl SqlParam {
    /// Pair a placeholder name with a value.
    pub fn new(name: &'static str, value: impl Into<SqlValue>) -> Self {
        Self {
            name,
            value: value.into()
        }
    }
}

/// Conversion from a single [`SqlValue`].
///
/// Implementations return `None` on a variant mismatch; [`SqlRow::get`]
/// turns that into [`SessionError::TypeMismatch`] with column context.
pub trait FromSqlValue: Sized {
    /// Try to read `value` as `Self`.
    fn from_sql(value: &SqlValue) -> Option<Self>;
}

impl FromSqlValue for bool {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bool(v) => Some(*v),
            SqlValue::I16(v) => Some(*v != 0),
            SqlValue::I32(v) => Some(*v != 0),
            SqlValue::I64(v) => Some(*v != 0),
            _ => None
        }
    }
}

impl FromSqlValue for i16 {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::I16(v) => Some(*v),
            _ => None
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::I16(v) => Some(i32::from(*v)),
            SqlValue::I32(v) => Some(*v),
            _ => None
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::I16(v) => Some(i64::from(*v)),
            SqlValue::I32(v) => Some(i64::from(*v)),
            SqlValue::I64(v) => Some(*v),
            _ => None
        }
    }
}

impl FromSqlValue for f32 {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::F32(v) => Some(*v),
            _ => None
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::F32(v) => Some(f64::from(*v)),
            SqlValue::F64(v) => Some(*v),
            SqlValue::I16(v) => Some(f64::from(*v)),
            SqlValue::I32(v) => Some(f64::from(*v)),
            _ => None
        }
    }
}

impl FromSqlValue for String {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Text(v) => Some(v.clone()),
            _ => None
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSqlValue for chrono::DateTime<chrono::Utc> {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::DateTime(v) => Some(*v),
            _ => None
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSqlValue for chrono::NaiveDate {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Date(v) => Some(*v),
            _ => None
        }
    }
}

#[cfg(feature = "uuid")]
impl FromSqlValue for uuid::Uuid {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Uuid(v) => Some(*v),
            _ => None
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Null => Some(None),
            other => T::from_sql(other).map(Some)
        }
    }
}

/// One result row, column values keyed by property name.
///
/// Generated SELECT statements alias every column to its property name, so
/// lookup is case-sensitive on property names and independent of the
/// database's column naming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>
}

impl SqlRow {
    /// Build a row from `(property name, value)` pairs.
    pub fn from_pairs(columns: Vec<(String, SqlValue)>) -> Self {
        Self {
            columns
        }
    }

    /// Raw value lookup.
    pub fn value(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Typed value lookup.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingColumn`] when the row has no such property;
    /// [`SessionError::TypeMismatch`] when the value does not convert.
    pub fn get<T: FromSqlValue>(&self, name: &str) -> Result<T, SessionError> {
        let value = self.value(name).ok_or_else(|| SessionError::MissingColumn {
            name: name.to_owned()
        })?;
        T::from_sql(value).ok_or_else(|| SessionError::TypeMismatch {
            column:   name.to_owned(),
            expected: std::any::type_name::<T>()
        })
    }
}

/// Conversion from a full [`SqlRow`].
///
/// repogen emits an implementation per entity next to the metadata
/// provider; scalar results (counts, aggregates) use the blanket
/// single-column path of the session instead.
pub trait FromSqlRow: Sized {
    /// Materialize `Self` from a row.
    ///
    /// # Errors
    ///
    /// Propagates the row's [`SessionError`] on missing or mistyped columns.
    fn from_row(row: &SqlRow) -> Result<Self, SessionError>;
}

/// One `(key, value)` row of a GROUP BY rollup.
///
/// Generated rollup statements alias their columns `key` and `value`;
/// repositories collect these rows into a `HashMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow<K, V> {
    /// Grouping key, usually the parent primary key.
    pub key:   K,
    /// Aggregated value.
    pub value: V
}

impl<K: FromSqlValue, V: FromSqlValue> FromSqlRow for GroupRow<K, V> {
    fn from_row(row: &SqlRow) -> Result<Self, SessionError> {
        Ok(Self {
            key:   row.get("key")?,
            value: row.get("value")?
        })
    }
}

/// An open transaction scope.
///
/// Implementations must release the underlying resources on **every** exit
/// path: an unconsumed handle rolls back on drop.
#[async_trait]
pub trait SqlTransaction: Send {
    /// Commit the transaction.
    async fn commit(self) -> Result<(), SessionError>;

    /// Roll the transaction back explicitly.
    async fn rollback(self) -> Result<(), SessionError>;
}

/// The database-access facade called by generated repositories.
///
/// Five operations, mirrored one-to-one in emitted bodies:
///
/// | Operation | Emitted for |
/// |-----------|-------------|
/// | [`query`](Self::query) | Multi-row SELECT |
/// | [`query_single`](Self::query_single) | Single-row SELECT |
/// | [`execute`](Self::execute) | INSERT / UPDATE / DELETE |
/// | [`execute_scalar`](Self::execute_scalar) | COUNT / EXISTS / aggregates |
/// | [`open_transaction`](Self::open_transaction) | Bulk operations |
#[async_trait]
pub trait SqlSession: Send + Sync {
    /// Transaction handle type.
    type Transaction: SqlTransaction;

    /// Run a query returning any number of rows.
    async fn query<T>(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<T>, SessionError>
    where
        T: FromSqlRow + Send;

    /// Run a query returning at most one row.
    async fn query_single<T>(
        &self,
        sql: &str,
        params: &[SqlParam]
    ) -> Result<Option<T>, SessionError>
    where
        T: FromSqlRow + Send;

    /// Run a statement, returning the affected row count.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, SessionError>;

    /// Run a query returning a single scalar value.
    async fn execute_scalar<T>(&self, sql: &str, params: &[SqlParam]) -> Result<T, SessionError>
    where
        T: FromSqlValue + Send;

    /// Open a transaction scope with guaranteed release on all exit paths.
    async fn open_transaction(&self) -> Result<Self::Transaction, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_from_option() {
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(7)), SqlValue::I32(7));
    }

    #[test]
    fn value_from_vec_becomes_list() {
        let value = SqlValue::from(vec![1_i64, 2, 3]);
        assert_eq!(
            value,
            SqlValue::List(vec![SqlValue::I64(1), SqlValue::I64(2), SqlValue::I64(3)])
        );
    }

    #[test]
    fn row_get_typed() {
        let row = SqlRow::from_pairs(vec![
            ("id".to_owned(), SqlValue::I64(42)),
            ("email".to_owned(), SqlValue::Text("a@b.c".to_owned())),
        ]);
        assert_eq!(row.get::<i64>("id").unwrap(), 42);
        assert_eq!(row.get::<String>("email").unwrap(), "a@b.c");
    }

    #[test]
    fn row_get_missing_column() {
        let row = SqlRow::default();
        let err = row.get::<i64>("id").unwrap_err();
        assert!(matches!(err, SessionError::MissingColumn { .. }));
    }

    #[test]
    fn row_get_type_mismatch() {
        let row = SqlRow::from_pairs(vec![("id".to_owned(), SqlValue::Text("x".to_owned()))]);
        let err = row.get::<i64>("id").unwrap_err();
        assert!(matches!(err, SessionError::TypeMismatch { .. }));
    }

    #[test]
    fn nullable_column_reads_as_option() {
        let row = SqlRow::from_pairs(vec![("note".to_owned(), SqlValue::Null)]);
        assert_eq!(row.get::<Option<String>>("note").unwrap(), None);
    }

    #[test]
    fn integer_widening() {
        assert_eq!(i64::from_sql(&SqlValue::I32(5)), Some(5));
        assert_eq!(i32::from_sql(&SqlValue::I64(5)), None);
    }
}
