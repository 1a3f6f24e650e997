// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Core traits and types for repogen.
//!
//! This crate provides the runtime contracts referenced by repogen-generated
//! code. It can also be used standalone when writing repository
//! implementations by hand.
//!
//! # Overview
//!
//! - [`SqlSession`] — database facade the generated repositories execute
//!   against
//! - [`CrudRepository`] — base trait extended by every repository trait
//! - [`MetadataProvider`] — entity metadata descriptor lookup
//! - [`Pagination`] / [`SortDirection`] — common query parameters
//! - [`prelude`] — convenient re-exports
//!
//! # Usage
//!
//! Most users depend on `repogen` directly, which re-exports this crate.
//! For manual implementations:
//!
//! ```rust,ignore
//! use repogen_core::prelude::*;
//!
//! #[async_trait]
//! impl SqlSession for MyConnection {
//!     type Transaction = MyTransaction;
//!     // ...
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod metadata;
pub mod prelude;
pub mod repository;
pub mod session;

/// Re-export async_trait for generated code.
pub use async_trait::async_trait;
pub use metadata::{
    ColumnMetadata, EntityMetadata, MetadataProvider, RelationshipKind, RelationshipMetadata
};
pub use repository::{CrudRepository, RelationshipError};
pub use session::{
    FromSqlRow, FromSqlValue, GroupRow, RepoResult, SessionError, SqlParam, SqlRow, SqlSession,
    SqlTransaction, SqlValue
};

/// Pagination parameters for list operations.
///
/// Used by generated `*_paged` methods to control result windows. The
/// generated SQL renders these as `OFFSET @skip ROWS FETCH NEXT @take ROWS
/// ONLY`.
///
/// # Example
///
/// ```rust
/// use repogen_core::Pagination;
///
/// let page = Pagination::new(10, 0); // First 10 items
/// let next = Pagination::new(10, 10); // Next 10 items
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of results to return.
    pub take: i64,

    /// Number of results to skip.
    pub skip: i64
}

impl Pagination {
    /// Create new pagination parameters.
    ///
    /// # Arguments
    ///
    /// * `take` — Maximum results to return
    /// * `skip` — Number of results to skip
    pub const fn new(take: i64, skip: i64) -> Self {
        Self {
            take,
            skip
        }
    }

    /// Create pagination for a specific page.
    ///
    /// # Arguments
    ///
    /// * `page` — Page number (0-indexed)
    /// * `per_page` — Items per page
    ///
    /// # Example
    ///
    /// ```rust
    /// use repogen_core::Pagination;
    ///
    /// let page_0 = Pagination::page(0, 25); // skip=0, take=25
    /// let page_2 = Pagination::page(2, 25); // skip=50, take=25
    /// ```
    pub const fn page(page: i64, per_page: i64) -> Self {
        Self {
            take: per_page,
            skip: page * per_page
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            take: 100,
            skip: 0
        }
    }
}

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,

    /// Descending order (Z-A, 9-0, newest first).
    Desc
}

impl SortDirection {
    /// Convert to SQL keyword.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC"
        }
    }

    /// Build from the `ascending` flag used by generated sorted overloads.
    pub const fn from_ascending(ascending: bool) -> Self {
        if ascending { Self::Asc } else { Self::Desc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_new() {
        let p = Pagination::new(50, 100);
        assert_eq!(p.take, 50);
        assert_eq!(p.skip, 100);
    }

    #[test]
    fn pagination_page() {
        let p = Pagination::page(2, 25);
        assert_eq!(p.take, 25);
        assert_eq!(p.skip, 50);
    }

    #[test]
    fn pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.take, 100);
        assert_eq!(p.skip, 0);
    }

    #[test]
    fn sort_direction_as_sql() {
        assert_eq!(SortDirection::Asc.as_sql(), "ASC");
        assert_eq!(SortDirection::Desc.as_sql(), "DESC");
    }

    #[test]
    fn sort_direction_default_is_asc() {
        assert_eq!(SortDirection::default(), SortDirection::Asc);
    }

    #[test]
    fn sort_direction_from_ascending() {
        assert_eq!(SortDirection::from_ascending(true), SortDirection::Asc);
        assert_eq!(SortDirection::from_ascending(false), SortDirection::Desc);
    }
}
