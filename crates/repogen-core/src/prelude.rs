// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Convenient re-exports for generated code and manual implementations.
//!
//! ```rust
//! use repogen_core::prelude::*;
//! ```

pub use crate::{
    CrudRepository, FromSqlRow, FromSqlValue, GroupRow, Pagination, RelationshipError, RepoResult,
    SessionError, SortDirection, SqlParam, SqlRow, SqlSession, SqlTransaction, SqlValue,
    async_trait,
    metadata::{
        ColumnMetadata, EntityMetadata, MetadataProvider, RelationshipKind, RelationshipMetadata
    }
};
