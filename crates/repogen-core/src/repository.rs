// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Base repository capability.
//!
//! Every `#[repository]` trait extends [`CrudRepository`] with its entity
//! and key types; repogen recognises the supertrait, matches the entity to a
//! built model, and emits the base implementation alongside the derived
//! methods.

use async_trait::async_trait;
use thiserror::Error;

use crate::session::RepoResult;

/// Base CRUD surface implemented for every generated repository.
///
/// # Type Parameters
///
/// - `E` — entity type
/// - `K` — primary-key type
///
/// # Example
///
/// ```rust,ignore
/// #[repository]
/// pub trait OrderRepository: CrudRepository<Order, i32> {
///     async fn find_by_customer_id(&self, customer_id: i32) -> RepoResult<Vec<Order>>;
/// }
/// ```
#[async_trait]
pub trait CrudRepository<E, K>: Send + Sync
where
    E: Send + 'static,
    K: Send + 'static
{
    /// Fetch one entity by primary key.
    async fn find_by_id(&self, id: K) -> RepoResult<Option<E>>;

    /// Fetch all entities, ordered by primary key.
    async fn find_all(&self) -> RepoResult<Vec<E>>;

    /// Insert a new entity, returning it with any generated key applied.
    async fn save(&self, entity: E) -> RepoResult<E>;

    /// Update an existing entity by primary key. Returns affected rows.
    async fn update(&self, entity: E) -> RepoResult<u64>;

    /// Delete by primary key. Returns affected rows.
    async fn delete_by_id(&self, id: K) -> RepoResult<u64>;

    /// Count all entities.
    async fn count(&self) -> RepoResult<i64>;

    /// Whether an entity with the given key exists.
    async fn exists_by_id(&self, id: K) -> RepoResult<bool>;
}

/// Error raised by generated relationship-consistency validators.
///
/// The `validate_relationship_consistency` helpers emitted per entity raise
/// this when a scalar foreign key and its navigation property disagree —
/// one set while the other is not, or the key differing from the
/// navigation's primary key.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("relationship `{relationship}` is inconsistent: {detail}")]
pub struct RelationshipError {
    /// Navigation property the check failed on.
    pub relationship: String,
    /// Human-readable mismatch description.
    pub detail:       String
}

impl RelationshipError {
    /// Build an inconsistency error for a navigation property.
    pub fn inconsistent(relationship: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            relationship: relationship.into(),
            detail:       detail.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_error_display() {
        let err = RelationshipError::inconsistent("customer", "customer_id is 3 but customer.id is 4");
        assert_eq!(
            err.to_string(),
            "relationship `customer` is inconsistent: customer_id is 3 but customer.id is 4"
        );
    }
}
