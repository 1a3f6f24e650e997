// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Derived-method planning.
//!
//! The planner walks a repository's entity graph and produces the full
//! method catalog the emitter renders: the base CRUD surface, the user's
//! declared methods resolved to SQL, and the relationship-derived methods
//! (foreign-key finders, existence probes, per-parent aggregates, GROUP BY
//! rollups, join-table operations, complex filters).
//!
//! Everything here is a pure function of the model; SQL text comes from the
//! templater, diagnostics go to the sink, and a method that cannot be
//! planned is skipped without taking the repository down with it.

mod base;
mod derived;
mod lower;
mod user;

pub use lower::lower_intent;

use crate::{
    diagnostics::DiagnosticSink,
    model::{EntityModel, EntitySet, RepositoryModel, UserMethod}
};

/// One parameter of a planned method.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanParam {
    /// Parameter name; also the placeholder name when bound.
    pub name: String,
    /// Parameter type.
    pub ty:   syn::Type,
    /// Whether the parameter binds as a SQL parameter.
    pub bind: bool
}

impl PlanParam {
    /// A bound parameter.
    pub fn bound(name: impl Into<String>, ty: syn::Type) -> Self {
        Self {
            name: name.into(),
            ty,
            bind: true
        }
    }

    /// A parameter consumed by the method body, not by SQL.
    pub fn unbound(name: impl Into<String>, ty: syn::Type) -> Self {
        Self {
            name: name.into(),
            ty,
            bind: false
        }
    }
}

/// Return surface of a planned method.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanReturn {
    /// `Vec<Entity>` of the repository's entity.
    Entities,
    /// `Option<Entity>`.
    OptionalEntity,
    /// The entity itself (insert-style methods).
    Entity,
    /// `Vec<T>` of another entity type.
    TargetEntities(syn::Type),
    /// `i64` count.
    Count,
    /// `bool`.
    Bool,
    /// `u64` affected rows.
    Affected,
    /// Scalar value.
    Scalar(syn::Type),
    /// Nullable scalar value.
    OptionalScalar(syn::Type),
    /// `HashMap<K, V>` keyed by parent primary key.
    Map {
        /// Key type.
        key:   syn::Type,
        /// Value type.
        value: syn::Type
    },
    /// `Vec<SummaryStruct>` of an emitted record type.
    Rows(String)
}

/// How a planned method's body executes.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanBody {
    /// `session.query::<Entity>`.
    Query {
        /// Statement text.
        sql: String
    },
    /// `session.query::<T>` for another entity type.
    QueryTarget {
        /// Statement text.
        sql: String,
        /// Element type.
        ty:  syn::Type
    },
    /// `session.query_single::<Entity>`.
    QuerySingle {
        /// Statement text.
        sql: String
    },
    /// `session.execute_scalar::<i64>`.
    Count {
        /// Statement text.
        sql: String
    },
    /// `session.execute_scalar::<i64>` compared `> 0`.
    Exists {
        /// Statement text.
        sql: String
    },
    /// `session.execute_scalar::<T>`.
    Scalar {
        /// Statement text.
        sql: String
    },
    /// `session.execute_scalar::<Option<T>>`.
    OptionalScalar {
        /// Statement text.
        sql: String
    },
    /// `session.execute`.
    Execute {
        /// Statement text.
        sql: String
    },
    /// Entity INSERT, binding entity fields; applies a generated key.
    Insert {
        /// Statement text; selects the generated key when `generated_key`.
        sql:           String,
        /// `(property, key type)` to write the generated key back into.
        generated_key: Option<(String, syn::Type)>,
        /// Entity fields bound as parameters, in column order.
        bindings:      Vec<EntityBinding>
    },
    /// Entity UPDATE, binding entity fields.
    UpdateEntity {
        /// Statement text.
        sql:      String,
        /// Entity fields bound as parameters.
        bindings: Vec<EntityBinding>
    },
    /// Runtime-assembled ORDER BY, resolved through the entity's metadata
    /// record (`order_column` falls back to the key column for unknown
    /// property names).
    SortedPage {
        /// Statement text up to (excluding) the ORDER BY clause.
        sql_prefix: String
    },
    /// `session.query::<GroupRow<K, V>>` collected into a map.
    GroupMap {
        /// Statement text with `key`/`value` aliases.
        sql: String
    },
    /// `session.query::<SummaryStruct>`.
    Rows {
        /// Statement text.
        sql:         String,
        /// Emitted record type name.
        struct_name: String
    }
}

impl PlanBody {
    /// Statement text, when the body holds a single fixed statement.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Query { sql }
            | Self::QueryTarget { sql, .. }
            | Self::QuerySingle { sql }
            | Self::Count { sql }
            | Self::Exists { sql }
            | Self::Scalar { sql }
            | Self::OptionalScalar { sql }
            | Self::Execute { sql }
            | Self::Insert { sql, .. }
            | Self::UpdateEntity { sql, .. }
            | Self::GroupMap { sql }
            | Self::Rows { sql, .. } => Some(sql),
            Self::SortedPage { .. } => None
        }
    }
}

/// One entity field bound as a SQL parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityBinding {
    /// Placeholder name.
    pub param:    String,
    /// Entity field name.
    pub field:    String,
    /// Whether the field needs a `.clone()` (non-`Copy` value).
    pub clone:    bool
}

/// A fully planned method.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMethod {
    /// Method name.
    pub name:   String,
    /// One-line doc comment for the emitted signature.
    pub doc:    String,
    /// Parameters in order.
    pub params: Vec<PlanParam>,
    /// Return surface.
    pub ret:    PlanReturn,
    /// Body plan.
    pub body:   PlanBody
}

/// Body plan of a user-declared method.
#[derive(Debug, Clone, PartialEq)]
pub enum UserBody {
    /// Execute a fixed statement through the call shape.
    Sql {
        /// Statement text.
        sql:  String,
        /// Call shape.
        call: UserCall
    },
    /// Batched statement execution over an item collection.
    Bulk {
        /// Per-item statement text.
        sql:             String,
        /// Items per batch.
        batch_size:      u32,
        /// Wrap the whole run in a transaction.
        use_transaction: bool,
        /// Collection parameter name.
        items_param:     String,
        /// Entity fields bound per item.
        bindings:        Vec<EntityBinding>
    },
    /// The method could not be planned; the body raises at call site.
    Guarded {
        /// Diagnostic message baked into the emitted error.
        message: String
    }
}

/// Call shape of a user method body.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCall {
    /// `query::<T>`.
    Query(syn::Type),
    /// `query_single::<T>`.
    QuerySingle(syn::Type),
    /// `query_single::<T>` with a missing row surfaced as an error.
    One(syn::Type),
    /// `execute`.
    Execute,
    /// `execute_scalar::<i64>` compared `> 0`.
    Exists,
    /// `execute_scalar::<T>`.
    Scalar(syn::Type),
    /// `execute` discarding the affected count.
    Unit
}

/// A record type emitted for a multi-mapping method.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiMapType {
    /// Record type name, from the method's declared element type.
    pub name:     String,
    /// `(field, entity type)` per mapped type, in `map_types` order.
    pub fields:   Vec<(String, syn::Type)>,
    /// Columns the source row splits on, for documentation.
    pub split_on: Vec<String>
}

/// A planned user method: declaration plus body.
#[derive(Debug, Clone)]
pub struct PlannedUserMethod {
    /// The declared method.
    pub method: UserMethod,
    /// Planned body.
    pub body:   UserBody
}

/// An emitted record type for summaries and multi-mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryType {
    /// Type name.
    pub name:   String,
    /// `(field, type, nullable)` in emission order.
    pub fields: Vec<(String, syn::Type, bool)>
}

/// Everything the emitter needs for one repository.
#[derive(Debug, Clone)]
pub struct RepositoryPlan {
    /// The repository model.
    pub repository:    RepositoryModel,
    /// The mapped entity.
    pub entity:        EntityModel,
    /// Base CRUD methods, emitted in the `CrudRepository` impl.
    pub base_methods:  Vec<DerivedMethod>,
    /// User methods with resolved bodies, emitted in the user-trait impl.
    pub user_methods:  Vec<PlannedUserMethod>,
    /// Derived methods, emitted in the extension trait and its impl.
    pub derived:       Vec<DerivedMethod>,
    /// Record types emitted next to the extension trait.
    pub summary_types: Vec<SummaryType>,
    /// Multi-mapping record types emitted next to the extension trait.
    pub multi_map_types: Vec<MultiMapType>
}

/// Plan one repository.
///
/// Never fails: anything unplannable degrades to a diagnostic plus a
/// guarded or skipped method.
pub fn plan_repository(
    repository: &RepositoryModel,
    entities: &EntitySet,
    sink: &DiagnosticSink
) -> Option<RepositoryPlan> {
    let entity = entities.get(&repository.entity)?.clone();

    let base_methods = base::plan(&entity, repository);
    let (user_methods, multi_map_types) = user::plan(repository, &entity, entities, sink);

    let mut taken: Vec<String> = user_methods.iter().map(|m| m.method.name.clone()).collect();
    taken.extend(base_methods.iter().map(|m| m.name.clone()));
    let (derived, summary_types) =
        derived::plan(repository, &entity, entities, &mut taken, sink);

    Some(RepositoryPlan {
        repository: repository.clone(),
        entity,
        base_methods,
        user_methods,
        derived,
        summary_types,
        multi_map_types
    })
}
