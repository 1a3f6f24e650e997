// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The type model built from one compilation unit.
//!
//! [`EntityModel`] and [`RepositoryModel`] are immutable values produced by
//! the extractor for a single pipeline run. Relationships refer to their
//! target entity by **simple name** — a key into the [`EntitySet`] owned by
//! the driver — never by direct reference, so cyclic entity graphs need no
//! cyclic ownership.

mod extract;

use std::collections::BTreeSet;

pub use extract::extract;
use quote::ToTokens;

/// Table binding of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name. Defaults to the lowercased simple name plus `s`.
    pub name:   String,
    /// Optional schema qualifier.
    pub schema: Option<String>
}

impl TableSpec {
    /// Render the table reference, schema-qualified when present.
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone()
        }
    }
}

/// Roles a property can play in the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Primary-key property.
    Id,
    /// Database-generated value.
    GeneratedValue,
    /// Explicitly mapped column.
    Column,
    /// Scalar foreign-key column of a relationship.
    ForeignKey
}

/// Property value categories the generator reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `bool`.
    Bool,
    /// `i16`.
    Int16,
    /// `i32`.
    Int32,
    /// `i64`.
    Int64,
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
    /// `String` / `&str`.
    Text,
    /// `chrono::DateTime<Utc>`.
    DateTime,
    /// `chrono::NaiveDate`.
    Date,
    /// `uuid::Uuid`.
    Uuid,
    /// Anything else.
    Other
}

impl ValueKind {
    /// Classify a (non-`Option`) type by its trailing path segment.
    pub fn of(ty: &syn::Type) -> Self {
        let Some(segment) = last_segment(ty) else {
            return Self::Other;
        };
        match segment.as_str() {
            "bool" => Self::Bool,
            "i16" => Self::Int16,
            "i32" => Self::Int32,
            "i64" => Self::Int64,
            "f32" => Self::Float32,
            "f64" => Self::Float64,
            "String" | "str" => Self::Text,
            "DateTime" => Self::DateTime,
            "NaiveDate" => Self::Date,
            "Uuid" => Self::Uuid,
            _ => Self::Other
        }
    }

    /// Whether values of this kind order linearly (range operators apply).
    pub const fn is_orderable(&self) -> bool {
        matches!(
            self,
            Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Float32
                | Self::Float64
                | Self::DateTime
                | Self::Date
        )
    }

    /// Whether this is a numeric kind (aggregates apply).
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }

    /// Whether this is a temporal kind.
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::DateTime | Self::Date)
    }

    /// Whether this is a textual kind (LIKE/regex operators apply).
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

/// Column binding of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name. Defaults to the property name.
    pub name:      String,
    /// Explicit SQL type, when declared.
    pub sql_type:  Option<String>,
    /// Text length.
    pub length:    Option<u32>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale:     Option<u32>,
    /// NULL-ability.
    pub nullable:  bool,
    /// UNIQUE constraint.
    pub unique:    bool
}

/// One scalar property of an entity.
#[derive(Debug, Clone)]
pub struct Property {
    /// Field name.
    pub name:     String,
    /// Declared type with any `Option` wrapper removed.
    pub ty:       syn::Type,
    /// Classified kind of [`Self::ty`].
    pub kind:     ValueKind,
    /// Whether the declared type was `Option<_>` or `column(nullable)` set.
    pub nullable: bool,
    /// Column binding.
    pub column:   ColumnSpec,
    /// Mapping roles.
    pub roles:    BTreeSet<Role>
}

impl Property {
    /// Whether this property carries the `Id` role.
    pub fn is_key(&self) -> bool {
        self.roles.contains(&Role::Id)
    }

    /// Whether the value is database-generated.
    pub fn is_generated(&self) -> bool {
        self.roles.contains(&Role::GeneratedValue)
    }

    /// Whether this property is a scalar foreign key.
    pub fn is_foreign_key(&self) -> bool {
        self.roles.contains(&Role::ForeignKey)
    }
}

/// Owner side of a to-one association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManyToOne {
    /// Navigation property name.
    pub property:      String,
    /// Simple name of the target entity.
    pub target_entity: String,
    /// Foreign-key column on this entity's table.
    pub join_column:   String,
    /// Whether the association may be absent.
    pub optional:      bool,
    /// Whether the navigation field itself is `Option<_>`.
    pub nullable:      bool
}

/// Collection side of a one-to-many association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneToMany {
    /// Collection property name.
    pub property:            String,
    /// Simple name of the element entity.
    pub target_entity:       String,
    /// Owning property on the target; inverse side when set.
    pub mapped_by:           Option<String>,
    /// Cascade specification (informational).
    pub cascade:             Option<String>,
    /// Orphan removal flag.
    pub orphan_removal:      bool,
    /// Whether the collection field is `Option<Vec<_>>`.
    pub collection_nullable: bool
}

/// One-to-one association, owner or inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneToOne {
    /// Navigation property name.
    pub property:       String,
    /// Simple name of the target entity.
    pub target_entity:  String,
    /// Foreign-key column; owner side only.
    pub join_column:    Option<String>,
    /// Owning property on the target; inverse side when set.
    pub mapped_by:      Option<String>,
    /// Orphan removal flag.
    pub orphan_removal: bool,
    /// Whether the navigation field is `Option<_>`.
    pub nullable:       bool
}

/// Join-table backed association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManyToMany {
    /// Collection property name.
    pub property:             String,
    /// Simple name of the element entity.
    pub target_entity:        String,
    /// Join table name.
    pub join_table:           String,
    /// Columns referencing this entity.
    pub join_columns:         Vec<String>,
    /// Columns referencing the target.
    pub inverse_join_columns: Vec<String>,
    /// Owning property on the target; inverse side when set.
    pub mapped_by:            Option<String>
}

/// A relationship of an entity, as a tagged variant.
///
/// Planner and emitter match exhaustively; adding a kind forces every call
/// site to account for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relationship {
    /// Owner side of a to-one association.
    ManyToOne(ManyToOne),
    /// Collection side of a one-to-many association.
    OneToMany(OneToMany),
    /// One-to-one association.
    OneToOne(OneToOne),
    /// Join-table backed association.
    ManyToMany(ManyToMany)
}

impl Relationship {
    /// Navigation property name.
    pub fn property(&self) -> &str {
        match self {
            Self::ManyToOne(r) => &r.property,
            Self::OneToMany(r) => &r.property,
            Self::OneToOne(r) => &r.property,
            Self::ManyToMany(r) => &r.property
        }
    }

    /// Simple name of the target entity.
    pub fn target_entity(&self) -> &str {
        match self {
            Self::ManyToOne(r) => &r.target_entity,
            Self::OneToMany(r) => &r.target_entity,
            Self::OneToOne(r) => &r.target_entity,
            Self::ManyToMany(r) => &r.target_entity
        }
    }
}

/// One persistent class.
#[derive(Debug, Clone)]
pub struct EntityModel {
    /// Module-qualified type name.
    pub qualified_name: String,
    /// Simple type name; the resolution key for relationships.
    pub simple_name:    String,
    /// Table binding.
    pub table:          TableSpec,
    /// Scalar properties in declaration order.
    pub properties:     Vec<Property>,
    /// Relationships in declaration order.
    pub relationships:  Vec<Relationship>,
    /// Primary-key property names; one entry unless composite.
    pub primary_key:    Vec<String>
}

impl EntityModel {
    /// Scalar property lookup by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Relationship lookup by navigation property name.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.property() == name)
    }

    /// The single primary-key property, when not composite.
    pub fn pk_property(&self) -> Option<&Property> {
        match self.primary_key.as_slice() {
            [single] => self.property(single),
            _ => None
        }
    }

    /// Column name of the primary key, defaulting to `id`.
    pub fn pk_column(&self) -> &str {
        self.pk_property()
            .map(|p| p.column.name.as_str())
            .unwrap_or("id")
    }

    /// Scalar property whose column matches `column`, if any.
    ///
    /// Used to find the explicit foreign-key property behind a join column.
    pub fn property_by_column(&self, column: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.column.name == column)
    }
}

/// All entities of a compilation unit, declaration-ordered with name lookup.
#[derive(Debug, Default, Clone)]
pub struct EntitySet {
    entities: Vec<EntityModel>
}

impl EntitySet {
    /// Build from a declaration-ordered list.
    pub fn new(entities: Vec<EntityModel>) -> Self {
        Self {
            entities
        }
    }

    /// Entities in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.iter()
    }

    /// Lookup by simple name.
    pub fn get(&self, simple_name: &str) -> Option<&EntityModel> {
        self.entities.iter().find(|e| e.simple_name == simple_name)
    }

    /// Whether a simple name denotes an entity.
    pub fn contains(&self, simple_name: &str) -> bool {
        self.get(simple_name).is_some()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Shape of a user method's return type, `RepoResult` unwrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    /// `Vec<T>`.
    Many(syn::Type),
    /// `Option<T>`.
    Single(syn::Type),
    /// Bare value: scalar, affected-row count, or entity.
    Value(syn::Type),
    /// `()` or no return type.
    Unit
}

impl ReturnShape {
    /// Element/value type, when any.
    pub fn inner(&self) -> Option<&syn::Type> {
        match self {
            Self::Many(t) | Self::Single(t) | Self::Value(t) => Some(t),
            Self::Unit => None
        }
    }
}

/// One declared method parameter (receiver excluded).
#[derive(Debug, Clone)]
pub struct MethodParam {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty:   syn::Type
}

impl MethodParam {
    /// Classified kind with `Option` and reference wrappers removed.
    pub fn kind(&self) -> ValueKind {
        ValueKind::of(strip_wrappers(&self.ty))
    }
}

/// One method declared on a repository trait.
#[derive(Debug, Clone)]
pub struct UserMethod {
    /// Method name.
    pub name:             String,
    /// Full signature as declared, re-emitted verbatim in the impl.
    pub signature:        syn::Signature,
    /// Parameters, receiver excluded.
    pub params:           Vec<MethodParam>,
    /// Return shape with the result wrapper removed.
    pub return_shape:     ReturnShape,
    /// `#[query]` arguments, when present.
    pub query:            Option<crate::attrs::QueryArgs>,
    /// `#[stored_procedure]` arguments, when present.
    pub stored_procedure: Option<crate::attrs::StoredProcedureArgs>,
    /// `#[multi_mapping]` arguments, when present.
    pub multi_mapping:    Option<crate::attrs::MultiMappingArgs>,
    /// `#[bulk_operation]` arguments, when present.
    pub bulk:             Option<crate::attrs::BulkOperationArgs>
}

/// One repository interface.
#[derive(Debug, Clone)]
pub struct RepositoryModel {
    /// Module-qualified trait name.
    pub qualified_name: String,
    /// Module path of the declaration.
    pub namespace:      String,
    /// Trait name.
    pub trait_name:     String,
    /// Simple name of the mapped entity.
    pub entity:         String,
    /// Primary-key parameter type.
    pub key_type:       syn::Type,
    /// Declared methods in declaration order.
    pub user_methods:   Vec<UserMethod>
}

impl RepositoryModel {
    /// Rendered key type, for fingerprints and docs.
    pub fn key_type_text(&self) -> String {
        self.key_type.to_token_stream().to_string()
    }
}

/// Trailing path-segment identifier of a type, if it has one.
pub fn last_segment(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        syn::Type::Reference(reference) => last_segment(&reference.elem),
        _ => None
    }
}

/// Generic argument of a single-argument wrapper like `Option<T>`/`Vec<T>`.
pub fn generic_argument(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(t) => Some(t),
        _ => None
    })
}

/// Peel `&`, `Option<...>` from a type.
pub fn strip_wrappers(ty: &syn::Type) -> &syn::Type {
    let mut current = ty;
    loop {
        match current {
            syn::Type::Reference(reference) => current = &reference.elem,
            syn::Type::Path(_) if last_segment(current).as_deref() == Some("Option") => {
                match generic_argument(current) {
                    Some(inner) => current = inner,
                    None => return current
                }
            }
            _ => return current
        }
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    #[test]
    fn value_kind_classification() {
        let ty: syn::Type = parse_quote!(i64);
        assert_eq!(ValueKind::of(&ty), ValueKind::Int64);
        let ty: syn::Type = parse_quote!(DateTime<Utc>);
        assert_eq!(ValueKind::of(&ty), ValueKind::DateTime);
        let ty: syn::Type = parse_quote!(chrono::DateTime<chrono::Utc>);
        assert_eq!(ValueKind::of(&ty), ValueKind::DateTime);
        let ty: syn::Type = parse_quote!(Customer);
        assert_eq!(ValueKind::of(&ty), ValueKind::Other);
    }

    #[test]
    fn orderable_and_numeric() {
        assert!(ValueKind::DateTime.is_orderable());
        assert!(!ValueKind::DateTime.is_numeric());
        assert!(ValueKind::Float64.is_numeric());
        assert!(!ValueKind::Text.is_orderable());
    }

    #[test]
    fn strip_wrappers_unwraps_option_and_refs() {
        let ty: syn::Type = parse_quote!(&Option<String>);
        assert_eq!(ValueKind::of(strip_wrappers(&ty)), ValueKind::Text);
    }

    #[test]
    fn table_spec_qualification() {
        let plain = TableSpec {
            name:   "orders".to_owned(),
            schema: None
        };
        assert_eq!(plain.qualified(), "orders");
        let qualified = TableSpec {
            name:   "orders".to_owned(),
            schema: Some("sales".to_owned())
        };
        assert_eq!(qualified.qualified(), "sales.orders");
    }
}
