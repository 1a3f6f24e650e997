// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Entity metadata descriptors.
//!
//! repogen emits one [`MetadataProvider`] implementation per compilation
//! whose static table maps entity types to their [`EntityMetadata`] records.
//! The records describe the relational mapping the generator computed:
//! table, columns, primary key, and relationships.
//!
//! All descriptor data is `'static` — the provider is a lookup over
//! constants baked into the generated source.

use std::any::TypeId;

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// Owner side holding the foreign-key column.
    ManyToOne,
    /// Inverse collection side.
    OneToMany,
    /// One-to-one, owner or inverse depending on `mapped_by`.
    OneToOne,
    /// Join-table backed collection.
    ManyToMany
}

/// One mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMetadata {
    /// Property name on the entity struct.
    pub property: &'static str,
    /// Column name in the table.
    pub column:   &'static str,
    /// Explicit SQL type, when declared.
    pub sql_type: Option<&'static str>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column carries a UNIQUE constraint.
    pub unique:   bool,
    /// Whether the value is database-generated.
    pub generated: bool,
    /// Whether the column is part of the primary key.
    pub is_key:   bool
}

/// One mapped relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipMetadata {
    /// Navigation property name.
    pub property:           &'static str,
    /// Cardinality.
    pub kind:               RelationshipKind,
    /// Simple name of the target entity.
    pub target_entity:      &'static str,
    /// Foreign-key column (owner sides only).
    pub foreign_key_column: Option<&'static str>,
    /// Inverse-side property on the target (`mapped_by`).
    pub mapped_by:          Option<&'static str>,
    /// Join table (many-to-many only).
    pub join_table:         Option<&'static str>
}

/// Full descriptor for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMetadata {
    /// Simple type name (e.g. `Order`).
    pub entity_name:    &'static str,
    /// Module-qualified type name.
    pub qualified_name: &'static str,
    /// Table name.
    pub table_name:     &'static str,
    /// Schema, when declared.
    pub schema:         Option<&'static str>,
    /// Property names forming the primary key, in declaration order.
    pub primary_key:    &'static [&'static str],
    /// Columns in declaration order.
    pub columns:        &'static [ColumnMetadata],
    /// Relationships in declaration order.
    pub relationships:  &'static [RelationshipMetadata]
}

impl EntityMetadata {
    /// Look up a column descriptor by property name.
    pub fn column(&self, property: &str) -> Option<&'static ColumnMetadata> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// Column name for a property, falling back to the first key column.
    ///
    /// Generated `*_sorted` overloads resolve their `order_by` argument
    /// through this map — the SQL-injection guard: an unknown property name
    /// sorts by the primary key instead of reaching the SQL text.
    pub fn order_column(&self, property: &str) -> &'static str {
        self.column(property)
            .map(|c| c.column)
            .unwrap_or_else(|| self.key_column())
    }

    /// Column name of the first primary-key property.
    pub fn key_column(&self) -> &'static str {
        self.primary_key
            .first()
            .and_then(|p| self.column(p))
            .map(|c| c.column)
            .unwrap_or("id")
    }
}

/// Metadata lookup contract implemented by the generated provider.
pub trait MetadataProvider {
    /// Descriptor for a statically-known entity type.
    fn get<T: 'static>(&self) -> Option<&'static EntityMetadata> {
        self.get_by_type(TypeId::of::<T>())
    }

    /// Descriptor by runtime type id.
    fn get_by_type(&self, type_id: TypeId) -> Option<&'static EntityMetadata>;

    /// Whether the type id belongs to a mapped entity.
    fn is_entity(&self, type_id: TypeId) -> bool {
        self.get_by_type(type_id).is_some()
    }

    /// All descriptors, in entity declaration order.
    fn all(&self) -> &'static [EntityMetadata];
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[ColumnMetadata] = &[
        ColumnMetadata {
            property:  "id",
            column:    "id",
            sql_type:  None,
            nullable:  false,
            unique:    false,
            generated: true,
            is_key:    true
        },
        ColumnMetadata {
            property:  "email",
            column:    "email_address",
            sql_type:  Some("VARCHAR(255)"),
            nullable:  false,
            unique:    true,
            generated: false,
            is_key:    false
        },
    ];

    const USER: EntityMetadata = EntityMetadata {
        entity_name:    "User",
        qualified_name: "domain::User",
        table_name:     "users",
        schema:         None,
        primary_key:    &["id"],
        columns:        COLUMNS,
        relationships:  &[]
    };

    #[test]
    fn column_lookup_by_property() {
        assert_eq!(USER.column("email").unwrap().column, "email_address");
        assert!(USER.column("email_address").is_none());
    }

    #[test]
    fn order_column_falls_back_to_key() {
        assert_eq!(USER.order_column("email"), "email_address");
        assert_eq!(USER.order_column("no_such_property"), "id");
        assert_eq!(USER.order_column("'; DROP TABLE users; --"), "id");
    }
}
