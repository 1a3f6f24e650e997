// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Property-path resolution.
//!
//! A path position in a method name can name a scalar property, a foreign
//! key through a to-one navigation (`customer_id` via `customer`), or a
//! chain of navigations ending in a scalar (`order_customer_name`). Each
//! hop resolves through the **intermediate entity's** relationship
//! definition — columns are never guessed from the current entity's
//! property names.

use crate::model::{EntityModel, EntitySet, Relationship, ValueKind};

/// How a hop's join condition is built.
#[derive(Debug, Clone, PartialEq)]
pub enum HopKind {
    /// To-one hop: `source.fk_column = target.pk`.
    ToOne {
        /// Foreign-key column on the source table.
        fk_column: String
    },
    /// To-many hop: `target.child_fk_column = source.pk`.
    ToMany {
        /// Foreign-key column on the target (child) table.
        child_fk_column: String
    }
}

/// One navigation step of a resolved path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathHop {
    /// Navigation property on the source entity.
    pub navigation:       String,
    /// Source entity simple name.
    pub source_entity:    String,
    /// Target entity simple name.
    pub target_entity:    String,
    /// Target table, schema-qualified when declared.
    pub target_table:     String,
    /// Join construction.
    pub kind:             HopKind,
    /// Primary-key column of the source table.
    pub source_pk_column: String,
    /// Primary-key column of the target table.
    pub target_pk_column: String
}

/// A fully resolved property path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    /// Property names along the path, final property last.
    pub properties: Vec<String>,
    /// Joins required to reach the final column; empty for direct columns
    /// and foreign-key shortcuts.
    pub hops:       Vec<PathHop>,
    /// Final column name, on the root table or the last hop's table.
    pub column:     String,
    /// Value kind of the final column.
    pub kind:       ValueKind,
    /// Whether the final column is nullable.
    pub nullable:   bool,
    /// Parameter type a comparison against this path takes.
    pub param_ty:   syn::Type
}

impl ResolvedPath {
    /// Path as DSL segments.
    pub fn property_segments(&self) -> Vec<String> {
        self.properties
            .iter()
            .flat_map(|p| p.split('_').map(str::to_owned))
            .collect()
    }
}

/// A path match with the number of name segments it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCandidate {
    /// Segments consumed from the method name.
    pub consumed: usize,
    /// The resolved path.
    pub path:     ResolvedPath
}

/// All path matches at the head of `segments`, best first.
///
/// Ordering: longest match first, then fewest joins (a direct column or
/// foreign-key shortcut beats an equivalent join chain).
pub fn resolve_paths(
    entity: &EntityModel,
    entities: &EntitySet,
    segments: &[&str]
) -> Vec<PathCandidate> {
    let mut out = Vec::new();
    collect(entity, entities, segments, &[], &[], 0, &mut out);
    out.sort_by(|a, b| {
        b.consumed
            .cmp(&a.consumed)
            .then(a.path.hops.len().cmp(&b.path.hops.len()))
    });
    out
}

const MAX_HOPS: usize = 3;

fn collect(
    entity: &EntityModel,
    entities: &EntitySet,
    segments: &[&str],
    property_prefix: &[String],
    hop_prefix: &[PathHop],
    consumed_prefix: usize,
    out: &mut Vec<PathCandidate>
) {
    for property in &entity.properties {
        let Some(len) = segment_match(&property.name, segments) else {
            continue;
        };
        let mut properties = property_prefix.to_vec();
        properties.push(property.name.clone());
        out.push(PathCandidate {
            consumed: consumed_prefix + len,
            path:     ResolvedPath {
                properties,
                hops: hop_prefix.to_vec(),
                column: property.column.name.clone(),
                kind: property.kind,
                nullable: property.nullable,
                param_ty: property.ty.clone()
            }
        });
    }

    if hop_prefix.len() >= MAX_HOPS {
        return;
    }

    for relationship in &entity.relationships {
        let Some(len) = segment_match(relationship.property(), segments) else {
            continue;
        };
        let rest = &segments[len..];
        if rest.is_empty() {
            continue;
        }
        let Some(target) = entities.get(relationship.target_entity()) else {
            continue;
        };

        // Foreign-key shortcut: `<navigation>_<target pk>` filters the
        // owner-side column without a join. Trailing segments stay for the
        // operator grammar to judge.
        if let Some(fk_column) = owner_fk_column(relationship) {
            if let Some(pk) = target.pk_property() {
                if let Some(pk_len) = segment_match(&pk.name, rest) {
                    let mut properties = property_prefix.to_vec();
                    properties.push(relationship.property().to_owned());
                    properties.push(pk.name.clone());
                    out.push(PathCandidate {
                        consumed: consumed_prefix + len + pk_len,
                        path:     ResolvedPath {
                            properties,
                            hops: hop_prefix.to_vec(),
                            column: fk_column.clone(),
                            kind: pk.kind,
                            nullable: relationship_nullable(relationship),
                            param_ty: pk.ty.clone()
                        }
                    });
                }
            }
        }

        let Some(hop) = build_hop(entity, relationship, target) else {
            continue;
        };
        let mut properties = property_prefix.to_vec();
        properties.push(relationship.property().to_owned());
        let mut hops = hop_prefix.to_vec();
        hops.push(hop);
        collect(
            target,
            entities,
            rest,
            &properties,
            &hops,
            consumed_prefix + len,
            out
        );
    }
}

/// Number of segments `property` occupies at the head of `segments`, if it
/// matches there.
fn segment_match(property: &str, segments: &[&str]) -> Option<usize> {
    let words: Vec<&str> = property.split('_').collect();
    if segments.len() >= words.len() && segments[..words.len()] == words[..] {
        Some(words.len())
    } else {
        None
    }
}

/// Foreign-key column when the relationship owns one.
fn owner_fk_column(relationship: &Relationship) -> Option<&String> {
    match relationship {
        Relationship::ManyToOne(r) => Some(&r.join_column),
        Relationship::OneToOne(r) => r.join_column.as_ref(),
        Relationship::OneToMany(_) | Relationship::ManyToMany(_) => None
    }
}

fn relationship_nullable(relationship: &Relationship) -> bool {
    match relationship {
        Relationship::ManyToOne(r) => r.nullable,
        Relationship::OneToOne(r) => r.nullable,
        Relationship::OneToMany(_) | Relationship::ManyToMany(_) => false
    }
}

/// Build the join hop for a navigation, using the relationship definition
/// of the entity the hop starts from.
fn build_hop(
    source: &EntityModel,
    relationship: &Relationship,
    target: &EntityModel
) -> Option<PathHop> {
    let kind = match relationship {
        Relationship::ManyToOne(r) => HopKind::ToOne {
            fk_column: r.join_column.clone()
        },
        Relationship::OneToOne(r) => match (&r.join_column, &r.mapped_by) {
            (Some(column), _) => HopKind::ToOne {
                fk_column: column.clone()
            },
            (None, Some(mapped_by)) => HopKind::ToMany {
                child_fk_column: inverse_fk_column(target, mapped_by)?
            },
            (None, None) => return None
        },
        Relationship::OneToMany(r) => {
            let mapped_by = r.mapped_by.as_ref()?;
            HopKind::ToMany {
                child_fk_column: inverse_fk_column(target, mapped_by)?
            }
        }
        // Join-table chains are not navigable in method names.
        Relationship::ManyToMany(_) => return None
    };
    Some(PathHop {
        navigation: relationship.property().to_owned(),
        source_entity: source.simple_name.clone(),
        target_entity: target.simple_name.clone(),
        target_table: target.table.qualified(),
        kind,
        source_pk_column: source.pk_column().to_owned(),
        target_pk_column: target.pk_column().to_owned()
    })
}

/// Foreign-key column used by the inverse side of an association.
///
/// Resolution order: the owning `ManyToOne`/`OneToOne` named by `mapped_by`
/// contributes its join column (explicit or defaulted). The navigation
/// property name itself is never used as a column.
pub fn inverse_fk_column(child: &EntityModel, mapped_by: &str) -> Option<String> {
    match child.relationship(mapped_by) {
        Some(Relationship::ManyToOne(r)) => Some(r.join_column.clone()),
        Some(Relationship::OneToOne(r)) => r
            .join_column
            .clone()
            .or_else(|| Some(format!("{mapped_by}_id"))),
        _ => child
            .property(mapped_by)
            .filter(|p| p.is_foreign_key())
            .map(|p| p.column.name.clone())
    }
}
