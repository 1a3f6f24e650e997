// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Diagnostic taxonomy and sink.
//!
//! Everything the pipeline has to say about its input flows through
//! [`Diagnostic`] values collected in a [`DiagnosticSink`]. The pipeline
//! never aborts a compilation: a malformed entity drops that entity, an
//! unmappable method drops that method, and siblings proceed.
//!
//! # Kinds
//!
//! | Kind | Code range | Effect |
//! |------|-----------|--------|
//! | [`DiagnosticKind::Schema`] | RG01xx | Entity or repository dropped |
//! | [`DiagnosticKind::MethodResolution`] | RG02xx | One method dropped |
//! | [`DiagnosticKind::CpqlTranslation`] | RG03xx | Method emitted with a guarded body |
//! | [`DiagnosticKind::InternalInvariant`] | RG09xx | One method skipped; indicates a generator bug |

use std::{
    fmt,
    sync::{Mutex, PoisonError}
};

/// Broad classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Malformed entity or repository declaration.
    Schema,
    /// A user-declared method could not be mapped.
    MethodResolution,
    /// A `#[query]` string failed to translate.
    CpqlTranslation,
    /// An internal assertion failed; a generator bug.
    InternalInvariant
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Input is ignored but generation proceeds unchanged elsewhere.
    Warning,
    /// The offending declaration is dropped from the output.
    Error
}

/// Stable diagnostic codes.
///
/// One code per condition; codes never change meaning between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// RG0101 — entity declares more than one `#[id]` property.
    DuplicateId,
    /// RG0102 — entity declares no `#[id]` property.
    MissingId,
    /// RG0103 — relationship target type is not an entity in this compilation.
    UnresolvedTarget,
    /// RG0104 — unknown or unreadable attribute (warning).
    UnknownAttribute,
    /// RG0105 — repository entity type parameter does not match any entity.
    UnresolvedRepositoryEntity,
    /// RG0106 — `mapped_by` names no relationship property on the target.
    MappedByMissing,
    /// RG0107 — attribute argument has the wrong type.
    AttributeType,
    /// RG0108 — repository trait lacks the `CrudRepository<Entity, Key>` bound.
    MissingCrudBound,
    /// RG0201 — method name references an unknown property.
    UnknownProperty,
    /// RG0202 — method name does not parse as a derived query.
    UnparsableMethod,
    /// RG0203 — operator is incompatible with the property type.
    OperatorType,
    /// RG0204 — method parameter count does not match the parsed predicate.
    ParameterCount,
    /// RG0301 — CPQL string failed to parse or rewrite.
    CpqlRewrite,
    /// RG0901 — internal planner/emitter invariant failed.
    InternalInvariant
}

impl Code {
    /// Stable textual form, `RGnnnn`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateId => "RG0101",
            Self::MissingId => "RG0102",
            Self::UnresolvedTarget => "RG0103",
            Self::UnknownAttribute => "RG0104",
            Self::UnresolvedRepositoryEntity => "RG0105",
            Self::MappedByMissing => "RG0106",
            Self::AttributeType => "RG0107",
            Self::MissingCrudBound => "RG0108",
            Self::UnknownProperty => "RG0201",
            Self::UnparsableMethod => "RG0202",
            Self::OperatorType => "RG0203",
            Self::ParameterCount => "RG0204",
            Self::CpqlRewrite => "RG0301",
            Self::InternalInvariant => "RG0901"
        }
    }

    /// Kind implied by the code.
    pub const fn kind(&self) -> DiagnosticKind {
        match self {
            Self::DuplicateId
            | Self::MissingId
            | Self::UnresolvedTarget
            | Self::UnknownAttribute
            | Self::UnresolvedRepositoryEntity
            | Self::MappedByMissing
            | Self::AttributeType
            | Self::MissingCrudBound => DiagnosticKind::Schema,
            Self::UnknownProperty
            | Self::UnparsableMethod
            | Self::OperatorType
            | Self::ParameterCount => DiagnosticKind::MethodResolution,
            Self::CpqlRewrite => DiagnosticKind::CpqlTranslation,
            Self::InternalInvariant => DiagnosticKind::InternalInvariant
        }
    }
}

/// One reported issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stable code.
    pub code:     Code,
    /// Severity.
    pub severity: Severity,
    /// One-line explanation.
    pub message:  String,
    /// Offending declaration, `Entity.property` / `Repository::method` form.
    pub location: String
}

impl Diagnostic {
    /// Build an error diagnostic.
    pub fn error(code: Code, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            location: location.into()
        }
    }

    /// Build a warning diagnostic.
    pub fn warning(code: Code, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message: message.into(),
            location: location.into()
        }
    }

    /// Kind of this diagnostic.
    pub fn kind(&self) -> DiagnosticKind {
        self.code.kind()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error"
        };
        write!(
            f,
            "{severity} {}: {} ({})",
            self.code.as_str(),
            self.message,
            self.location
        )
    }
}

/// Append-only diagnostic collector.
///
/// The one shared mutable resource of a pipeline run; appends go through a
/// mutex so repository fan-out can share a sink.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    items: Mutex<Vec<Diagnostic>>
}

impl DiagnosticSink {
    /// Fresh empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    /// Number of collected diagnostics.
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any error-severity diagnostic was reported.
    pub fn has_errors(&self) -> bool {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Drain into the final ordered list.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the collected diagnostics.
    pub fn to_vec(&self) -> Vec<Diagnostic> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Code::DuplicateId.as_str(), "RG0101");
        assert_eq!(Code::UnknownProperty.as_str(), "RG0201");
        assert_eq!(Code::CpqlRewrite.as_str(), "RG0301");
        assert_eq!(Code::InternalInvariant.as_str(), "RG0901");
    }

    #[test]
    fn kind_follows_code() {
        assert_eq!(Code::MappedByMissing.kind(), DiagnosticKind::Schema);
        assert_eq!(Code::OperatorType.kind(), DiagnosticKind::MethodResolution);
    }

    #[test]
    fn sink_collects_in_order() {
        let sink = DiagnosticSink::new();
        sink.push(Diagnostic::error(Code::MissingId, "User", "no #[id] property"));
        sink.push(Diagnostic::warning(Code::UnknownAttribute, "User.name", "ignored"));
        let items = sink.into_vec();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].code, Code::MissingId);
        assert!(items[1].severity == Severity::Warning);
    }

    #[test]
    fn display_contains_code_and_location() {
        let d = Diagnostic::error(Code::UnresolvedTarget, "Order.customer", "no entity `Customer`");
        let text = d.to_string();
        assert!(text.contains("RG0103"));
        assert!(text.contains("Order.customer"));
    }
}
