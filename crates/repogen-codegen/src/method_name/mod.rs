// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Derived-query method-name parsing.
//!
//! Method identifiers written in the derived-query DSL parse into an
//! [`Intent`]: a verb, an optional limit, a predicate over resolved property
//! paths, and a sort specification. Property paths resolve against the
//! entity's property set **longest-match-first** (`order_date` binds before
//! `order`), recursing through relationship navigations for multi-level
//! paths such as `find_by_order_customer_name`.
//!
//! ```text
//! intent  := verb [distinct] [limit] ("by" predicate)? ("order_by" sort)? ["async"]
//! verb    := find|get|query|search|read|stream | count | exists | delete|remove
//! limit   := "first"[N] | "top"[N]
//! predicate := term (("and"|"or") term)*
//! term    := property_path [ignore_case] op [ignore_case]
//! sort    := property_path (asc|desc) ("then" property_path (asc|desc))*
//! ```
//!
//! Tie-breaks: `is` directly followed by a known operator is a modifier
//! (`is_greater_than` ≡ `greater_than`); a bare trailing `is` is equality;
//! `first`/`top` without a number mean 1. `or` binds at the same level as
//! `and`, left to right — the DSL has no parentheses.

mod paths;

pub use paths::{HopKind, PathCandidate, PathHop, ResolvedPath, inverse_fk_column, resolve_paths};

use crate::model::{EntityModel, EntitySet, ValueKind};

/// Statement category of a parsed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `find`/`get`/`query`/`search`/`read`/`stream`.
    Select,
    /// `count`.
    Count,
    /// `exists`.
    Exists,
    /// `delete`/`remove`.
    Delete
}

/// Connective between predicate terms; left-to-right, one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// `and`.
    And,
    /// `or`.
    Or
}

/// Sort direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// `asc`.
    Asc,
    /// `desc`.
    Desc
}

/// Comparison operator of one predicate term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equality; the empty spelling, `is`, or `equals`.
    Eq,
    /// Inequality; `not` or `is_not`.
    Ne,
    /// `greater_than`.
    Gt,
    /// `greater_than_equal`.
    Gte,
    /// `less_than`.
    Lt,
    /// `less_than_equal`.
    Lte,
    /// `between`; two parameters.
    Between,
    /// `before`; temporal less-than.
    Before,
    /// `after`; temporal greater-than.
    After,
    /// `in`; list parameter.
    In,
    /// `not_in`.
    NotIn,
    /// `containing`/`contains`.
    Containing,
    /// `starting_with`/`starts_with`.
    StartingWith,
    /// `ending_with`/`ends_with`.
    EndingWith,
    /// `like`.
    Like,
    /// `not_like`.
    NotLike,
    /// `is_null`; no parameter.
    IsNull,
    /// `is_not_null`; no parameter.
    IsNotNull,
    /// `true`; no parameter.
    True,
    /// `false`; no parameter.
    False,
    /// `regex`/`matches`/`matches_regex`.
    Regex
}

impl Operator {
    /// Number of method parameters the operator consumes.
    pub const fn param_count(&self) -> usize {
        match self {
            Self::Between => 2,
            Self::IsNull | Self::IsNotNull | Self::True | Self::False => 0,
            _ => 1
        }
    }

    /// Whether the operator applies to values of `kind`.
    pub const fn applies_to(&self, kind: ValueKind) -> bool {
        match self {
            Self::Gt | Self::Gte | Self::Lt | Self::Lte | Self::Between => kind.is_orderable(),
            Self::Before | Self::After => kind.is_temporal(),
            Self::Containing
            | Self::StartingWith
            | Self::EndingWith
            | Self::Like
            | Self::NotLike
            | Self::Regex => kind.is_text(),
            Self::True | Self::False => matches!(kind, ValueKind::Bool),
            Self::Eq | Self::Ne | Self::In | Self::NotIn | Self::IsNull | Self::IsNotNull => true
        }
    }

    /// Canonical DSL spelling; empty for equality.
    pub const fn canonical(&self) -> &'static str {
        match self {
            Self::Eq => "",
            Self::Ne => "not",
            Self::Gt => "greater_than",
            Self::Gte => "greater_than_equal",
            Self::Lt => "less_than",
            Self::Lte => "less_than_equal",
            Self::Between => "between",
            Self::Before => "before",
            Self::After => "after",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Containing => "containing",
            Self::StartingWith => "starting_with",
            Self::EndingWith => "ending_with",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::True => "true",
            Self::False => "false",
            Self::Regex => "regex"
        }
    }
}

/// Operator spellings, longest first so prefixes never shadow longer forms.
const OPERATORS: &[(&[&str], Operator)] = &[
    (&["is", "greater", "than", "equal"], Operator::Gte),
    (&["is", "less", "than", "equal"], Operator::Lte),
    (&["greater", "than", "equal"], Operator::Gte),
    (&["less", "than", "equal"], Operator::Lte),
    (&["is", "greater", "than"], Operator::Gt),
    (&["is", "less", "than"], Operator::Lt),
    (&["is", "starting", "with"], Operator::StartingWith),
    (&["is", "ending", "with"], Operator::EndingWith),
    (&["is", "not", "null"], Operator::IsNotNull),
    (&["is", "not", "like"], Operator::NotLike),
    (&["is", "not", "in"], Operator::NotIn),
    (&["greater", "than"], Operator::Gt),
    (&["less", "than"], Operator::Lt),
    (&["starting", "with"], Operator::StartingWith),
    (&["starts", "with"], Operator::StartingWith),
    (&["ending", "with"], Operator::EndingWith),
    (&["ends", "with"], Operator::EndingWith),
    (&["matches", "regex"], Operator::Regex),
    (&["is", "containing"], Operator::Containing),
    (&["is", "between"], Operator::Between),
    (&["is", "before"], Operator::Before),
    (&["is", "after"], Operator::After),
    (&["is", "null"], Operator::IsNull),
    (&["is", "like"], Operator::Like),
    (&["is", "true"], Operator::True),
    (&["is", "false"], Operator::False),
    (&["is", "not"], Operator::Ne),
    (&["is", "in"], Operator::In),
    (&["not", "like"], Operator::NotLike),
    (&["not", "in"], Operator::NotIn),
    (&["containing"], Operator::Containing),
    (&["contains"], Operator::Containing),
    (&["between"], Operator::Between),
    (&["equals"], Operator::Eq),
    (&["before"], Operator::Before),
    (&["matches"], Operator::Regex),
    (&["after"], Operator::After),
    (&["regex"], Operator::Regex),
    (&["like"], Operator::Like),
    (&["true"], Operator::True),
    (&["false"], Operator::False),
    (&["not"], Operator::Ne),
    (&["is"], Operator::Eq),
    (&["in"], Operator::In),
];

/// One predicate term: a resolved path compared by an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateTerm {
    /// Connective to the previous term; `And` on the first.
    pub connector:   Connector,
    /// Resolved property path.
    pub path:        ResolvedPath,
    /// Comparison operator.
    pub op:          Operator,
    /// Case-insensitive comparison.
    pub ignore_case: bool
}

/// One sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Resolved property path.
    pub path:  ResolvedPath,
    /// Direction.
    pub order: SortOrder
}

/// Fully resolved parse of a derived-query method name.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    /// Statement category.
    pub verb:     Verb,
    /// `distinct` flag.
    pub distinct: bool,
    /// Row limit; `Some(1)` for a bare `first`/`top`.
    pub limit:    Option<u32>,
    /// Predicate terms in source order.
    pub terms:    Vec<PredicateTerm>,
    /// Sort keys in source order.
    pub sort:     Vec<SortKey>
}

impl Intent {
    /// Canonical method name this intent round-trips through.
    ///
    /// `parse(intent.method_name(), ..)` reproduces the intent for every
    /// name the planner emits.
    pub fn method_name(&self) -> String {
        let mut segments: Vec<String> = Vec::new();
        segments.push(
            match self.verb {
                Verb::Select => "find",
                Verb::Count => "count",
                Verb::Exists => "exists",
                Verb::Delete => "delete"
            }
            .to_owned()
        );
        if self.distinct {
            segments.push("distinct".to_owned());
        }
        match self.limit {
            Some(1) => segments.push("first".to_owned()),
            Some(n) => segments.push(format!("top{n}")),
            None => {}
        }
        if !self.terms.is_empty() {
            segments.push("by".to_owned());
            for (index, term) in self.terms.iter().enumerate() {
                if index > 0 {
                    segments.push(
                        match term.connector {
                            Connector::And => "and",
                            Connector::Or => "or"
                        }
                        .to_owned()
                    );
                }
                segments.extend(term.path.property_segments());
                let op = term.op.canonical();
                if !op.is_empty() {
                    segments.push(op.to_owned());
                }
                if term.ignore_case {
                    segments.push("ignore_case".to_owned());
                }
            }
        }
        if !self.sort.is_empty() {
            segments.push("order_by".to_owned());
            for (index, key) in self.sort.iter().enumerate() {
                if index > 0 {
                    segments.push("then".to_owned());
                }
                segments.extend(key.path.property_segments());
                segments.push(
                    match key.order {
                        SortOrder::Asc => "asc",
                        SortOrder::Desc => "desc"
                    }
                    .to_owned()
                );
            }
        }
        segments.join("_")
    }
}

/// Why a name failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Leading segment is not a known verb.
    UnknownVerb,
    /// No property of the entity matches the path position.
    UnknownProperty,
    /// Operator does not apply to the property's type.
    OperatorType,
    /// Segments remain after the grammar is exhausted.
    Trailing
}

/// Parse failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Failure category.
    pub kind:    ParseErrorKind,
    /// One-line explanation.
    pub message: String
}

impl ParseError {
    fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into()
        }
    }
}

/// Parse a method name against an entity.
pub fn parse(name: &str, entity: &EntityModel, entities: &EntitySet) -> Result<Intent, ParseError> {
    let mut segments: Vec<&str> = name.split('_').filter(|s| !s.is_empty()).collect();
    if segments.last() == Some(&"async") {
        segments.pop();
    }
    if segments.is_empty() {
        return Err(ParseError::new(ParseErrorKind::UnknownVerb, "empty method name"));
    }

    let verb = match segments[0] {
        "find" | "get" | "query" | "search" | "read" | "stream" => Verb::Select,
        "count" => Verb::Count,
        "exists" => Verb::Exists,
        "delete" | "remove" => Verb::Delete,
        other => {
            return Err(ParseError::new(
                ParseErrorKind::UnknownVerb,
                format!("`{other}` is not a derived-query verb")
            ));
        }
    };
    let mut index = 1;

    let mut distinct = false;
    if segments.get(index) == Some(&"distinct") {
        distinct = true;
        index += 1;
    }

    let mut limit = None;
    if let Some(segment) = segments.get(index) {
        for keyword in ["first", "top"] {
            if let Some(rest) = segment.strip_prefix(keyword) {
                if rest.is_empty() {
                    index += 1;
                    // A detached number may follow: `top_10`.
                    if let Some(n) = segments.get(index).and_then(|s| s.parse::<u32>().ok()) {
                        limit = Some(n);
                        index += 1;
                    } else {
                        limit = Some(1);
                    }
                    break;
                }
                if let Ok(n) = rest.parse::<u32>() {
                    limit = Some(n);
                    index += 1;
                    break;
                }
            }
        }
    }

    let mut terms = Vec::new();
    if segments.get(index) == Some(&"by") {
        index += 1;
        let mut connector = Connector::And;
        loop {
            let (term, next) = parse_term(&segments, index, connector, entity, entities)?;
            terms.push(term);
            index = next;
            match segments.get(index) {
                Some(&"and") => {
                    connector = Connector::And;
                    index += 1;
                }
                Some(&"or") => {
                    connector = Connector::Or;
                    index += 1;
                }
                _ => break
            }
        }
    }

    let mut sort = Vec::new();
    if at_order_by(&segments, index) {
        index += 2;
        loop {
            let (key, next) = parse_sort_key(&segments, index, entity, entities)?;
            sort.push(key);
            index = next;
            if segments.get(index) == Some(&"then") {
                index += 1;
                continue;
            }
            break;
        }
    }

    if index != segments.len() {
        return Err(ParseError::new(
            ParseErrorKind::Trailing,
            format!("cannot parse `{}`", segments[index..].join("_"))
        ));
    }

    Ok(Intent {
        verb,
        distinct,
        limit,
        terms,
        sort
    })
}

fn at_order_by(segments: &[&str], index: usize) -> bool {
    segments.get(index) == Some(&"order") && segments.get(index + 1) == Some(&"by")
}

fn term_boundary(segments: &[&str], index: usize) -> bool {
    index == segments.len()
        || segments.get(index) == Some(&"and")
        || segments.get(index) == Some(&"or")
        || at_order_by(segments, index)
}

/// Parse one predicate term starting at `index`.
///
/// Property paths are tried longest-match-first; the first candidate whose
/// remainder parses as `[ignore_case] op [ignore_case]` up to a term
/// boundary wins. The best candidate's typing failure is reported when none
/// fits.
fn parse_term(
    segments: &[&str],
    index: usize,
    connector: Connector,
    entity: &EntityModel,
    entities: &EntitySet
) -> Result<(PredicateTerm, usize), ParseError> {
    let candidates = resolve_paths(entity, entities, &segments[index..]);
    if candidates.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::UnknownProperty,
            format!(
                "no property of `{}` matches `{}`",
                entity.simple_name,
                segments[index..].join("_")
            )
        ));
    }

    let mut typing_failure: Option<ParseError> = None;
    for candidate in &candidates {
        let mut cursor = index + candidate.consumed;
        let mut ignore_case = false;
        if segments.get(cursor) == Some(&"ignore") && segments.get(cursor + 1) == Some(&"case") {
            ignore_case = true;
            cursor += 2;
        }
        let Some((op, after_op)) = match_operator(segments, cursor) else {
            continue;
        };
        let mut cursor = after_op;
        if segments.get(cursor) == Some(&"ignore") && segments.get(cursor + 1) == Some(&"case") {
            ignore_case = true;
            cursor += 2;
        }
        if !term_boundary(segments, cursor) {
            continue;
        }
        if !op.applies_to(candidate.path.kind) {
            typing_failure.get_or_insert_with(|| {
                ParseError::new(
                    ParseErrorKind::OperatorType,
                    format!(
                        "operator `{}` does not apply to `{}`",
                        op.canonical(),
                        candidate.path.property_segments().join("_")
                    )
                )
            });
            continue;
        }
        if ignore_case && !candidate.path.kind.is_text() {
            typing_failure.get_or_insert_with(|| {
                ParseError::new(
                    ParseErrorKind::OperatorType,
                    "ignore_case applies to text properties only".to_owned()
                )
            });
            continue;
        }
        return Ok((
            PredicateTerm {
                connector,
                path: candidate.path.clone(),
                op,
                ignore_case
            },
            cursor
        ));
    }

    Err(typing_failure.unwrap_or_else(|| {
        ParseError::new(
            ParseErrorKind::Trailing,
            format!(
                "cannot parse an operator after `{}`",
                segments[index..].join("_")
            )
        )
    }))
}

/// Longest operator match at `index`; the empty match is equality.
fn match_operator(segments: &[&str], index: usize) -> Option<(Operator, usize)> {
    for (words, op) in OPERATORS {
        if segments.len() >= index + words.len()
            && segments[index..index + words.len()] == **words
        {
            return Some((*op, index + words.len()));
        }
    }
    Some((Operator::Eq, index))
}

fn parse_sort_key(
    segments: &[&str],
    index: usize,
    entity: &EntityModel,
    entities: &EntitySet
) -> Result<(SortKey, usize), ParseError> {
    let candidates = resolve_paths(entity, entities, &segments[index..]);
    for candidate in &candidates {
        let cursor = index + candidate.consumed;
        let (order, cursor) = match segments.get(cursor) {
            Some(&"asc") => (SortOrder::Asc, cursor + 1),
            Some(&"desc") => (SortOrder::Desc, cursor + 1),
            _ => (SortOrder::Asc, cursor)
        };
        let boundary = cursor == segments.len() || segments.get(cursor) == Some(&"then");
        if boundary {
            return Ok((
                SortKey {
                    path: candidate.path.clone(),
                    order
                },
                cursor
            ));
        }
    }
    Err(ParseError::new(
        ParseErrorKind::UnknownProperty,
        format!(
            "no sortable property matches `{}`",
            segments[index..].join("_")
        )
    ))
}

#[cfg(test)]
mod tests;
