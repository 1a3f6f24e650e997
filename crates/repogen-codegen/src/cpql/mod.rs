// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! CPQL-to-SQL translation.
//!
//! CPQL is a stripped object query language: entity and property names with
//! single-letter aliases and `:param` placeholders. The translator rewrites
//! it token by token into SQL with `@param` placeholders, mapping entity
//! names to tables and `alias.Property` references to columns when entity
//! metadata is supplied.
//!
//! The rewrite must not break plain SQL: an input with no `:` parameters
//! and no short FROM alias passes through **unchanged**.
//!
//! # Rewrite contract
//!
//! 1. Tokenize, preserving quoted literals verbatim.
//! 2. `:name` → `@name` outside literals.
//! 3. With metadata: entity names in `FROM`/`UPDATE`/`DELETE`/`INSERT
//!    INTO`/`JOIN` become table names; `alias.Property` resolves to the
//!    property's column, dropping the `alias.` prefix in
//!    WHERE/SET/GROUP BY/HAVING/ORDER BY (and inside aggregate arguments)
//!    while a single alias is in scope; `SELECT alias` expands to the full
//!    aliased column list in declaration order — never `SELECT *`, the
//!    session maps rows by property name; `COUNT(alias)` becomes
//!    `COUNT(*)`; `SUM(alias.Prop)`/`AVG(alias.Prop)` become
//!    `SUM(column)`/`AVG(column)`.
//! 4. Without metadata: 1–3 character FROM aliases are removed, `alias.`
//!    prefixes stripped, property casing preserved, `SELECT alias` becomes
//!    `SELECT *`.
//! 5. Optional pretty printer breaks lines before FROM/WHERE/AND/OR/ORDER
//!    BY/GROUP BY/HAVING.

mod tokens;

use std::collections::BTreeMap;

pub use tokens::{Tok, tokenize};

/// Metadata for one entity visible to the translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpqlEntity {
    /// Entity simple name as written in CPQL.
    pub name:       String,
    /// Table name, schema-qualified when declared.
    pub table:      String,
    /// `(property, column)` pairs in declaration order.
    pub properties: Vec<(String, String)>
}

impl CpqlEntity {
    fn column(&self, property: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, c)| c.as_str())
    }
}

/// Entity map handed to the translator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpqlMetadata {
    entities: Vec<CpqlEntity>
}

impl CpqlMetadata {
    /// Build from entities in declaration order.
    pub fn new(entities: Vec<CpqlEntity>) -> Self {
        Self {
            entities
        }
    }

    fn entity(&self, name: &str) -> Option<&CpqlEntity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

/// Translation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpqlError {
    /// One-line explanation.
    pub message: String
}

impl CpqlError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into()
        }
    }
}

impl std::fmt::Display for CpqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Translator options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpqlOptions {
    /// Break lines before major clauses instead of single-line output.
    pub pretty: bool
}

const KEYWORDS: &[&str] = &[
    "select", "distinct", "from", "where", "update", "set", "delete", "insert", "into", "values",
    "join", "inner", "left", "right", "outer", "on", "and", "or", "not", "in", "like", "is",
    "null", "order", "group", "by", "having", "limit", "offset", "between", "exists", "with",
    "as", "union", "all", "count", "sum", "avg", "min", "max", "coalesce", "asc", "desc", "case",
    "when", "then", "else", "end",
];

const AGGREGATES: &[&str] = &["count", "sum", "avg", "min", "max"];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k))
}

fn is_aggregate(word: &str) -> bool {
    AGGREGATES.iter().any(|k| word.eq_ignore_ascii_case(k))
}

/// Clauses where a lone alias prefix may be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Select,
    Table,
    Set,
    Where,
    GroupBy,
    Having,
    OrderBy,
    On,
    Values,
    Other
}

/// Translate one CPQL string.
///
/// # Errors
///
/// Returns [`CpqlError`] on malformed input (unterminated string literal).
pub fn translate(
    input: &str,
    metadata: Option<&CpqlMetadata>,
    options: &CpqlOptions
) -> Result<String, CpqlError> {
    let tokens = tokenize(input).map_err(CpqlError::new)?;
    if tokens.is_empty() {
        return Err(CpqlError::new("empty query"));
    }

    let has_params = tokens.iter().any(|t| matches!(t, Tok::Param(_)));
    let aliases = collect_aliases(&tokens, metadata);
    if !has_params && aliases.is_empty() {
        // Plain SQL passes through unchanged.
        return Ok(input.to_owned());
    }

    let single_alias = aliases.len() == 1;
    let mut out: Vec<Tok> = Vec::new();
    let mut alias_positions: Vec<(usize, String)> = Vec::new();
    let mut clause = Clause::Other;
    let mut table_position = false;
    let mut index = 0;

    while index < tokens.len() {
        let token = &tokens[index];
        match token {
            Tok::Param(name) => {
                out.push(Tok::Word(format!("@{name}")));
                index += 1;
            }
            Tok::Str(_) | Tok::Op(_) => {
                out.push(token.clone());
                index += 1;
            }
            Tok::Punct(c) => {
                out.push(Tok::Punct(*c));
                index += 1;
            }
            Tok::Word(word) => {
                // Aggregate calls rewrite before keyword handling; the
                // function names are keywords themselves.
                if is_aggregate(word)
                    && matches!(tokens.get(index + 1), Some(Tok::Punct('(')))
                {
                    if let Some(consumed) =
                        rewrite_aggregate(&tokens, index, &aliases, metadata, single_alias, &mut out)
                    {
                        index += consumed;
                        continue;
                    }
                }

                if is_keyword(word) {
                    clause = next_clause(clause, word);
                    table_position = matches!(
                        word.to_ascii_lowercase().as_str(),
                        "from" | "join" | "into" | "update"
                    );
                    out.push(token.clone());
                    index += 1;

                    // `SELECT [DISTINCT] alias FROM` expands to a column list.
                    if word.eq_ignore_ascii_case("select") {
                        if let Some(next) =
                            expand_select_list(&tokens, index, &aliases, metadata, &mut out)
                        {
                            index = next;
                        }
                    }
                    continue;
                }

                if table_position {
                    // Entity name in table position; an alias may follow.
                    let rendered = metadata
                        .and_then(|m| m.entity(word))
                        .map(|e| e.table.clone())
                        .unwrap_or_else(|| word.clone());
                    out.push(Tok::Word(rendered));
                    table_position = false;
                    index += 1;
                    // Optional AS before the alias.
                    let mut next = index;
                    if matches!(tokens.get(next), Some(Tok::Word(w)) if w.eq_ignore_ascii_case("as"))
                    {
                        next += 1;
                    }
                    if let Some(Tok::Word(alias)) = tokens.get(next) {
                        if aliases.contains_key(alias.as_str()) {
                            if next > index {
                                out.push(tokens[index].clone());
                            }
                            alias_positions.push((out.len(), alias.clone()));
                            out.push(Tok::Word(alias.clone()));
                            index = next + 1;
                        }
                    }
                    continue;
                }

                if let Some((alias, property)) = split_alias_reference(word, &aliases) {
                    out.push(resolve_reference(
                        &alias,
                        &property,
                        metadata,
                        &aliases,
                        single_alias,
                        clause
                    ));
                    index += 1;
                    continue;
                }

                out.push(token.clone());
                index += 1;
            }
        }
    }

    // Drop alias definitions nothing refers to any more.
    let out = prune_aliases(out, &alias_positions, metadata.is_some());

    Ok(render(&out, options.pretty))
}

fn next_clause(current: Clause, keyword: &str) -> Clause {
    match keyword.to_ascii_lowercase().as_str() {
        "select" => Clause::Select,
        "from" | "join" | "update" | "into" => Clause::Table,
        "set" => Clause::Set,
        "where" => Clause::Where,
        "group" => Clause::GroupBy,
        "having" => Clause::Having,
        "order" => Clause::OrderBy,
        "on" => Clause::On,
        "values" => Clause::Values,
        "and" | "or" | "not" | "in" | "like" | "is" | "null" | "between" | "exists" | "by"
        | "asc" | "desc" | "distinct" | "as" | "inner" | "left" | "right" | "outer" | "all" => {
            current
        }
        _ => current
    }
}

/// Alias map in first-occurrence order: alias → entity word.
fn collect_aliases(tokens: &[Tok], metadata: Option<&CpqlMetadata>) -> BTreeMap<String, String> {
    let mut aliases = BTreeMap::new();
    let mut index = 0;
    while index < tokens.len() {
        let Tok::Word(word) = &tokens[index] else {
            index += 1;
            continue;
        };
        let lower = word.to_ascii_lowercase();
        if matches!(lower.as_str(), "from" | "join" | "into" | "update") {
            if let Some(Tok::Word(entity)) = tokens.get(index + 1) {
                if !is_keyword(entity) && !entity.contains('.') {
                    let mut next = index + 2;
                    if matches!(tokens.get(next), Some(Tok::Word(w)) if w.eq_ignore_ascii_case("as"))
                    {
                        next += 1;
                    }
                    if let Some(Tok::Word(alias)) = tokens.get(next) {
                        let known_entity = metadata
                            .map(|m| m.entity(entity).is_some())
                            .unwrap_or(false);
                        let short = alias.len() <= 3;
                        if !is_keyword(alias)
                            && !alias.contains('.')
                            && (short || known_entity)
                        {
                            aliases.insert(alias.clone(), entity.clone());
                        }
                    }
                }
            }
        }
        index += 1;
    }
    aliases
}

/// `alias.Property` split when the prefix is a known alias.
fn split_alias_reference(
    word: &str,
    aliases: &BTreeMap<String, String>
) -> Option<(String, String)> {
    let (prefix, rest) = word.split_once('.')?;
    if aliases.contains_key(prefix) && !rest.contains('.') {
        Some((prefix.to_owned(), rest.to_owned()))
    } else {
        None
    }
}

fn resolve_reference(
    alias: &str,
    property: &str,
    metadata: Option<&CpqlMetadata>,
    aliases: &BTreeMap<String, String>,
    single_alias: bool,
    clause: Clause
) -> Tok {
    let droppable = matches!(
        clause,
        Clause::Where | Clause::Set | Clause::GroupBy | Clause::Having | Clause::OrderBy
    );
    match metadata {
        Some(metadata) => {
            let column = aliases
                .get(alias)
                .and_then(|entity| metadata.entity(entity))
                .and_then(|entity| entity.column(property))
                .unwrap_or(property);
            if droppable && single_alias {
                Tok::Word(column.to_owned())
            } else {
                Tok::Word(format!("{alias}.{column}"))
            }
        }
        // Without metadata the property casing is preserved verbatim and
        // the prefix always goes.
        None => Tok::Word(property.to_owned())
    }
}

/// Expand `SELECT [DISTINCT] alias FROM …`.
///
/// Pushes nothing and returns `None` when the select list is not a bare
/// entity alias; otherwise pushes the expansion and returns the input index
/// of the FROM keyword.
fn expand_select_list(
    tokens: &[Tok],
    mut index: usize,
    aliases: &BTreeMap<String, String>,
    metadata: Option<&CpqlMetadata>,
    out: &mut Vec<Tok>
) -> Option<usize> {
    let mut distinct = None;
    if let Some(Tok::Word(word)) = tokens.get(index) {
        if word.eq_ignore_ascii_case("distinct") {
            distinct = Some(tokens[index].clone());
            index += 1;
        }
    }
    let Some(Tok::Word(alias)) = tokens.get(index) else {
        return None;
    };
    if !aliases.contains_key(alias.as_str()) {
        return None;
    }
    if !matches!(tokens.get(index + 1), Some(Tok::Word(w)) if w.eq_ignore_ascii_case("from")) {
        return None;
    }
    let expansion: Vec<Tok> = match metadata {
        Some(metadata) => {
            let entity = aliases.get(alias.as_str()).and_then(|e| metadata.entity(e))?;
            let mut pieces = Vec::new();
            for (position, (property, column)) in entity.properties.iter().enumerate() {
                if position > 0 {
                    pieces.push(Tok::Punct(','));
                }
                pieces.push(Tok::Word(format!("{alias}.{column}")));
                pieces.push(Tok::Word("AS".to_owned()));
                pieces.push(Tok::Word(property.clone()));
            }
            pieces
        }
        None => vec![Tok::Punct('*')]
    };
    out.extend(distinct);
    out.extend(expansion);
    Some(index + 1)
}

/// Rewrite `FN(alias)` / `FN(alias.Prop)`; returns consumed token count.
fn rewrite_aggregate(
    tokens: &[Tok],
    index: usize,
    aliases: &BTreeMap<String, String>,
    metadata: Option<&CpqlMetadata>,
    single_alias: bool,
    out: &mut Vec<Tok>
) -> Option<usize> {
    let Tok::Word(function) = &tokens[index] else {
        return None;
    };
    let Some(Tok::Word(argument)) = tokens.get(index + 2) else {
        return None;
    };
    if !matches!(tokens.get(index + 3), Some(Tok::Punct(')'))) {
        return None;
    }

    if function.eq_ignore_ascii_case("count") && aliases.contains_key(argument.as_str()) {
        out.push(Tok::Word(function.clone()));
        out.push(Tok::Punct('('));
        out.push(Tok::Punct('*'));
        out.push(Tok::Punct(')'));
        return Some(4);
    }

    let (alias, property) = split_alias_reference(argument, aliases)?;
    let resolved = match metadata {
        Some(metadata) => {
            let column = aliases
                .get(&alias)
                .and_then(|entity| metadata.entity(entity))
                .and_then(|entity| entity.column(&property))
                .unwrap_or(property.as_str());
            if single_alias {
                column.to_owned()
            } else {
                format!("{alias}.{column}")
            }
        }
        None => property.clone()
    };
    out.push(Tok::Word(function.clone()));
    out.push(Tok::Punct('('));
    out.push(Tok::Word(resolved));
    out.push(Tok::Punct(')'));
    Some(4)
}

/// Remove alias definition tokens no remaining reference needs.
fn prune_aliases(
    out: Vec<Tok>,
    alias_positions: &[(usize, String)],
    has_metadata: bool
) -> Vec<Tok> {
    let mut drop_indices: Vec<usize> = Vec::new();
    for (position, alias) in alias_positions {
        let referenced = has_metadata
            && out.iter().enumerate().any(|(i, t)| {
                i != *position
                    && matches!(t, Tok::Word(w) if w.starts_with(&format!("{alias}."))
                        || w == alias)
            });
        if !referenced {
            drop_indices.push(*position);
        }
    }
    out.into_iter()
        .enumerate()
        .filter(|(i, _)| !drop_indices.contains(i))
        .map(|(_, t)| t)
        .collect()
}

/// Render tokens back to text with canonical spacing.
fn render(tokens: &[Tok], pretty: bool) -> String {
    let mut text = String::new();
    for (index, token) in tokens.iter().enumerate() {
        let piece = match token {
            Tok::Word(w) => w.clone(),
            Tok::Param(p) => format!("@{p}"),
            Tok::Str(s) => s.clone(),
            Tok::Op(op) => op.clone(),
            Tok::Punct(c) => c.to_string()
        };
        if index == 0 {
            text.push_str(&piece);
            continue;
        }

        let no_space_before = matches!(token, Tok::Punct(',') | Tok::Punct(')') | Tok::Punct(';'));
        let after_open = text.ends_with('(');
        let function_call = matches!(token, Tok::Punct('('))
            && matches!(tokens.get(index - 1), Some(Tok::Word(w)) if is_aggregate(w));

        if pretty && break_before(tokens, index) {
            text.push('\n');
        } else if !no_space_before && !after_open && !function_call {
            text.push(' ');
        }
        text.push_str(&piece);
    }
    text
}

fn break_before(tokens: &[Tok], index: usize) -> bool {
    let Tok::Word(word) = &tokens[index] else {
        return false;
    };
    let lower = word.to_ascii_lowercase();
    matches!(
        lower.as_str(),
        "from" | "where" | "and" | "or" | "group" | "having" | "order"
    )
}

#[cfg(test)]
mod tests;
