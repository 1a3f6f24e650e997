// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! SQL fragment templating.
//!
//! Pure string builders with no hidden state. Every fragment takes explicit
//! structured input; the emitter never concatenates SQL by hand.
//!
//! Dialect choices fixed here: pagination is `OFFSET @skip ROWS FETCH NEXT
//! @take ROWS ONLY`, LIKE patterns concatenate with `CONCAT('%', @p, '%')`,
//! regular expressions use `REGEXP`, placeholders are `@name`.

use crate::method_name::Operator;

/// Join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`.
    Inner,
    /// `LEFT JOIN`.
    Left
}

/// One join of a SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Join kind.
    pub kind:  JoinKind,
    /// Joined table, schema-qualified when declared.
    pub table: String,
    /// Table alias.
    pub alias: String,
    /// Raw ON condition.
    pub on:    String
}

impl Join {
    fn render(&self) -> String {
        let keyword = match self.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN"
        };
        format!("{keyword} {} {} ON {}", self.table, self.alias, self.on)
    }
}

/// Structured input of [`select`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectSpec {
    /// Select list, rendered as given.
    pub columns:  String,
    /// Root table.
    pub table:    String,
    /// Root alias, when joins need one.
    pub alias:    Option<String>,
    /// Joins in order.
    pub joins:    Vec<Join>,
    /// Raw WHERE condition, without the keyword.
    pub where_sql: Option<String>,
    /// Raw ORDER BY list, without the keyword.
    pub order_by: Option<String>,
    /// Literal row limit (`first`/`top`).
    pub top:      Option<u32>,
    /// Parameterized pagination (`@skip`/`@take`).
    pub paged:    bool,
    /// DISTINCT flag.
    pub distinct: bool
}

/// Render a single SELECT statement.
pub fn select(spec: &SelectSpec) -> String {
    let mut sql = String::from("SELECT ");
    if spec.distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&spec.columns);
    sql.push_str(" FROM ");
    sql.push_str(&spec.table);
    if let Some(alias) = &spec.alias {
        sql.push(' ');
        sql.push_str(alias);
    }
    for join in &spec.joins {
        sql.push(' ');
        sql.push_str(&join.render());
    }
    if let Some(where_sql) = &spec.where_sql {
        sql.push_str(" WHERE ");
        sql.push_str(where_sql);
    }
    if let Some(order_by) = &spec.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }
    if spec.paged {
        sql.push_str(" OFFSET @skip ROWS FETCH NEXT @take ROWS ONLY");
    } else if let Some(top) = spec.top {
        sql.push_str(&format!(" OFFSET 0 ROWS FETCH NEXT {top} ROWS ONLY"));
    }
    sql
}

/// Render an INSERT statement.
pub fn insert(table: &str, columns: &[String], params: &[String]) -> String {
    let placeholders: Vec<String> = params.iter().map(|p| format!("@{p}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Render an UPDATE statement from `(column, param)` assignments.
pub fn update(table: &str, assignments: &[(String, String)], where_sql: &str) -> String {
    let sets: Vec<String> = assignments
        .iter()
        .map(|(column, param)| format!("{column} = @{param}"))
        .collect();
    format!("UPDATE {table} SET {} WHERE {where_sql}", sets.join(", "))
}

/// Render a DELETE statement.
pub fn delete(table: &str, where_sql: Option<&str>) -> String {
    match where_sql {
        Some(where_sql) => format!("DELETE FROM {table} WHERE {where_sql}"),
        None => format!("DELETE FROM {table}")
    }
}

/// Render a COUNT query.
pub fn count(table: &str, where_sql: Option<&str>) -> String {
    match where_sql {
        Some(where_sql) => format!("SELECT COUNT(*) FROM {table} WHERE {where_sql}"),
        None => format!("SELECT COUNT(*) FROM {table}")
    }
}

/// Render an existence probe.
///
/// Emitted as `COUNT(1)`; the call site compares `> 0`.
pub fn exists(table: &str, where_sql: &str) -> String {
    format!("SELECT COUNT(1) FROM {table} WHERE {where_sql}")
}

/// Aggregate function over a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// `SUM`, zero-coalesced.
    Sum,
    /// `AVG`; nullable result.
    Avg,
    /// `MIN`; nullable result.
    Min,
    /// `MAX`; nullable result.
    Max,
    /// `COUNT` over a column.
    Count
}

impl AggregateFn {
    /// DSL word used in derived method names.
    pub const fn word(&self) -> &'static str {
        match self {
            Self::Sum => "total",
            Self::Avg => "average",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count"
        }
    }

    /// Whether the SQL result can be NULL on an empty group.
    pub const fn nullable(&self) -> bool {
        !matches!(self, Self::Sum | Self::Count)
    }
}

/// Render an aggregate expression.
///
/// `SUM` wraps in `COALESCE(.., 0)` so empty child sets read as zero;
/// `AVG`/`MIN`/`MAX` stay unwrapped and their results are nullable.
pub fn aggregate(function: AggregateFn, column: &str) -> String {
    match function {
        AggregateFn::Sum => format!("COALESCE(SUM({column}), 0)"),
        AggregateFn::Avg => format!("AVG({column})"),
        AggregateFn::Min => format!("MIN({column})"),
        AggregateFn::Max => format!("MAX({column})"),
        AggregateFn::Count => format!("COUNT({column})")
    }
}

/// Structured input of [`group_by_summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBySummarySpec {
    /// Parent table.
    pub parent_table: String,
    /// Parent alias.
    pub parent_alias: String,
    /// Child table.
    pub child_table:  String,
    /// Child alias.
    pub child_alias:  String,
    /// Foreign-key column on the child table.
    pub fk_column:    String,
    /// Primary-key column on the parent table.
    pub parent_pk:    String,
    /// Full select list, aliased items included.
    pub select_list:  String,
    /// GROUP BY columns.
    pub group_by:     Vec<String>,
    /// Optional ORDER BY list.
    pub order_by:     Option<String>
}

/// Render a per-parent rollup.
///
/// The child side joins with LEFT JOIN so parents without children appear
/// with zero counts.
pub fn group_by_summary(spec: &GroupBySummarySpec) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} {} LEFT JOIN {} {} ON {}.{} = {}.{} GROUP BY {}",
        spec.select_list,
        spec.parent_table,
        spec.parent_alias,
        spec.child_table,
        spec.child_alias,
        spec.child_alias,
        spec.fk_column,
        spec.parent_alias,
        spec.parent_pk,
        spec.group_by.join(", ")
    );
    if let Some(order_by) = &spec.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }
    sql
}

/// Render one comparison of a WHERE clause.
///
/// `params` are placeholder names without the `@` sigil, in operator order
/// (two for BETWEEN, none for the literal operators).
pub fn comparison(column: &str, op: Operator, params: &[&str], ignore_case: bool) -> String {
    let col = |ignore: bool| {
        if ignore {
            format!("LOWER({column})")
        } else {
            column.to_owned()
        }
    };
    let param = |index: usize| {
        let name = params.get(index).copied().unwrap_or("value");
        if ignore_case {
            format!("LOWER(@{name})")
        } else {
            format!("@{name}")
        }
    };
    match op {
        Operator::Eq => format!("{} = {}", col(ignore_case), param(0)),
        Operator::Ne => format!("{} <> {}", col(ignore_case), param(0)),
        Operator::Gt | Operator::After => format!("{column} > {}", param(0)),
        Operator::Gte => format!("{column} >= {}", param(0)),
        Operator::Lt | Operator::Before => format!("{column} < {}", param(0)),
        Operator::Lte => format!("{column} <= {}", param(0)),
        Operator::Between => format!("{column} BETWEEN {} AND {}", param(0), param(1)),
        Operator::In => format!("{column} IN {}", param(0)),
        Operator::NotIn => format!("{column} NOT IN {}", param(0)),
        Operator::Containing => {
            format!("{} LIKE CONCAT('%', {}, '%')", col(ignore_case), param(0))
        }
        Operator::StartingWith => {
            format!("{} LIKE CONCAT({}, '%')", col(ignore_case), param(0))
        }
        Operator::EndingWith => {
            format!("{} LIKE CONCAT('%', {})", col(ignore_case), param(0))
        }
        Operator::Like => format!("{} LIKE {}", col(ignore_case), param(0)),
        Operator::NotLike => format!("{} NOT LIKE {}", col(ignore_case), param(0)),
        Operator::IsNull => format!("{column} IS NULL"),
        Operator::IsNotNull => format!("{column} IS NOT NULL"),
        Operator::True => format!("{column} = 1"),
        Operator::False => format!("{column} = 0"),
        Operator::Regex => format!("{column} REGEXP {}", param(0))
    }
}
