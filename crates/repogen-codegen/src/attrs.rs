// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Attribute reading.
//!
//! The reader pulls structured values out of the mapping attributes attached
//! to declarations. It is a pure function of the declaration plus the
//! attribute schema: no global state, no I/O.
//!
//! Two layers:
//!
//! - [`AttributeArgs`] — the generic shape: positional arguments indexed by
//!   position, named arguments looked up case-sensitively.
//! - Typed structs ([`ColumnArgs`], [`JoinColumnArgs`], …) — built over the
//!   named remainder with `darling::FromMeta`, with positional arguments
//!   spliced in by the reader.
//!
//! Absent attribute ⇒ `None`. An argument of the wrong type produces a
//! schema diagnostic and the attribute reads as absent. Unknown named
//! arguments are warnings, not errors.

use darling::{FromMeta, ast::NestedMeta};
use syn::{Attribute, Expr, ExprLit, Lit, Meta};

use crate::diagnostics::{Code, Diagnostic, DiagnosticSink};

/// Mapping attributes the generator recognises.
pub const KNOWN_ATTRIBUTES: &[&str] = &[
    "entity",
    "table",
    "repository",
    "id",
    "generated_value",
    "column",
    "many_to_one",
    "one_to_one",
    "one_to_many",
    "many_to_many",
    "join_column",
    "join_table",
    "query",
    "stored_procedure",
    "multi_mapping",
    "bulk_operation",
];

/// Host-language attributes that are not ours and never warned about.
const BUILTIN_ATTRIBUTES: &[&str] = &[
    "doc",
    "derive",
    "allow",
    "warn",
    "deny",
    "expect",
    "cfg",
    "cfg_attr",
    "must_use",
    "non_exhaustive",
    "inline",
    "serde",
    "automatically_derived",
];

/// A single attribute argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// String literal.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Boolean literal or bare flag.
    Bool(bool)
}

impl AttrValue {
    fn from_lit(lit: &Lit) -> Option<Self> {
        match lit {
            Lit::Str(s) => Some(Self::Str(s.value())),
            Lit::Int(i) => i.base10_parse().ok().map(Self::Int),
            Lit::Float(f) => f.base10_parse().ok().map(Self::Float),
            Lit::Bool(b) => Some(Self::Bool(b.value)),
            _ => None
        }
    }

    /// String payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None
        }
    }

    /// Integer payload, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None
        }
    }

    /// Boolean payload, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None
        }
    }
}

/// Structured arguments of one attribute occurrence.
///
/// Positional arguments are the leading literal arguments, in order. Named
/// arguments (`name = value` pairs and bare flags) are looked up by
/// identifier, case-sensitively.
#[derive(Debug, Default)]
pub struct AttributeArgs {
    /// Leading literal arguments in source order.
    pub positional: Vec<AttrValue>,
    /// Named arguments, case-sensitive.
    pub named: Vec<(String, AttrValue)>,
    /// Named arguments in raw meta form, for the darling typed layer.
    named_metas: Vec<NestedMeta>
}

impl AttributeArgs {
    /// Read the arguments of `name` from an attribute list.
    ///
    /// Returns `None` when the attribute is absent, or when its argument
    /// list is malformed (a diagnostic is recorded in that case).
    pub fn read(
        attrs: &[Attribute],
        name: &str,
        sink: &DiagnosticSink,
        location: &str
    ) -> Option<Self> {
        let attr = attrs.iter().find(|a| a.path().is_ident(name))?;
        match Self::parse(attr) {
            Ok(args) => Some(args),
            Err(message) => {
                sink.push(Diagnostic::error(
                    Code::AttributeType,
                    location,
                    format!("malformed #[{name}] attribute: {message}")
                ));
                None
            }
        }
    }

    /// Whether a bare marker attribute (`#[id]`) is present.
    pub fn present(attrs: &[Attribute], name: &str) -> bool {
        attrs.iter().any(|a| a.path().is_ident(name))
    }

    fn parse(attr: &Attribute) -> Result<Self, String> {
        let mut args = Self::default();
        let list = match &attr.meta {
            Meta::Path(_) => return Ok(args),
            Meta::List(list) => list,
            Meta::NameValue(_) => return Err("expected #[name(...)] form".to_owned())
        };
        let nested =
            NestedMeta::parse_meta_list(list.tokens.clone()).map_err(|e| e.to_string())?;
        for item in nested {
            match item {
                NestedMeta::Lit(lit) => {
                    let value = AttrValue::from_lit(&lit)
                        .ok_or_else(|| "unsupported literal kind".to_owned())?;
                    args.positional.push(value);
                }
                NestedMeta::Meta(meta) => {
                    let key = meta
                        .path()
                        .get_ident()
                        .map(|i| i.to_string())
                        .ok_or_else(|| "expected an identifier argument".to_owned())?;
                    let value = match &meta {
                        Meta::Path(_) => AttrValue::Bool(true),
                        Meta::NameValue(nv) => match &nv.value {
                            Expr::Lit(ExprLit { lit, .. }) => AttrValue::from_lit(lit)
                                .ok_or_else(|| format!("unsupported value for `{key}`"))?,
                            _ => return Err(format!("non-literal value for `{key}`"))
                        },
                        Meta::List(_) => {
                            return Err(format!("nested list value for `{key}` is not supported"));
                        }
                    };
                    args.named.push((key, value));
                    args.named_metas.push(NestedMeta::Meta(meta));
                }
            }
        }
        Ok(args)
    }

    /// Case-sensitive named lookup.
    pub fn named(&self, key: &str) -> Option<&AttrValue> {
        self.named
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Positional string at `index`.
    pub fn positional_str(&self, index: usize) -> Option<String> {
        self.positional
            .get(index)
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    }

    /// Warn about named arguments outside `known`.
    fn warn_unknown(&self, known: &[&str], attr: &str, sink: &DiagnosticSink, location: &str) {
        for (key, _) in &self.named {
            if !known.contains(&key.as_str()) {
                sink.push(Diagnostic::warning(
                    Code::UnknownAttribute,
                    location,
                    format!("unknown argument `{key}` on #[{attr}] is ignored")
                ));
            }
        }
    }

    fn typed<T: FromMeta + Default>(
        &self,
        attr: &str,
        known: &[&str],
        sink: &DiagnosticSink,
        location: &str
    ) -> Option<T> {
        self.warn_unknown(known, attr, sink, location);
        let metas: Vec<NestedMeta> = self
            .named_metas
            .iter()
            .filter(|meta| match meta {
                NestedMeta::Meta(m) => m
                    .path()
                    .get_ident()
                    .map(|i| known.contains(&i.to_string().as_str()))
                    .unwrap_or(false),
                NestedMeta::Lit(_) => false
            })
            .cloned()
            .collect();
        match T::from_list(&metas) {
            Ok(value) => Some(value),
            Err(err) => {
                sink.push(Diagnostic::error(
                    Code::AttributeType,
                    location,
                    format!("bad argument on #[{attr}]: {err}")
                ));
                None
            }
        }
    }
}

/// Warn about non-builtin attributes outside the mapping schema.
pub fn warn_unknown_attributes(attrs: &[Attribute], sink: &DiagnosticSink, location: &str) {
    for attr in attrs {
        let Some(ident) = attr.path().get_ident() else {
            continue;
        };
        let name = ident.to_string();
        if !KNOWN_ATTRIBUTES.contains(&name.as_str())
            && !BUILTIN_ATTRIBUTES.contains(&name.as_str())
        {
            sink.push(Diagnostic::warning(
                Code::UnknownAttribute,
                location,
                format!("attribute #[{name}] is not a mapping attribute and is ignored")
            ));
        }
    }
}

macro_rules! typed_reader {
    ($(#[$doc:meta])* $name:ident, $attr:literal, $named_ty:ident, known = [$($known:literal),* $(,)?]) => {
        $(#[$doc])*
        impl $name {
            /// Read this attribute from a declaration's attribute list.
            pub fn read(
                attrs: &[Attribute],
                sink: &DiagnosticSink,
                location: &str
            ) -> Option<Self> {
                let args = AttributeArgs::read(attrs, $attr, sink, location)?;
                let named: $named_ty = args.typed($attr, &[$($known),*], sink, location)?;
                Some(Self::assemble(&args, named))
            }
        }
    };
}

/// `#[table("name", schema = "...")]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableArgs {
    /// Table name; positional or named `name`.
    pub name:   Option<String>,
    /// Schema qualifier.
    pub schema: Option<String>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct TableNamed {
    name:   Option<String>,
    schema: Option<String>
}

impl TableArgs {
    fn assemble(args: &AttributeArgs, named: TableNamed) -> Self {
        Self {
            name:   args.positional_str(0).or(named.name),
            schema: named.schema
        }
    }
}

typed_reader!(TableArgs, "table", TableNamed, known = ["name", "schema"]);

/// `#[generated_value(strategy = "...")]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedValueArgs {
    /// Generation strategy; `identity` when unspecified.
    pub strategy: Option<String>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct GeneratedValueNamed {
    strategy: Option<String>
}

impl GeneratedValueArgs {
    fn assemble(_args: &AttributeArgs, named: GeneratedValueNamed) -> Self {
        Self {
            strategy: named.strategy
        }
    }
}

typed_reader!(
    GeneratedValueArgs,
    "generated_value",
    GeneratedValueNamed,
    known = ["strategy"]
);

/// `#[column("name", ...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnArgs {
    /// Column name; positional or named `name`.
    pub name:      Option<String>,
    /// Explicit SQL type.
    pub sql_type:  Option<String>,
    /// Text length.
    pub length:    Option<u32>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale:     Option<u32>,
    /// NULL-ability override.
    pub nullable:  Option<bool>,
    /// UNIQUE constraint.
    pub unique:    Option<bool>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct ColumnNamed {
    name:      Option<String>,
    sql_type:  Option<String>,
    length:    Option<u32>,
    precision: Option<u32>,
    scale:     Option<u32>,
    nullable:  Option<bool>,
    unique:    Option<bool>
}

impl ColumnArgs {
    fn assemble(args: &AttributeArgs, named: ColumnNamed) -> Self {
        Self {
            name:      args.positional_str(0).or(named.name),
            sql_type:  named.sql_type,
            length:    named.length,
            precision: named.precision,
            scale:     named.scale,
            nullable:  named.nullable,
            unique:    named.unique
        }
    }
}

typed_reader!(
    ColumnArgs,
    "column",
    ColumnNamed,
    known = ["name", "sql_type", "length", "precision", "scale", "nullable", "unique"]
);

/// `#[many_to_one(...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManyToOneArgs {
    /// Cascade specification (informational).
    pub cascade:  Option<String>,
    /// Fetch mode (informational).
    pub fetch:    Option<String>,
    /// Whether the association may be absent; defaults to `true`.
    pub optional: Option<bool>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct ManyToOneNamed {
    cascade:  Option<String>,
    fetch:    Option<String>,
    optional: Option<bool>
}

impl ManyToOneArgs {
    fn assemble(_args: &AttributeArgs, named: ManyToOneNamed) -> Self {
        Self {
            cascade:  named.cascade,
            fetch:    named.fetch,
            optional: named.optional
        }
    }
}

typed_reader!(
    ManyToOneArgs,
    "many_to_one",
    ManyToOneNamed,
    known = ["cascade", "fetch", "optional"]
);

/// `#[one_to_one(...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneToOneArgs {
    /// Inverse-side property on the target.
    pub mapped_by:      Option<String>,
    /// Cascade specification (informational).
    pub cascade:        Option<String>,
    /// Fetch mode (informational).
    pub fetch:          Option<String>,
    /// Orphan removal flag.
    pub orphan_removal: Option<bool>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct OneToOneNamed {
    mapped_by:      Option<String>,
    cascade:        Option<String>,
    fetch:          Option<String>,
    orphan_removal: Option<bool>
}

impl OneToOneArgs {
    fn assemble(_args: &AttributeArgs, named: OneToOneNamed) -> Self {
        Self {
            mapped_by:      named.mapped_by,
            cascade:        named.cascade,
            fetch:          named.fetch,
            orphan_removal: named.orphan_removal
        }
    }
}

typed_reader!(
    OneToOneArgs,
    "one_to_one",
    OneToOneNamed,
    known = ["mapped_by", "cascade", "fetch", "orphan_removal"]
);

/// `#[one_to_many("mapped_by", ...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneToManyArgs {
    /// Owning property on the target; positional or named.
    pub mapped_by:      Option<String>,
    /// Cascade specification (informational).
    pub cascade:        Option<String>,
    /// Fetch mode (informational).
    pub fetch:          Option<String>,
    /// Orphan removal flag.
    pub orphan_removal: Option<bool>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct OneToManyNamed {
    mapped_by:      Option<String>,
    cascade:        Option<String>,
    fetch:          Option<String>,
    orphan_removal: Option<bool>
}

impl OneToManyArgs {
    fn assemble(args: &AttributeArgs, named: OneToManyNamed) -> Self {
        Self {
            mapped_by:      args.positional_str(0).or(named.mapped_by),
            cascade:        named.cascade,
            fetch:          named.fetch,
            orphan_removal: named.orphan_removal
        }
    }
}

typed_reader!(
    OneToManyArgs,
    "one_to_many",
    OneToManyNamed,
    known = ["mapped_by", "cascade", "fetch", "orphan_removal"]
);

/// `#[many_to_many(...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManyToManyArgs {
    /// Owning property on the target for the inverse side.
    pub mapped_by: Option<String>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct ManyToManyNamed {
    mapped_by: Option<String>
}

impl ManyToManyArgs {
    fn assemble(_args: &AttributeArgs, named: ManyToManyNamed) -> Self {
        Self {
            mapped_by: named.mapped_by
        }
    }
}

typed_reader!(
    ManyToManyArgs,
    "many_to_many",
    ManyToManyNamed,
    known = ["mapped_by"]
);

/// `#[join_column("name", ...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinColumnArgs {
    /// Foreign-key column name; positional or named.
    pub name:              Option<String>,
    /// Referenced column on the target table.
    pub referenced_column: Option<String>,
    /// NULL-ability of the column.
    pub nullable:          Option<bool>,
    /// UNIQUE constraint.
    pub unique:            Option<bool>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct JoinColumnNamed {
    name:              Option<String>,
    referenced_column: Option<String>,
    nullable:          Option<bool>,
    unique:            Option<bool>
}

impl JoinColumnArgs {
    fn assemble(args: &AttributeArgs, named: JoinColumnNamed) -> Self {
        Self {
            name:              args.positional_str(0).or(named.name),
            referenced_column: named.referenced_column,
            nullable:          named.nullable,
            unique:            named.unique
        }
    }
}

typed_reader!(
    JoinColumnArgs,
    "join_column",
    JoinColumnNamed,
    known = ["name", "referenced_column", "nullable", "unique"]
);

/// `#[join_table("name", ...)]` arguments.
///
/// Column lists are comma-separated strings:
/// `join_columns = "order_id"`, `inverse_join_columns = "tag_id"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinTableArgs {
    /// Join table name; positional or named.
    pub name:                 Option<String>,
    /// Schema qualifier.
    pub schema:               Option<String>,
    /// Columns referencing the owner, comma-separated.
    pub join_columns:         Vec<String>,
    /// Columns referencing the target, comma-separated.
    pub inverse_join_columns: Vec<String>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct JoinTableNamed {
    name:                 Option<String>,
    schema:               Option<String>,
    join_columns:         Option<String>,
    inverse_join_columns: Option<String>
}

fn split_columns(list: Option<String>) -> Vec<String> {
    list.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

impl JoinTableArgs {
    fn assemble(args: &AttributeArgs, named: JoinTableNamed) -> Self {
        Self {
            name:                 args.positional_str(0).or(named.name),
            schema:               named.schema,
            join_columns:         split_columns(named.join_columns),
            inverse_join_columns: split_columns(named.inverse_join_columns)
        }
    }
}

typed_reader!(
    JoinTableArgs,
    "join_table",
    JoinTableNamed,
    known = ["name", "schema", "join_columns", "inverse_join_columns"]
);

/// `#[query("...", ...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArgs {
    /// Query string; positional or named `sql`.
    pub sql:      Option<String>,
    /// Skip CPQL translation and pass the string through.
    pub native:   Option<bool>,
    /// Command timeout in seconds (informational).
    pub timeout:  Option<u32>,
    /// Whether results are buffered (informational).
    pub buffered: Option<bool>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct QueryNamed {
    sql:      Option<String>,
    native:   Option<bool>,
    timeout:  Option<u32>,
    buffered: Option<bool>
}

impl QueryArgs {
    fn assemble(args: &AttributeArgs, named: QueryNamed) -> Self {
        Self {
            sql:      args.positional_str(0).or(named.sql),
            native:   named.native,
            timeout:  named.timeout,
            buffered: named.buffered
        }
    }
}

typed_reader!(
    QueryArgs,
    "query",
    QueryNamed,
    known = ["sql", "native", "timeout", "buffered"]
);

/// `#[stored_procedure("name", ...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredProcedureArgs {
    /// Procedure name; positional or named.
    pub procedure_name: Option<String>,
    /// Schema qualifier.
    pub schema:         Option<String>,
    /// Command timeout in seconds (informational).
    pub timeout:        Option<u32>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct StoredProcedureNamed {
    procedure_name: Option<String>,
    schema:         Option<String>,
    timeout:        Option<u32>
}

impl StoredProcedureArgs {
    fn assemble(args: &AttributeArgs, named: StoredProcedureNamed) -> Self {
        Self {
            procedure_name: args.positional_str(0).or(named.procedure_name),
            schema:         named.schema,
            timeout:        named.timeout
        }
    }
}

typed_reader!(
    StoredProcedureArgs,
    "stored_procedure",
    StoredProcedureNamed,
    known = ["procedure_name", "schema", "timeout"]
);

/// `#[multi_mapping("key", ...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMappingArgs {
    /// Key property used to group split rows; positional or named.
    pub key_property: Option<String>,
    /// Comma-separated column list the row splits on.
    pub split_on:     Vec<String>,
    /// Comma-separated list of mapped type names.
    pub map_types:    Vec<String>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct MultiMappingNamed {
    key_property: Option<String>,
    split_on:     Option<String>,
    map_types:    Option<String>
}

impl MultiMappingArgs {
    fn assemble(args: &AttributeArgs, named: MultiMappingNamed) -> Self {
        Self {
            key_property: args.positional_str(0).or(named.key_property),
            split_on:     split_columns(named.split_on),
            map_types:    split_columns(named.map_types)
        }
    }
}

typed_reader!(
    MultiMappingArgs,
    "multi_mapping",
    MultiMappingNamed,
    known = ["key_property", "split_on", "map_types"]
);

/// `#[bulk_operation(...)]` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOperationArgs {
    /// Statements per batch; defaults to 100.
    pub batch_size:      Option<u32>,
    /// Whether to wrap the batches in a transaction; defaults to `true`.
    pub use_transaction: Option<bool>,
    /// Command timeout in seconds (informational).
    pub timeout:         Option<u32>
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct BulkOperationNamed {
    batch_size:      Option<u32>,
    use_transaction: Option<bool>,
    timeout:         Option<u32>
}

impl BulkOperationArgs {
    fn assemble(_args: &AttributeArgs, named: BulkOperationNamed) -> Self {
        Self {
            batch_size:      named.batch_size,
            use_transaction: named.use_transaction,
            timeout:         named.timeout
        }
    }
}

typed_reader!(
    BulkOperationArgs,
    "bulk_operation",
    BulkOperationNamed,
    known = ["batch_size", "use_transaction", "timeout"]
);
