// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Compile-time repository code generation.
//!
//! repogen-codegen is a small compiler: it consumes entity structs and
//! repository traits tagged with declarative mapping attributes and
//! produces, as `(hint_name, source_text)` pairs, the source artifacts a
//! host build hands to rustc — concrete repository implementations
//! executing SQL against the `repogen_core::SqlSession` facade, companion
//! extension traits with graph-derived methods, bidirectional relationship
//! helpers, and an entity metadata provider.
//!
//! # Pipeline
//!
//! | Stage | Module | Role |
//! |-------|--------|------|
//! | Attribute reading | [`attrs`] | Structured values out of mapping attributes |
//! | Metadata extraction | [`model`] | `EntityModel` / `RepositoryModel` from declarations |
//! | Method-name parsing | [`method_name`] | Derived-query DSL → resolved `Intent` |
//! | CPQL translation | [`cpql`] | Entity-oriented queries → SQL with `@name` params |
//! | Planning | [`planner`] | Relationship graph → per-method plans |
//! | SQL templating | [`sql`] | Statement fragments from structured input |
//! | Emission | [`emit`] | Plans → formatted source text |
//! | Driving | [`driver`] | Orchestration and the per-repository cache |
//!
//! # Example
//!
//! ```rust
//! use repogen_codegen::Generator;
//!
//! let output = Generator::new()
//!     .run_source(
//!         r#"
//!         #[entity]
//!         pub struct User {
//!             #[id]
//!             pub id: i64,
//!             #[column("email")]
//!             pub email: String,
//!         }
//!
//!         #[repository]
//!         pub trait UserRepository: CrudRepository<User, i64> {
//!             async fn find_by_email(&self, email: String) -> RepoResult<Option<User>>;
//!         }
//!         "#,
//!         "domain"
//!     )
//!     .expect("valid declarations");
//! assert!(output.diagnostics.is_empty());
//! assert_eq!(output.files.len(), 3);
//! ```
//!
//! Nothing here performs I/O; translation is CPU-bound text manipulation,
//! and every failure surfaces as a coded diagnostic instead of aborting the
//! compilation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attrs;
pub mod cpql;
pub mod diagnostics;
pub mod driver;
pub mod emit;
pub mod fingerprint;
pub mod method_name;
pub mod model;
pub mod planner;
pub mod sql;

pub use diagnostics::{Code, Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
pub use driver::{Generator, GeneratorOutput};
pub use emit::GeneratedFile;
pub use fingerprint::{RepositoryFingerprint, fingerprint};
