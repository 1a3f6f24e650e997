// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Pipeline driver and caching.
//!
//! One [`Generator`] run per compilation trigger: extract the model, then
//! per repository — fingerprint, cache probe, plan, emit — and finally the
//! compilation-wide artifacts (relationship helpers, metadata provider).
//!
//! The fingerprint cache is process-wide and survives runs; a hit replays
//! the repository's artifacts *and* its recorded diagnostics. Insertion is
//! last-writer-wins — any two producers agreeing on a fingerprint produce
//! identical text. Each repository plans into its own diagnostic buffer,
//! merged into the run's sink afterwards, so fan-out never interleaves
//! messages.
//!
//! For a given input, two runs produce byte-identical output: every
//! iteration follows declaration order, and nothing string-building reads
//! from an unordered map.

use std::{
    collections::HashMap,
    sync::{
        Arc, LazyLock, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering}
    }
};

use crate::{
    diagnostics::{Diagnostic, DiagnosticSink},
    emit::{
        GeneratedFile, emit_extensions, emit_implementation, emit_metadata_provider,
        emit_relationship_helpers
    },
    fingerprint::{RepositoryFingerprint, fingerprint},
    model::extract,
    planner::plan_repository
};

/// Everything one run hands back to the host build.
#[derive(Debug, Default)]
pub struct GeneratorOutput {
    /// `(hint_name, source_text)` artifacts, in deterministic order.
    pub files:       Vec<GeneratedFile>,
    /// Accumulated diagnostics, in deterministic order.
    pub diagnostics: Vec<Diagnostic>
}

/// One repository's cached result: artifacts plus the diagnostics its
/// planning produced, replayed on every hit.
#[derive(Debug, Clone)]
struct CachedRepository {
    files:       Vec<GeneratedFile>,
    diagnostics: Vec<Diagnostic>
}

static CACHE: LazyLock<Mutex<HashMap<RepositoryFingerprint, CachedRepository>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Pipeline driver.
///
/// Stateless apart from an optional cancellation flag checked between
/// repositories; hosts cancelling a compilation set the flag and the run
/// returns what it has.
#[derive(Debug, Default, Clone)]
pub struct Generator {
    cancel: Option<Arc<AtomicBool>>
}

impl Generator {
    /// A generator without cancellation support.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a host-owned cancellation flag.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Run the pipeline over already-parsed declarations.
    ///
    /// `namespace` is the module path the declarations live in; it scopes
    /// qualified names and fingerprints.
    pub fn run_items(&self, items: &[syn::Item], namespace: &str) -> GeneratorOutput {
        let sink = DiagnosticSink::new();
        let (entities, repositories) = extract(items, namespace, &sink);

        let mut files = Vec::new();
        for repository in &repositories {
            if self.cancelled() {
                break;
            }
            let Some(entity) = entities.get(&repository.entity) else {
                continue;
            };
            let key = fingerprint(repository, entity);

            let cached = {
                let cache = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
                cache.get(&key).cloned()
            };
            let result = match cached {
                Some(result) => result,
                None => {
                    let buffer = DiagnosticSink::new();
                    let mut repo_files = Vec::new();
                    if let Some(plan) = plan_repository(repository, &entities, &buffer) {
                        repo_files.extend(emit_extensions(&plan, &buffer));
                        repo_files.extend(emit_implementation(&plan, &buffer));
                    }
                    let result = CachedRepository {
                        files:       repo_files,
                        diagnostics: buffer.into_vec()
                    };
                    CACHE
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(key, result.clone());
                    result
                }
            };

            for diagnostic in result.diagnostics {
                sink.push(diagnostic);
            }
            files.extend(result.files);
        }

        if !self.cancelled() {
            files.extend(emit_relationship_helpers(&entities, &sink));
            files.extend(emit_metadata_provider(&entities, &sink));
        }

        GeneratorOutput {
            files,
            diagnostics: sink.into_vec()
        }
    }

    /// Parse a compilation unit's source text and run the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the source is not valid declarations;
    /// everything past parsing reports through diagnostics instead.
    pub fn run_source(&self, source: &str, namespace: &str) -> Result<GeneratorOutput, syn::Error> {
        let file: syn::File = syn::parse_str(source)?;
        Ok(self.run_items(&file.items, namespace))
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn unit() -> Vec<syn::Item> {
        let file: syn::File = parse_quote! {
            #[entity]
            pub struct Customer {
                #[id]
                pub id: i32,
                pub name: String,
                #[one_to_many("customer")]
                pub orders: Vec<Order>,
            }

            #[entity]
            #[table("orders")]
            pub struct Order {
                #[id]
                pub id: i32,
                pub total: f64,
                #[many_to_one]
                #[join_column("customer_id")]
                pub customer: Option<Customer>,
                pub customer_id: i32,
            }

            #[repository]
            pub trait OrderRepository: CrudRepository<Order, i32> {
                async fn find_by_customer_id(&self, customer_id: i32) -> RepoResult<Vec<Order>>;
            }
        };
        file.items
    }

    #[test]
    fn run_emits_all_artifact_kinds() {
        let output = Generator::new().run_items(&unit(), "domain");
        let names: Vec<&str> = output.files.iter().map(|f| f.hint_name.as_str()).collect();
        assert!(names.contains(&"order_repository_ext.g.rs"));
        assert!(names.contains(&"order_repository_impl.g.rs"));
        assert!(names.contains(&"customer_relationship_helper.g.rs"));
        assert!(names.contains(&"order_relationship_helper.g.rs"));
        assert!(names.contains(&"generated_metadata_provider.g.rs"));
    }

    #[test]
    fn identical_runs_are_byte_identical() {
        let generator = Generator::new();
        let first = generator.run_items(&unit(), "domain");
        let second = generator.run_items(&unit(), "domain");
        assert_eq!(first.files, second.files);
        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn cache_hits_replay_diagnostics() {
        let items: Vec<syn::Item> = {
            let file: syn::File = parse_quote! {
                #[entity]
                pub struct User {
                    #[id]
                    pub id: i64,
                }

                #[repository]
                pub trait UserRepository: CrudRepository<User, i64> {
                    async fn find_by_ghost(&self, ghost: String) -> RepoResult<Vec<User>>;
                }
            };
            file.items
        };
        let generator = Generator::new();
        let first = generator.run_items(&items, "replay");
        let second = generator.run_items(&items, "replay");
        assert!(!first.diagnostics.is_empty());
        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn cancelled_run_stops_between_repositories() {
        let flag = Arc::new(AtomicBool::new(true));
        let generator = Generator::new().with_cancel_flag(flag);
        let output = generator.run_items(&unit(), "cancelled");
        assert!(output.files.is_empty());
    }

    #[test]
    fn run_source_reports_parse_failures() {
        assert!(Generator::new().run_source("not rust at all {{{", "x").is_err());
    }
}
