// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Repository fingerprinting.
//!
//! A fingerprint is a SHA-256 over a canonical projection of one
//! repository's model: trait identity, entity identity, key type, methods,
//! properties, and relationships. Declaration-ordered lists feed the hash
//! in order — property order decides emitted column order, so it is
//! semantically meaningful — while set-like data (property roles) is
//! serialized sorted. Two models that would emit identical text hash
//! identically, which is what makes the driver cache safe.

use quote::ToTokens;
use sha2::{Digest, Sha256};

use crate::model::{EntityModel, Relationship, RepositoryModel};

/// Stable cache key for one repository's emitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepositoryFingerprint([u8; 32]);

impl RepositoryFingerprint {
    /// Hex form, for logs and debugging.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

fn feed(hasher: &mut Sha256, label: &str, value: &str) {
    hasher.update(label.as_bytes());
    hasher.update([0x1f]);
    hasher.update(value.as_bytes());
    hasher.update([0x1e]);
}

/// Fingerprint one repository against its entity model.
pub fn fingerprint(
    repository: &RepositoryModel,
    entity: &EntityModel
) -> RepositoryFingerprint {
    let mut hasher = Sha256::new();

    feed(&mut hasher, "repository", &repository.qualified_name);
    feed(&mut hasher, "namespace", &repository.namespace);
    feed(&mut hasher, "entity", &entity.qualified_name);
    feed(&mut hasher, "key", &repository.key_type_text());
    feed(&mut hasher, "table", &entity.table.qualified());

    for method in &repository.user_methods {
        feed(
            &mut hasher,
            "method",
            &method.signature.to_token_stream().to_string()
        );
        feed(&mut hasher, "query", &format!("{:?}", method.query));
        feed(&mut hasher, "proc", &format!("{:?}", method.stored_procedure));
        feed(&mut hasher, "multi", &format!("{:?}", method.multi_mapping));
        feed(&mut hasher, "bulk", &format!("{:?}", method.bulk));
    }

    for property in &entity.properties {
        feed(&mut hasher, "property", &property.name);
        feed(&mut hasher, "type", &property.ty.to_token_stream().to_string());
        feed(&mut hasher, "column", &format!("{:?}", property.column));
        // Roles live in an ordered set; iteration is already canonical.
        feed(&mut hasher, "roles", &format!("{:?}", property.roles));
        feed(&mut hasher, "nullable", &property.nullable.to_string());
    }

    for relationship in &entity.relationships {
        feed(&mut hasher, "relationship", &relationship_projection(relationship));
    }

    RepositoryFingerprint(Sha256::finalize(hasher).into())
}

fn relationship_projection(relationship: &Relationship) -> String {
    format!("{relationship:?}")
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;
    use crate::{diagnostics::DiagnosticSink, model::extract};

    fn models(source: syn::File) -> (EntityModel, RepositoryModel) {
        let sink = DiagnosticSink::new();
        let (entities, mut repositories) = extract(&source.items, "domain", &sink);
        let repository = repositories.remove(0);
        let entity = entities.get(&repository.entity).unwrap().clone();
        (entity, repository)
    }

    fn sample() -> syn::File {
        parse_quote! {
            #[entity]
            pub struct User {
                #[id]
                pub id: i64,
                pub email: String,
            }

            #[repository]
            pub trait UserRepository: CrudRepository<User, i64> {
                async fn find_by_email(&self, email: String) -> RepoResult<Option<User>>;
            }
        }
    }

    #[test]
    fn identical_models_hash_identically() {
        let (entity_a, repository_a) = models(sample());
        let (entity_b, repository_b) = models(sample());
        assert_eq!(
            fingerprint(&repository_a, &entity_a),
            fingerprint(&repository_b, &entity_b)
        );
    }

    #[test]
    fn property_order_is_significant() {
        let (entity_a, repository_a) = models(sample());
        let (entity_b, repository_b) = models(parse_quote! {
            #[entity]
            pub struct User {
                pub email: String,
                #[id]
                pub id: i64,
            }

            #[repository]
            pub trait UserRepository: CrudRepository<User, i64> {
                async fn find_by_email(&self, email: String) -> RepoResult<Option<User>>;
            }
        });
        assert_ne!(
            fingerprint(&repository_a, &entity_a),
            fingerprint(&repository_b, &entity_b)
        );
    }

    #[test]
    fn method_change_changes_the_fingerprint() {
        let (entity_a, repository_a) = models(sample());
        let (entity_b, repository_b) = models(parse_quote! {
            #[entity]
            pub struct User {
                #[id]
                pub id: i64,
                pub email: String,
            }

            #[repository]
            pub trait UserRepository: CrudRepository<User, i64> {
                async fn find_by_email(&self, email: String) -> RepoResult<Vec<User>>;
            }
        });
        assert_ne!(
            fingerprint(&repository_a, &entity_a),
            fingerprint(&repository_b, &entity_b)
        );
    }

    #[test]
    fn hex_form_is_stable_width() {
        let (entity, repository) = models(sample());
        assert_eq!(fingerprint(&repository, &entity).to_hex().len(), 64);
    }
}
