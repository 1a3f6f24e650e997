// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! A single entity and repository with a name-derived finder.

use repogen::prelude::*;

#[persistence_unit]
mod domain {
    use repogen::prelude::*;

    #[entity]
    #[derive(Debug, Clone)]
    pub struct User {
        #[id]
        #[generated_value]
        pub id: i64,
        #[column("email", unique = true)]
        pub email: String,
        pub active: bool,
    }

    #[repository]
    pub trait UserRepository: CrudRepository<User, i64> {
        async fn find_by_email(&self, email: String) -> RepoResult<Option<User>>;
        async fn find_by_active_true(&self) -> RepoResult<Vec<User>>;
        async fn count_by_active_false(&self) -> RepoResult<i64>;
    }
}

fn _assert_surfaces<S: repogen_core::SqlSession>() {
    fn user_repo<T: domain::UserRepository>() {}
    fn user_ext<T: domain::UserRepositoryExt>() {}
    fn crud<T: repogen_core::CrudRepository<domain::User, i64>>() {}
    user_repo::<domain::UserRepositoryImpl<S>>();
    user_ext::<domain::UserRepositoryImpl<S>>();
    crud::<domain::UserRepositoryImpl<S>>();
}

fn _metadata_is_queryable() {
    use repogen_core::MetadataProvider;
    let provider = domain::GeneratedMetadataProvider;
    let _ = provider.get::<domain::User>();
    let _ = provider.is_entity(std::any::TypeId::of::<domain::User>());
    let _ = provider.all();
}

fn main() {}
