// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! A derived-query method naming an unknown property must fail to compile.

use repogen::prelude::*;

#[persistence_unit]
mod domain {
    use repogen::prelude::*;

    #[entity]
    pub struct User {
        #[id]
        pub id: i64,
        pub email: String,
    }

    #[repository]
    pub trait UserRepository: CrudRepository<User, i64> {
        async fn find_by_nickname(&self, nickname: String) -> RepoResult<Vec<User>>;
    }
}

fn main() {}
