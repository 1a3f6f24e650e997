// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! An entity with no #[id] property must fail to compile.

use repogen::persistence_unit;

#[persistence_unit]
mod domain {
    #[entity]
    pub struct User {
        pub email: String,
    }
}

fn main() {}
