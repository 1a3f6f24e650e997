// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! An entity with two #[id] properties must fail to compile.

use repogen::persistence_unit;

#[persistence_unit]
mod domain {
    #[entity]
    pub struct Item {
        #[id]
        pub id: i64,
        #[id]
        pub code: i64,
    }
}

fn main() {}
