// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

#![warn(missing_docs)]

//! # repogen
//!
//! One crate, all pieces. Re-exports:
//! - [`persistence_unit`] attribute macro from `repogen-macros`
//! - All runtime types from `repogen-core` ([`SqlSession`], [`CrudRepository`],
//!   [`Pagination`], [`MetadataProvider`], …)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use repogen::prelude::*;
//!
//! #[persistence_unit]
//! mod domain {
//!     use repogen::prelude::*;
//!
//!     #[entity]
//!     pub struct User {
//!         #[id]
//!         #[generated_value]
//!         pub id: i64,
//!         #[column("email", unique = true)]
//!         pub email: String,
//!     }
//!
//!     #[repository]
//!     pub trait UserRepository: CrudRepository<User, i64> {
//!         async fn find_by_email(&self, email: String) -> RepoResult<Option<User>>;
//!     }
//! }
//!
//! // `domain::UserRepositoryImpl::new(session)` now implements
//! // `UserRepository`, `UserRepositoryExt`, and `CrudRepository<User, i64>`.
//! ```
//!
//! The consuming crate depends on `repogen-core` directly: generated code
//! references it by its own name, the same way derive output references the
//! crates it binds to.

// Re-export all core types
pub use repogen_core::*;
// Re-export the host-adapter macro
pub use repogen_macros::persistence_unit;

/// Convenient re-exports for persistence modules.
pub mod prelude {
    pub use repogen_core::prelude::*;
    pub use repogen_macros::persistence_unit;
}
