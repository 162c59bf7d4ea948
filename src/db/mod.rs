//! Database module: row mapping and the SQL repository.
//!
//! - `model`: column lists and row decoders.
//! - `repo`: the `Store`, the only type that issues SQL against the catalog.
//!
//! Callers import from `author_site::db`.

pub mod model;
pub mod repo;

pub use repo::{init_pool, run_migrations, Pool, Store, MAX_LIST_LIMIT};
