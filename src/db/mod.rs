//! Database module: insert payloads and SQL repositories.
//!
//! - `model`: field sets accepted by the insert functions.
//! - `repo`: SQL-only functions that map rows into `crate::model` entities.
//!
//! Callers import from `visual_engine::db`; the repository API is re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{NewClient, NewPost};
