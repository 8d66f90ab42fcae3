//! Database access for tunematch-server
//!
//! Pool creation and schema live in `tunematch_common::db`; this module owns
//! the catalog queries.

pub mod catalog;

pub use catalog::{CatalogStore, ComparisonRecord, SqliteCatalog};
