//! # tunematch common library
//!
//! Shared code for the tunematch crates:
//! - Error type
//! - Layered configuration loading (root folder, TOML file)
//! - SQLite initialization and table schemas

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
