//! Database initialization and table schemas

pub mod init;

pub use init::*;
