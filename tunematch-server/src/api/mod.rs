//! HTTP API handlers for tunematch-server

pub mod compare;
pub mod health;
pub mod root;

pub use compare::{compare_routes, CompareBody, CompareResponse};
pub use health::{health_routes, HealthResponse};
pub use root::root_routes;
