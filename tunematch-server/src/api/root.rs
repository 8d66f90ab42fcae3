//! Service banner

use axum::{routing::get, Router};

use crate::AppState;

/// GET /
pub async fn banner() -> String {
    format!(
        "tunematch-server {} ({}, {} build, built {})\n",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP"),
    )
}

pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(banner))
}
