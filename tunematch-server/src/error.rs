//! Error types for tunematch-server
//!
//! Every pipeline failure maps onto one status code and one stable error code.

use crate::services::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Catalog has no songs (404)
    #[error("{0}")]
    EmptyCatalog(String),

    /// Catalog has songs but none could be compared (404)
    #[error("{0}")]
    NoMatch(String),

    /// Acquisition or feature extraction failed (502)
    #[error("{0}")]
    ExtractionFailed(String),

    /// Query fingerprint has the wrong width (500)
    #[error("{0}")]
    DimensionMismatch(String),

    /// Catalog could not be read (503)
    #[error("{0}")]
    CatalogUnavailable(String),

    /// Match found but the comparison could not be stored (500)
    #[error("{0}")]
    PersistenceFailed(String),
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::EmptyCatalog(_) => (StatusCode::NOT_FOUND, "EMPTY_CATALOG"),
            ApiError::NoMatch(_) => (StatusCode::NOT_FOUND, "NO_MATCH"),
            ApiError::ExtractionFailed(_) => (StatusCode::BAD_GATEWAY, "EXTRACTION_FAILED"),
            ApiError::DimensionMismatch(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DIMENSION_MISMATCH")
            }
            ApiError::CatalogUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "CATALOG_UNAVAILABLE")
            }
            ApiError::PersistenceFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILED")
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::InvalidInput(msg) => ApiError::BadRequest(msg),
            PipelineError::Extraction(_) => ApiError::ExtractionFailed(message),
            PipelineError::Dimension(_) => ApiError::DimensionMismatch(message),
            PipelineError::CatalogUnavailable(_) => ApiError::CatalogUnavailable(message),
            PipelineError::EmptyCatalog => ApiError::EmptyCatalog(message),
            PipelineError::NoMatch { .. } => ApiError::NoMatch(message),
            PipelineError::Persistence(_) => ApiError::PersistenceFailed(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
