//! Comparison endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::services::CompareRequest;
use crate::types::PitchClass;
use crate::AppState;

/// POST /music/compare request body
#[derive(Debug, Deserialize)]
pub struct CompareBody {
    #[serde(default)]
    pub user_uid: String,
    #[serde(default, alias = "source_url")]
    pub youtube_url: String,
}

/// POST /music/compare response
#[derive(Debug, Serialize, Deserialize)]
pub struct CompareResponse {
    pub matched_song: String,
    pub matched_url: String,
    pub similarity: f64,
    pub uploaded_bpm: u32,
    pub uploaded_key: PitchClass,
    pub comparison_id: i64,
}

/// POST /music/compare
///
/// Downloads the track, finds its closest catalog song and records the
/// comparison.
pub async fn compare_music(
    State(state): State<AppState>,
    payload: Result<Json<CompareBody>, JsonRejection>,
) -> ApiResult<Json<CompareResponse>> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let request = CompareRequest {
        user_uid: body.user_uid,
        source_url: body.youtube_url,
    };

    match state.comparison.compare(&request).await {
        Ok(outcome) => Ok(Json(CompareResponse {
            matched_song: outcome.matched_title,
            matched_url: outcome.matched_url,
            similarity: outcome.similarity,
            uploaded_bpm: outcome.tempo_bpm,
            uploaded_key: outcome.key,
            comparison_id: outcome.comparison_id,
        })),
        Err(e) => {
            warn!(user_uid = %request.user_uid, error = %e, "Comparison failed");
            *state.last_error.write().await = Some(e.to_string());
            Err(ApiError::from(e))
        }
    }
}

/// Build comparison routes
pub fn compare_routes() -> Router<AppState> {
    Router::new().route("/music/compare", post(compare_music))
}
