//! Comparison pipeline
//!
//! One request flows through:
//! 1. input validation
//! 2. a permit from the bounded extraction pool
//! 3. acquisition → feature extraction → temp cleanup, in a task that
//!    keeps the permit until it finishes
//! 4. query width check
//! 5. catalog snapshot → match engine
//! 6. pad to storage width → single comparison insert
//!
//! Each failure surfaces as its own [`PipelineError`] variant.

use crate::db::{CatalogStore, ComparisonRecord};
use crate::matching::{pad, require_comparison_width, DimensionError, MatchEngine, MatchOutcome, ScanSummary};
use crate::services::acquisition::AudioSource;
use crate::types::{ExtractionError, FeatureExtractor, PitchClass};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// A user's request to compare a remote track against the catalog
#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub user_uid: String,
    pub source_url: String,
}

/// Successful comparison
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcome {
    pub matched_title: String,
    pub matched_url: String,
    pub similarity: f64,
    pub tempo_bpm: u32,
    pub key: PitchClass,
    pub comparison_id: i64,
}

/// Pipeline failure, one variant per externally distinct cause
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("feature extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("query {0}")]
    Dimension(#[from] DimensionError),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(tunematch_common::Error),

    #[error("catalog contains no songs")]
    EmptyCatalog,

    #[error(
        "no comparable catalog entry ({} scanned, {} without fingerprint, {} malformed, {} incomparable)",
        .summary.scanned,
        .summary.skipped_absent,
        .summary.skipped_malformed,
        .summary.skipped_incomparable
    )]
    NoMatch { summary: ScanSummary },

    #[error("match found but could not be recorded: {0}")]
    Persistence(tunematch_common::Error),
}

/// Runs comparisons against the catalog
pub struct ComparisonService {
    source: Arc<dyn AudioSource>,
    extractor: Arc<dyn FeatureExtractor>,
    catalog: Arc<dyn CatalogStore>,
    engine: MatchEngine,
    extraction_permits: Arc<Semaphore>,
}

impl ComparisonService {
    /// `max_concurrent_extractions` is clamped to at least one
    pub fn new(
        source: Arc<dyn AudioSource>,
        extractor: Arc<dyn FeatureExtractor>,
        catalog: Arc<dyn CatalogStore>,
        max_concurrent_extractions: usize,
    ) -> Self {
        Self {
            source,
            extractor,
            catalog,
            engine: MatchEngine::new(),
            extraction_permits: Arc::new(Semaphore::new(max_concurrent_extractions.max(1))),
        }
    }

    pub async fn compare(&self, request: &CompareRequest) -> Result<ComparisonOutcome, PipelineError> {
        let user_uid = request.user_uid.trim();
        let source_url = request.source_url.trim();
        if user_uid.is_empty() {
            return Err(PipelineError::InvalidInput("user_uid is required".to_string()));
        }
        if source_url.is_empty() {
            return Err(PipelineError::InvalidInput("source url is required".to_string()));
        }

        info!(user_uid = user_uid, url = source_url, "Comparison requested");

        let permit = Arc::clone(&self.extraction_permits)
            .acquire_owned()
            .await
            .map_err(|_| {
                PipelineError::Extraction(ExtractionError::Acquisition(
                    "extraction pool closed".to_string(),
                ))
            })?;

        // The job owns the permit: a dropped request cannot free the slot
        // while analysis is still running on the blocking pool.
        let source = Arc::clone(&self.source);
        let extractor = Arc::clone(&self.extractor);
        let url = source_url.to_string();
        let job = tokio::spawn(async move {
            let _permit = permit;

            let acquired = source.acquire(&url).await?;
            let extracted = extractor.extract(&acquired.waveform).await;
            let title = acquired.title.clone();
            let source_id = acquired.source_id.clone();
            acquired.cleanup();

            Ok::<_, ExtractionError>((extracted?, title, source_id))
        });

        let (features, title, source_id) = job.await.map_err(|e| {
            ExtractionError::Analysis(format!("Extraction task failed: {}", e))
        })??;

        require_comparison_width(&features.fingerprint)?;

        let catalog = self
            .catalog
            .fetch_all_entries()
            .await
            .map_err(PipelineError::CatalogUnavailable)?;
        if catalog.is_empty() {
            return Err(PipelineError::EmptyCatalog);
        }

        let (entry, score) = match self.engine.find_best_match(features.fingerprint.values(), &catalog) {
            MatchOutcome::Matched { entry, score, .. } => (entry, score),
            MatchOutcome::NoMatch { summary } => {
                warn!(
                    scanned = summary.scanned,
                    malformed = summary.skipped_malformed,
                    "No comparable catalog entry"
                );
                return Err(PipelineError::NoMatch { summary });
            }
        };

        let record = ComparisonRecord {
            user_uid: user_uid.to_string(),
            uploaded_url: source_url.to_string(),
            uploaded_title: Some(title),
            uploaded_source_id: Some(source_id),
            tempo_bpm: features.tempo_bpm,
            key: features.key,
            fingerprint: pad(features.fingerprint)?,
            matched_song_id: entry.id,
            matched_url: entry.url.clone(),
            similarity: score,
            created_at: Utc::now(),
        };

        let comparison_id = self
            .catalog
            .insert_comparison(&record)
            .await
            .map_err(PipelineError::Persistence)?;

        info!(
            comparison_id = comparison_id,
            entry_id = entry.id,
            score = score,
            "Comparison recorded"
        );

        Ok(ComparisonOutcome {
            matched_title: entry.title.clone(),
            matched_url: entry.url.clone(),
            similarity: score,
            tempo_bpm: record.tempo_bpm,
            key: record.key,
            comparison_id,
        })
    }
}
