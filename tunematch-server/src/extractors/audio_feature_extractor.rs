//! Audio feature extractor
//!
//! Combines the embedding model (fingerprint) with the signal analyzer
//! (tempo and key). Both run concurrently: the embedder over the network,
//! the analyzer on the blocking pool.

use crate::extractors::signal_analyzer::SignalAnalyzer;
use crate::types::{EmbeddingModel, ExtractionError, FeatureExtractor, Features, Waveform};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct AudioFeatureExtractor {
    model: Arc<dyn EmbeddingModel>,
    analyzer: SignalAnalyzer,
}

impl AudioFeatureExtractor {
    pub fn new(model: Arc<dyn EmbeddingModel>, analyzer: SignalAnalyzer) -> Self {
        Self { model, analyzer }
    }
}

#[async_trait]
impl FeatureExtractor for AudioFeatureExtractor {
    async fn extract(&self, waveform: &Waveform) -> Result<Features, ExtractionError> {
        let start = Instant::now();
        debug!(
            path = %waveform.path().display(),
            model = self.model.name(),
            "Extracting features"
        );

        let analyzer = self.analyzer.clone();
        let path = waveform.path().to_path_buf();
        let analysis = tokio::task::spawn_blocking(move || analyzer.analyze_file(&path));

        let (embedding, analysis) = tokio::join!(self.model.embed(waveform), analysis);

        let fingerprint = embedding?;
        let tempo_key = analysis
            .map_err(|e| ExtractionError::Analysis(format!("Analysis task failed: {}", e)))??;

        info!(
            values = fingerprint.len(),
            tempo_bpm = tempo_key.tempo_bpm,
            key = %tempo_key.key,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Features extracted"
        );

        Ok(Features {
            fingerprint,
            tempo_bpm: tempo_key.tempo_bpm,
            key: tempo_key.key,
        })
    }
}
