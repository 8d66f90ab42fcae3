//! Embedding model client
//!
//! The neural embedding model runs in a long-lived model server so that its
//! weights are loaded exactly once. This client posts the raw WAV bytes and
//! reads back a single embedding vector.
//!
//! # Wire format
//! - Request: `POST <url>` with `Content-Type: audio/wav`, body = file bytes
//! - Response: `{"embedding": [f32, ...]}`

use crate::matching::Fingerprint;
use crate::types::{EmbeddingModel, ExtractionError, Waveform};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default model server endpoint
pub const DEFAULT_EMBEDDER_URL: &str = "http://127.0.0.1:5732/embed";

/// Default request timeout (inference on long tracks is slow)
pub const DEFAULT_EMBEDDER_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// HTTP client for the embedding model server
pub struct HttpEmbeddingClient {
    http_client: Client,
    endpoint: String,
}

impl HttpEmbeddingClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ExtractionError> {
        let http_client = Client::builder()
            .user_agent(concat!("tunematch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ExtractionError::Inference(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingClient {
    fn name(&self) -> &str {
        "http-embedder"
    }

    async fn embed(&self, waveform: &Waveform) -> Result<Fingerprint, ExtractionError> {
        let audio = tokio::fs::read(waveform.path()).await?;
        debug!(
            endpoint = %self.endpoint,
            bytes = audio.len(),
            "Requesting embedding"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(audio)
            .send()
            .await
            .map_err(|e| ExtractionError::Inference(format!("Embedder request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Inference(format!(
                "Embedder returned {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            ExtractionError::Inference(format!("Malformed embedder response: {}", e))
        })?;

        if parsed.embedding.is_empty() {
            return Err(ExtractionError::Inference(
                "Embedder returned an empty embedding".to_string(),
            ));
        }
        if parsed.embedding.iter().any(|v| !v.is_finite()) {
            return Err(ExtractionError::Inference(
                "Embedder returned non-finite values".to_string(),
            ));
        }

        debug!(values = parsed.embedding.len(), "Embedding received");
        Ok(Fingerprint::new(parsed.embedding))
    }
}
