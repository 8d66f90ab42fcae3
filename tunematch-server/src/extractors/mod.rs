//! Feature extraction
//!
//! Turns a downloaded waveform into a comparison fingerprint plus tempo and
//! key estimates.

pub mod audio_feature_extractor;
pub mod embedding_client;
pub mod signal_analyzer;

pub use audio_feature_extractor::AudioFeatureExtractor;
pub use embedding_client::{HttpEmbeddingClient, DEFAULT_EMBEDDER_TIMEOUT, DEFAULT_EMBEDDER_URL};
pub use signal_analyzer::{SignalAnalyzer, TempoKey};
