//! Core types and capability traits
//!
//! The pipeline talks to its expensive or external collaborators only through
//! the traits defined here, so each one is constructed once at startup and
//! injected (or replaced by a test double).

use crate::matching::Fingerprint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Waveform
// ============================================================================

/// Locally accessible decoded audio (a WAV file on disk)
#[derive(Debug, Clone)]
pub struct Waveform {
    path: PathBuf,
}

impl Waveform {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ============================================================================
// Musical key
// ============================================================================

/// One of the twelve pitch classes, used as the estimated key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D#")]
    DSharp,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "G#")]
    GSharp,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A#")]
    ASharp,
    #[serde(rename = "B")]
    B,
}

impl PitchClass {
    /// Chromatic order starting at C
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class for a chroma bin index (0 = C)
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Feature extraction
// ============================================================================

/// Everything the pipeline needs to know about the query track
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    /// Comparison-width embedding
    pub fingerprint: Fingerprint,
    /// Estimated tempo in beats per minute
    pub tempo_bpm: u32,
    /// Estimated key
    pub key: PitchClass,
}

/// Acquisition or feature-extraction failure
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Audio acquisition failed: {0}")]
    Acquisition(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Embedding inference failed: {0}")]
    Inference(String),

    #[error("Signal analysis failed: {0}")]
    Analysis(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Waveform → fingerprint + tempo + key
///
/// Possibly slow and possibly failing. Callers bound concurrency around it.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, waveform: &Waveform) -> Result<Features, ExtractionError>;
}

/// Embedding model capability
///
/// Implementations hold a model (or a client for one) that was loaded once and
/// is shared read-only across requests.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    async fn embed(&self, waveform: &Waveform) -> Result<Fingerprint, ExtractionError>;
}
