//! Test doubles for the pipeline's capabilities

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tunematch_common::{Error, Result};
use tunematch_server::db::{CatalogStore, ComparisonRecord};
use tunematch_server::matching::{CatalogEntry, Fingerprint};
use tunematch_server::services::{AcquiredAudio, AudioSource};
use tunematch_server::types::{ExtractionError, FeatureExtractor, Features, PitchClass, Waveform};

/// Audio source that writes a placeholder file into a fresh temp dir
#[derive(Default)]
pub struct FakeSource {
    pub fail: bool,
    /// Scratch directories handed out so far
    pub scratch_dirs: Mutex<Vec<PathBuf>>,
}

impl FakeSource {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn handed_out(&self) -> Vec<PathBuf> {
        self.scratch_dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSource for FakeSource {
    async fn acquire(&self, url: &str) -> std::result::Result<AcquiredAudio, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::Acquisition(format!("cannot fetch {}", url)));
        }
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("track.wav");
        std::fs::write(&path, b"RIFF")?;
        self.scratch_dirs.lock().unwrap().push(dir.path().to_path_buf());
        Ok(AcquiredAudio::new(Waveform::new(path), "Uploaded Track", "vid-1", dir))
    }
}

/// Extractor returning fixed features, tracking peak concurrency
///
/// The delay is spent on the blocking pool, so like real signal analysis it
/// keeps running after the calling future is dropped.
pub struct FakeExtractor {
    result: std::result::Result<Vec<f32>, String>,
    pub tempo_bpm: u32,
    pub key: PitchClass,
    pub delay: Duration,
    in_flight: Arc<AtomicUsize>,
    pub peak_in_flight: Arc<AtomicUsize>,
    pub completed: Arc<AtomicUsize>,
}

impl FakeExtractor {
    pub fn returning(fingerprint: Vec<f32>) -> Self {
        Self {
            result: Ok(fingerprint),
            tempo_bpm: 120,
            key: PitchClass::A,
            delay: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            ..Self::returning(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl FeatureExtractor for FakeExtractor {
    async fn extract(&self, waveform: &Waveform) -> std::result::Result<Features, ExtractionError> {
        assert!(waveform.path().exists(), "waveform released before extraction");

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delay;
        let in_flight = Arc::clone(&self.in_flight);
        let completed = Arc::clone(&self.completed);
        tokio::task::spawn_blocking(move || {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
            completed.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .map_err(|e| ExtractionError::Analysis(e.to_string()))?;

        match &self.result {
            Ok(values) => Ok(Features {
                fingerprint: Fingerprint::new(values.clone()),
                tempo_bpm: self.tempo_bpm,
                key: self.key,
            }),
            Err(reason) => Err(ExtractionError::Inference(reason.clone())),
        }
    }
}

/// Catalog store whose reads or writes fail on demand
pub struct BrokenCatalog {
    pub entries: Vec<CatalogEntry>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes_attempted: AtomicUsize,
}

impl BrokenCatalog {
    pub fn unreadable() -> Self {
        Self {
            entries: Vec::new(),
            fail_reads: true,
            fail_writes: false,
            writes_attempted: AtomicUsize::new(0),
        }
    }

    pub fn unwritable(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            fail_reads: false,
            fail_writes: true,
            writes_attempted: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CatalogStore for BrokenCatalog {
    async fn fetch_all_entries(&self) -> Result<Vec<CatalogEntry>> {
        if self.fail_reads {
            return Err(Error::Config("catalog offline".to_string()));
        }
        Ok(self.entries.clone())
    }

    async fn insert_comparison(&self, _record: &ComparisonRecord) -> Result<i64> {
        self.writes_attempted.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Error::InvalidRecord("disk full".to_string()));
        }
        Ok(1)
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
