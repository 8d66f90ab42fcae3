//! Feature-to-match core
//!
//! Fingerprint width reconciliation, stored fingerprint decoding, cosine
//! scoring and the exhaustive catalog scan. Everything here is synchronous
//! and free of I/O.

pub mod dimension;
pub mod engine;
pub mod parser;
pub mod similarity;

pub use dimension::{pad, require_comparison_width, DimensionError};
pub use engine::{MatchEngine, MatchOutcome, ScanSummary};
pub use parser::{parse, ParseError};
pub use similarity::{cosine, SimilarityError};

use serde::{Deserialize, Serialize};
use tunematch_common::{Error, Result};

/// Width in which matching is defined
pub const COMPARISON_WIDTH: usize = 512;

/// Width in which fingerprints are persisted (comparison width + zero padding)
pub const STORAGE_WIDTH: usize = tunematch_common::db::STORED_FINGERPRINT_WIDTH;

/// Ordered embedding vector summarizing a track's acoustic content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(Vec<f32>);

impl Fingerprint {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Fingerprint {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// A catalog entry's fingerprint field as it came out of storage
///
/// The catalog holds rows written by different tools over time, so the same
/// logical vector can arrive in several shapes. [`parse`] turns any of them
/// into a [`Fingerprint`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoredFingerprint {
    /// Native numeric sequence
    Numbers(Vec<f32>),
    /// Text encoding, normally a JSON array
    Text(String),
    /// Packed little-endian f32 values
    Bytes(Vec<u8>),
    /// Anything else; carries a description of what was found
    Unsupported(String),
}

impl StoredFingerprint {
    /// Map a JSON value onto a stored representation
    ///
    /// Returns `None` for JSON `null` (no fingerprint stored).
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Null => None,
            Value::String(text) => Some(Self::Text(text)),
            Value::Array(items) => {
                let numbers: Option<Vec<f32>> =
                    items.iter().map(|v| v.as_f64().map(|n| n as f32)).collect();
                Some(match numbers {
                    Some(values) => Self::Numbers(values),
                    None => Self::Unsupported("array containing non-numeric values".to_string()),
                })
            }
            Value::Bool(_) => Some(Self::Unsupported("boolean".to_string())),
            Value::Number(_) => Some(Self::Unsupported("bare number".to_string())),
            Value::Object(_) => Some(Self::Unsupported("object".to_string())),
        }
    }

    /// Pack values as little-endian f32 bytes (the BLOB storage form)
    pub fn encode_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Reference track available for matching
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: i64,
    pub title: String,
    pub url: String,
    /// Absent entries are skipped by the scan, never scored as zero
    pub fingerprint: Option<StoredFingerprint>,
}

impl CatalogEntry {
    /// Build an entry, enforcing non-empty title and url
    pub fn new(
        id: i64,
        title: impl Into<String>,
        url: impl Into<String>,
        fingerprint: Option<StoredFingerprint>,
    ) -> Result<Self> {
        let title = title.into();
        let url = url.into();

        if title.trim().is_empty() {
            return Err(Error::InvalidRecord(format!("song {} has an empty title", id)));
        }
        if url.trim().is_empty() {
            return Err(Error::InvalidRecord(format!("song {} has an empty url", id)));
        }

        Ok(Self {
            id,
            title,
            url,
            fingerprint,
        })
    }
}
