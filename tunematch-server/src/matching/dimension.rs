//! Fingerprint width reconciliation between comparison and storage
//!
//! Conversion only runs in the query → storage direction. Truncating a
//! storage-width vector back to comparison width is not offered.

use super::{Fingerprint, COMPARISON_WIDTH, STORAGE_WIDTH};
use thiserror::Error;

/// Fingerprint length does not fit the requested context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fingerprint has {received} values, expected {expected:?}")]
pub struct DimensionError {
    pub received: usize,
    pub expected: &'static [usize],
}

const PAD_ACCEPTS: &[usize] = &[COMPARISON_WIDTH, STORAGE_WIDTH];
const COMPARISON_ONLY: &[usize] = &[COMPARISON_WIDTH];

/// Zero-pad a comparison-width fingerprint to storage width
///
/// - storage width: returned unchanged
/// - comparison width: 1024 zeros appended
/// - anything else: [`DimensionError`]
pub fn pad(fingerprint: Fingerprint) -> Result<Fingerprint, DimensionError> {
    match fingerprint.len() {
        STORAGE_WIDTH => Ok(fingerprint),
        COMPARISON_WIDTH => {
            let mut values = fingerprint.into_values();
            values.resize(STORAGE_WIDTH, 0.0);
            Ok(Fingerprint::new(values))
        }
        received => Err(DimensionError {
            received,
            expected: PAD_ACCEPTS,
        }),
    }
}

/// Reject a query that cannot take part in similarity computation
pub fn require_comparison_width(fingerprint: &Fingerprint) -> Result<(), DimensionError> {
    if fingerprint.len() == COMPARISON_WIDTH {
        Ok(())
    } else {
        Err(DimensionError {
            received: fingerprint.len(),
            expected: COMPARISON_ONLY,
        })
    }
}
