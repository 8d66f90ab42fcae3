//! Cosine similarity
//!
//! Accumulates in f64 regardless of input precision.

use thiserror::Error;

/// Cosine similarity is undefined for the given pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimilarityError {
    #[error("vector lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("vector has zero norm")]
    DegenerateVector,
}

/// Normalized dot product `dot(a,b) / (‖a‖·‖b‖)`, clamped to [-1, 1]
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimilarityError::DegenerateVector);
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !score.is_finite() {
        return Err(SimilarityError::DegenerateVector);
    }

    Ok(score.clamp(-1.0, 1.0))
}
