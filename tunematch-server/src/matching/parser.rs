//! Stored fingerprint decoding
//!
//! Catalog rows are untrusted input. Text is decoded as a JSON array first;
//! the only fallback is a strict delimited-number reader. Nothing is ever
//! evaluated, and every decoded value must be a finite number.

use super::{Fingerprint, StoredFingerprint};
use thiserror::Error;

/// A catalog entry's stored fingerprint could not be decoded
///
/// Recovered by the match engine: the entry is skipped and the scan goes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode fingerprint of catalog entry {entry_id}: {reason}")]
pub struct ParseError {
    pub entry_id: i64,
    pub reason: String,
}

/// Decode a stored fingerprint into a numeric vector
pub fn parse(raw: &StoredFingerprint, entry_id: i64) -> Result<Fingerprint, ParseError> {
    let fail = |reason: String| ParseError { entry_id, reason };

    let values = match raw {
        StoredFingerprint::Numbers(values) => values.clone(),
        StoredFingerprint::Text(text) => match decode_json(text) {
            Ok(values) => values,
            Err(json_err) => decode_delimited(text).map_err(|fallback_err| {
                fail(format!(
                    "not a JSON number array ({}) nor a delimited number list ({})",
                    json_err, fallback_err
                ))
            })?,
        },
        StoredFingerprint::Bytes(bytes) => decode_packed(bytes).map_err(fail)?,
        StoredFingerprint::Unsupported(kind) => {
            return Err(fail(format!("unsupported representation: {}", kind)))
        }
    };

    if let Some(position) = values.iter().position(|v| !v.is_finite()) {
        return Err(fail(format!("non-finite value at position {}", position)));
    }

    Ok(Fingerprint::new(values))
}

fn decode_json(text: &str) -> Result<Vec<f32>, serde_json::Error> {
    let values: Vec<f64> = serde_json::from_str(text)?;
    Ok(values.into_iter().map(|v| v as f32).collect())
}

/// Strict reader for `1, 2, 3`, `(1, 2, 3)`, `{1,2,3}` or `[1 2 3]`
///
/// One optional pair of matching enclosing brackets; numbers separated either
/// by commas or by whitespace.
fn decode_delimited(text: &str) -> Result<Vec<f32>, String> {
    let trimmed = text.trim();
    let inner = strip_enclosing(trimmed)?;

    if inner.trim().is_empty() {
        return Err("no values".to_string());
    }

    let tokens: Vec<&str> = if inner.contains(',') {
        inner.split(',').map(str::trim).collect()
    } else {
        inner.split_whitespace().collect()
    };

    tokens
        .iter()
        .enumerate()
        .map(|(position, token)| {
            if token.is_empty() {
                return Err(format!("empty value at position {}", position));
            }
            token
                .parse::<f32>()
                .map_err(|_| format!("'{}' at position {} is not a number", token, position))
        })
        .collect()
}

fn strip_enclosing(text: &str) -> Result<&str, String> {
    let Some(first) = text.chars().next() else {
        return Ok(text);
    };

    let closing = match first {
        '[' => ']',
        '(' => ')',
        '{' => '}',
        _ => return Ok(text),
    };

    if text.len() >= 2 && text.ends_with(closing) {
        Ok(&text[1..text.len() - 1])
    } else {
        Err(format!("unbalanced '{}'", first))
    }
}

fn decode_packed(bytes: &[u8]) -> Result<Vec<f32>, String> {
    if bytes.len() % 4 != 0 {
        return Err(format!(
            "packed f32 data has {} bytes, not a multiple of 4",
            bytes.len()
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
