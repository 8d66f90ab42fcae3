//! Exhaustive nearest-neighbor scan over the catalog
//!
//! **Algorithm:**
//! 1. Skip entries without a stored fingerprint
//! 2. Decode the stored fingerprint; on failure log and skip the entry
//! 3. Score against the query (both must be comparison width); on failure skip
//! 4. Keep the entry if its score is strictly greater than the best so far
//!
//! Ties go to the entry seen first, so the result depends on catalog order and
//! is otherwise deterministic. Every entry is visited; a later entry can always
//! improve the score.

use super::{cosine, parse, CatalogEntry, COMPARISON_WIDTH};
use tracing::{debug, warn};

/// Per-scan counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Entries visited
    pub scanned: usize,
    /// Entries that produced a score
    pub compared: usize,
    /// Entries with no stored fingerprint
    pub skipped_absent: usize,
    /// Entries whose stored fingerprint failed to decode
    pub skipped_malformed: usize,
    /// Entries of the wrong width or with a zero-norm vector
    pub skipped_incomparable: usize,
}

impl ScanSummary {
    /// True when the catalog had no entries at all
    pub fn catalog_was_empty(&self) -> bool {
        self.scanned == 0
    }
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    Matched {
        entry: &'a CatalogEntry,
        score: f64,
        summary: ScanSummary,
    },
    NoMatch {
        summary: ScanSummary,
    },
}

impl<'a> MatchOutcome<'a> {
    pub fn summary(&self) -> &ScanSummary {
        match self {
            MatchOutcome::Matched { summary, .. } | MatchOutcome::NoMatch { summary } => summary,
        }
    }
}

/// Catalog match engine
#[derive(Debug, Clone)]
pub struct MatchEngine {
    comparison_width: usize,
}

impl MatchEngine {
    pub fn new() -> Self {
        Self {
            comparison_width: COMPARISON_WIDTH,
        }
    }

    /// Find the catalog entry most similar to `query`
    ///
    /// Never fails: per-entry problems are counted in the summary and skipped.
    pub fn find_best_match<'a>(&self, query: &[f32], catalog: &'a [CatalogEntry]) -> MatchOutcome<'a> {
        let mut summary = ScanSummary::default();
        let mut best: Option<(&'a CatalogEntry, f64)> = None;

        for entry in catalog {
            summary.scanned += 1;

            let Some(stored) = &entry.fingerprint else {
                summary.skipped_absent += 1;
                continue;
            };

            let candidate = match parse(stored, entry.id) {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!(entry_id = entry.id, error = %e, "Skipping catalog entry with malformed fingerprint");
                    summary.skipped_malformed += 1;
                    continue;
                }
            };

            if candidate.len() != self.comparison_width || query.len() != self.comparison_width {
                warn!(
                    entry_id = entry.id,
                    entry_len = candidate.len(),
                    query_len = query.len(),
                    expected = self.comparison_width,
                    "Skipping catalog entry: fingerprint width mismatch"
                );
                summary.skipped_incomparable += 1;
                continue;
            }

            let score = match cosine(query, candidate.values()) {
                Ok(score) => score,
                Err(e) => {
                    warn!(entry_id = entry.id, error = %e, "Skipping catalog entry: similarity undefined");
                    summary.skipped_incomparable += 1;
                    continue;
                }
            };

            summary.compared += 1;

            let improves = match best {
                Some((_, best_score)) => score > best_score,
                None => true,
            };
            if improves {
                best = Some((entry, score));
            }
        }

        debug!(
            scanned = summary.scanned,
            compared = summary.compared,
            absent = summary.skipped_absent,
            malformed = summary.skipped_malformed,
            incomparable = summary.skipped_incomparable,
            "Catalog scan complete"
        );

        match best {
            Some((entry, score)) => MatchOutcome::Matched {
                entry,
                score,
                summary,
            },
            None => MatchOutcome::NoMatch { summary },
        }
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::StoredFingerprint;

    fn basis(index: usize) -> Vec<f32> {
        let mut v = vec![0.0; COMPARISON_WIDTH];
        v[index] = 1.0;
        v
    }

    fn entry(id: i64, fingerprint: Option<StoredFingerprint>) -> CatalogEntry {
        CatalogEntry::new(id, format!("Song {}", id), format!("https://example.org/{}", id), fingerprint)
            .unwrap()
    }

    fn numbers(values: Vec<f32>) -> Option<StoredFingerprint> {
        Some(StoredFingerprint::Numbers(values))
    }

    #[test]
    fn test_empty_catalog_is_no_match() {
        let outcome = MatchEngine::new().find_best_match(&basis(0), &[]);
        match outcome {
            MatchOutcome::NoMatch { summary } => assert!(summary.catalog_was_empty()),
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_first_entry_wins_ties() {
        let catalog = vec![
            entry(1, numbers(basis(0))),
            entry(2, numbers(basis(1))),
            entry(3, numbers(basis(0))),
        ];

        match MatchEngine::new().find_best_match(&basis(0), &catalog) {
            MatchOutcome::Matched { entry, score, summary } => {
                assert_eq!(entry.id, 1);
                assert!((score - 1.0).abs() < 1e-9);
                assert_eq!(summary.compared, 3);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_later_better_entry_replaces_earlier() {
        let mut near = basis(0);
        near[1] = 0.5;
        let catalog = vec![entry(1, numbers(near)), entry(2, numbers(basis(0)))];

        match MatchEngine::new().find_best_match(&basis(0), &catalog) {
            MatchOutcome::Matched { entry, .. } => assert_eq!(entry.id, 2),
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_all_malformed_is_no_match() {
        let catalog = vec![
            entry(1, Some(StoredFingerprint::Text("not a vector".to_string()))),
            entry(2, Some(StoredFingerprint::Bytes(vec![1, 2, 3]))),
            entry(3, Some(StoredFingerprint::Unsupported("INTEGER".to_string()))),
        ];

        match MatchEngine::new().find_best_match(&basis(0), &catalog) {
            MatchOutcome::NoMatch { summary } => {
                assert!(!summary.catalog_was_empty());
                assert_eq!(summary.skipped_malformed, 3);
            }
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_fingerprints_are_skipped_not_scored() {
        let catalog = vec![entry(1, None), entry(2, numbers(basis(1)))];

        match MatchEngine::new().find_best_match(&basis(0), &catalog) {
            MatchOutcome::Matched { entry, score, summary } => {
                // Orthogonal, score 0, but still the only candidate
                assert_eq!(entry.id, 2);
                assert!(score.abs() < 1e-9);
                assert_eq!(summary.skipped_absent, 1);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_entry_does_not_abort_scan() {
        let catalog = vec![
            entry(1, Some(StoredFingerprint::Text("[1, 2".to_string()))),
            entry(2, numbers(basis(0))),
        ];

        match MatchEngine::new().find_best_match(&basis(0), &catalog) {
            MatchOutcome::Matched { entry, summary, .. } => {
                assert_eq!(entry.id, 2);
                assert_eq!(summary.skipped_malformed, 1);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_width_query_never_scores() {
        let catalog = vec![entry(1, numbers(basis(0))), entry(2, numbers(basis(1)))];
        let short_query = vec![1.0; 500];

        match MatchEngine::new().find_best_match(&short_query, &catalog) {
            MatchOutcome::NoMatch { summary } => assert_eq!(summary.skipped_incomparable, 2),
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_storage_width_entry_is_incomparable() {
        let mut padded = basis(0);
        padded.resize(1536, 0.0);
        let catalog = vec![entry(1, numbers(padded))];

        assert!(matches!(
            MatchEngine::new().find_best_match(&basis(0), &catalog),
            MatchOutcome::NoMatch { .. }
        ));
    }

    #[test]
    fn test_zero_vector_entry_is_skipped() {
        let catalog = vec![entry(1, numbers(vec![0.0; COMPARISON_WIDTH])), entry(2, numbers(basis(3)))];

        match MatchEngine::new().find_best_match(&basis(3), &catalog) {
            MatchOutcome::Matched { entry, summary, .. } => {
                assert_eq!(entry.id, 2);
                assert_eq!(summary.skipped_incomparable, 1);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_text_and_native_entries_score_identically() {
        let query: Vec<f32> = (0..COMPARISON_WIDTH).map(|i| (i % 7) as f32 - 3.0).collect();
        let stored: Vec<f32> = (0..COMPARISON_WIDTH).map(|i| (i % 5) as f32 * 0.25).collect();
        let as_text = serde_json::to_string(&stored).unwrap();

        let native = vec![entry(1, numbers(stored))];
        let textual = vec![entry(1, Some(StoredFingerprint::Text(as_text)))];

        let engine = MatchEngine::new();
        let score_of = |outcome: MatchOutcome| match outcome {
            MatchOutcome::Matched { score, .. } => score,
            other => panic!("expected a match, got {:?}", other),
        };

        assert_eq!(
            score_of(engine.find_best_match(&query, &native)),
            score_of(engine.find_best_match(&query, &textual))
        );
    }

    #[test]
    fn test_negative_best_score_is_still_a_match() {
        let opposite: Vec<f32> = basis(0).iter().map(|v| -v).collect();
        let catalog = vec![entry(1, numbers(opposite))];

        match MatchEngine::new().find_best_match(&basis(0), &catalog) {
            MatchOutcome::Matched { score, .. } => assert!((score + 1.0).abs() < 1e-9),
            other => panic!("expected a match, got {:?}", other),
        }
    }
}
