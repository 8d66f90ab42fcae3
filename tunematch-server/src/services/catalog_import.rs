//! Catalog import
//!
//! Loads reference songs from a JSON file of the form
//! `[{"id": 1, "title": "...", "url": "...", "embedding": [...] | "..." | null}]`.

use crate::db::SqliteCatalog;
use crate::matching::StoredFingerprint;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct ImportedSong {
    id: i64,
    title: String,
    url: String,
    #[serde(default)]
    embedding: serde_json::Value,
}

/// Import counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: usize,
}

/// Parse and upsert every song in `json`
pub async fn import_catalog_json(catalog: &SqliteCatalog, json: &str) -> Result<ImportSummary> {
    let songs: Vec<ImportedSong> =
        serde_json::from_str(json).context("Catalog file is not a JSON array of songs")?;

    let mut summary = ImportSummary::default();
    for song in songs {
        let fingerprint = StoredFingerprint::from_json(song.embedding);

        if song.title.trim().is_empty() || song.url.trim().is_empty() {
            warn!(song_id = song.id, "Rejecting song with empty title or url");
            summary.rejected += 1;
            continue;
        }

        match catalog
            .upsert_song(song.id, &song.title, &song.url, fingerprint.as_ref())
            .await
        {
            Ok(()) => summary.imported += 1,
            Err(tunematch_common::Error::InvalidRecord(reason)) => {
                warn!(song_id = song.id, reason = %reason, "Rejecting song");
                summary.rejected += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to store song {}", song.id));
            }
        }
    }

    info!(
        imported = summary.imported,
        rejected = summary.rejected,
        "Catalog import complete"
    );
    Ok(summary)
}

/// Read a catalog file and import it
pub async fn import_catalog_file(catalog: &SqliteCatalog, path: &Path) -> Result<ImportSummary> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    import_catalog_json(catalog, &json).await
}
