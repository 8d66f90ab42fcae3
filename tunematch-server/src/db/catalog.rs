//! Catalog and comparison persistence
//!
//! Reads the reference catalog as a snapshot of [`CatalogEntry`] values and
//! writes one comparison record per successful match.

use crate::matching::{CatalogEntry, Fingerprint, StoredFingerprint, STORAGE_WIDTH};
use crate::types::PitchClass;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, warn};
use tunematch_common::{Error, Result};

/// One persisted comparison
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRecord {
    pub user_uid: String,
    pub uploaded_url: String,
    pub uploaded_title: Option<String>,
    pub uploaded_source_id: Option<String>,
    pub tempo_bpm: u32,
    pub key: PitchClass,
    /// Storage-width (padded) query fingerprint
    pub fingerprint: Fingerprint,
    pub matched_song_id: i64,
    pub matched_url: String,
    pub similarity: f64,
    pub created_at: DateTime<Utc>,
}

/// Catalog snapshot reads and comparison writes
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every catalog entry with a valid title and url
    async fn fetch_all_entries(&self) -> Result<Vec<CatalogEntry>>;

    /// Persist a comparison, returning its new id
    async fn insert_comparison(&self, record: &ComparisonRecord) -> Result<i64>;
}

/// SQLite-backed catalog
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a catalog song
    ///
    /// Numeric fingerprints are packed into a BLOB, text is stored verbatim,
    /// `None` stores NULL.
    pub async fn upsert_song(
        &self,
        id: i64,
        title: &str,
        url: &str,
        fingerprint: Option<&StoredFingerprint>,
    ) -> Result<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO songs (id, title, url, embedding)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                embedding = excluded.embedding
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(url);

        let query = match fingerprint {
            None => query.bind(Option::<Vec<u8>>::None),
            Some(StoredFingerprint::Numbers(values)) => {
                query.bind(StoredFingerprint::encode_bytes(values))
            }
            Some(StoredFingerprint::Text(text)) => query.bind(text.clone()),
            Some(StoredFingerprint::Bytes(bytes)) => query.bind(bytes.clone()),
            Some(StoredFingerprint::Unsupported(what)) => {
                return Err(Error::InvalidRecord(format!(
                    "song {} has an unsupported fingerprint ({})",
                    id, what
                )));
            }
        };

        query.execute(&self.pool).await?;
        Ok(())
    }

    /// Number of stored comparisons for a user
    pub async fn count_comparisons(&self, user_uid: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comparisons WHERE user_uid = ?")
            .bind(user_uid)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn fetch_all_entries(&self) -> Result<Vec<CatalogEntry>> {
        let rows = sqlx::query("SELECT id, title, url, embedding FROM songs ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_entry(row) {
                Ok(entry) => entries.push(entry),
                Err(Error::InvalidRecord(reason)) => {
                    warn!(reason = %reason, "Skipping invalid catalog row");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(rows = rows.len(), entries = entries.len(), "Catalog snapshot loaded");
        Ok(entries)
    }

    async fn insert_comparison(&self, record: &ComparisonRecord) -> Result<i64> {
        if record.fingerprint.len() != STORAGE_WIDTH {
            return Err(Error::InvalidRecord(format!(
                "comparison fingerprint has {} values, expected {}",
                record.fingerprint.len(),
                STORAGE_WIDTH
            )));
        }

        let embedding = serde_json::to_string(record.fingerprint.values())
            .map_err(|e| Error::InvalidRecord(format!("fingerprint serialization failed: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO comparisons (
                user_uid, uploaded_url, uploaded_title, uploaded_source_id,
                uploaded_bpm, uploaded_key, uploaded_embedding,
                matched_song_id, matched_url, similarity, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_uid)
        .bind(&record.uploaded_url)
        .bind(&record.uploaded_title)
        .bind(&record.uploaded_source_id)
        .bind(record.tempo_bpm as i64)
        .bind(record.key.label())
        .bind(embedding)
        .bind(record.matched_song_id)
        .bind(&record.matched_url)
        .bind(record.similarity)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

/// Map one `songs` row onto a catalog entry
///
/// The `embedding` column is untyped, so its representation comes from the
/// value's runtime storage class.
fn decode_entry(row: &SqliteRow) -> Result<CatalogEntry> {
    let id: i64 = row.try_get("id")?;
    let title: String = row.try_get("title")?;
    let url: String = row.try_get("url")?;

    let storage_class = {
        let raw = row.try_get_raw("embedding")?;
        if raw.is_null() {
            None
        } else {
            Some(raw.type_info().name().to_string())
        }
    };

    let fingerprint = match storage_class.as_deref() {
        None => None,
        Some("TEXT") => Some(StoredFingerprint::Text(
            row.try_get_unchecked::<String, _>("embedding")?,
        )),
        Some("BLOB") => Some(StoredFingerprint::Bytes(
            row.try_get_unchecked::<Vec<u8>, _>("embedding")?,
        )),
        Some(other) => Some(StoredFingerprint::Unsupported(format!(
            "{} column value",
            other
        ))),
    };

    CatalogEntry::new(id, title, url, fingerprint)
}
