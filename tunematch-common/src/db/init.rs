//! Database initialization
//!
//! Opens (or creates) the SQLite database in the root folder and creates the
//! catalog and comparison tables if they do not exist.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Storage width enforced on persisted query fingerprints
pub const STORED_FINGERPRINT_WIDTH: usize = 1536;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create every tunematch table (idempotent)
///
/// Also enables foreign keys on the given pool's connection. Tests call this
/// directly on an in-memory pool.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_songs_table(pool).await?;
    create_comparisons_table(pool).await?;

    info!("Database tables initialized (songs, comparisons)");
    Ok(())
}

/// Create the songs (reference catalog) table
///
/// `embedding` is deliberately untyped: rows hold JSON text, packed
/// little-endian f32 BLOBs, or NULL.
pub async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            embedding,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the comparisons table
///
/// The uploaded fingerprint is stored as a JSON array whose width the schema
/// checks, so a record with the wrong width can never be written.
pub async fn create_comparisons_table(pool: &SqlitePool) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS comparisons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_uid TEXT NOT NULL,
            uploaded_url TEXT NOT NULL,
            uploaded_title TEXT,
            uploaded_source_id TEXT,
            uploaded_bpm INTEGER NOT NULL,
            uploaded_key TEXT NOT NULL,
            uploaded_embedding TEXT NOT NULL
                CHECK (json_valid(uploaded_embedding)
                       AND json_array_length(uploaded_embedding) = {width}),
            matched_song_id INTEGER NOT NULL REFERENCES songs(id),
            matched_url TEXT NOT NULL,
            similarity REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
        width = STORED_FINGERPRINT_WIDTH
    );

    sqlx::query(&sql).execute(pool).await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_comparisons_user_uid ON comparisons(user_uid)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
