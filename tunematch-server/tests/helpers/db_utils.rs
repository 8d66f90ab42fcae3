//! Database Test Utilities

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tunematch_server::db::SqliteCatalog;

/// In-memory database with the tunematch schema
///
/// Single connection so every query sees the same in-memory database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    tunematch_common::db::create_tables(&pool)
        .await
        .expect("Failed to create tables");
    pool
}

pub async fn memory_catalog() -> SqliteCatalog {
    SqliteCatalog::new(memory_pool().await)
}

/// Insert a song whose embedding is stored as JSON text
pub async fn insert_json_song(pool: &SqlitePool, id: i64, title: &str, values: &[f32]) {
    let json = serde_json::to_string(values).unwrap();
    sqlx::query("INSERT INTO songs (id, title, url, embedding) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(title)
        .bind(format!("https://catalog.example/{}", id))
        .bind(json)
        .execute(pool)
        .await
        .expect("Failed to insert song");
}

/// Insert a song with a raw text embedding (possibly malformed)
pub async fn insert_text_song(pool: &SqlitePool, id: i64, title: &str, text: &str) {
    sqlx::query("INSERT INTO songs (id, title, url, embedding) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(title)
        .bind(format!("https://catalog.example/{}", id))
        .bind(text)
        .execute(pool)
        .await
        .expect("Failed to insert song");
}

pub async fn comparison_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM comparisons")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Unit vector of comparison width with 1.0 at `index`
pub fn basis(index: usize) -> Vec<f32> {
    let mut values = vec![0.0; 512];
    values[index] = 1.0;
    values
}
