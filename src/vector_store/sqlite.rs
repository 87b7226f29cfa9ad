//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large collections, consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{cosine_similarity, EmbeddedChunk, SearchResult, VectorStore};
use crate::error::{MinneError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    transcript_id INTEGER NOT NULL,
    recorded_on TEXT NOT NULL,
    content TEXT NOT NULL,
    chunk_order INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_transcript_id ON chunks(transcript_id);
CREATE INDEX IF NOT EXISTS idx_chunks_recorded_on ON chunks(recorded_on);
"#;

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MinneError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// Load every stored chunk (similarity is computed in Rust).
    fn load_all(&self) -> Result<Vec<EmbeddedChunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, transcript_id, recorded_on, content, chunk_order, embedding, indexed_at
            FROM chunks
            "#,
        )?;

        let chunks = stmt.query_map([], row_to_chunk)?;
        Ok(chunks.filter_map(|c| c.ok()).collect())
    }
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmbeddedChunk> {
    let id_str: String = row.get(0)?;
    let recorded_on: String = row.get(2)?;
    let embedding_bytes: Vec<u8> = row.get(5)?;
    let indexed_at_str: String = row.get(6)?;

    Ok(EmbeddedChunk {
        id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
        transcript_id: row.get(1)?,
        recorded_on: NaiveDate::parse_from_str(&recorded_on, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date")),
        content: row.get(3)?,
        chunk_order: row.get(4)?,
        embedding: SqliteVectorStore::bytes_to_embedding(&embedding_bytes),
        indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn rank(
    chunks: impl Iterator<Item = EmbeddedChunk>,
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = chunks
        .map(|chunk| {
            let score = cosine_similarity(query_embedding, &chunk.embedding);
            SearchResult { chunk, score }
        })
        .filter(|r| r.score >= min_score)
        .collect();

    // Sort by score descending
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunk))]
    async fn upsert(&self, chunk: &EmbeddedChunk) -> Result<()> {
        let conn = self.lock()?;

        let embedding_bytes = Self::embedding_to_bytes(&chunk.embedding);

        conn.execute(
            r#"
            INSERT OR REPLACE INTO chunks
            (id, transcript_id, recorded_on, content, chunk_order, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                chunk.id.to_string(),
                chunk.transcript_id,
                chunk.recorded_on.format("%Y-%m-%d").to_string(),
                chunk.content,
                chunk.chunk_order,
                embedding_bytes,
                chunk.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Upserted chunk {}", chunk.id);
        Ok(())
    }

    #[instrument(skip(self, chunks))]
    async fn upsert_batch(&self, chunks: &[EmbeddedChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            let embedding_bytes = Self::embedding_to_bytes(&chunk.embedding);

            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, transcript_id, recorded_on, content, chunk_order, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    chunk.id.to_string(),
                    chunk.transcript_id,
                    chunk.recorded_on.format("%Y-%m-%d").to_string(),
                    chunk.content,
                    chunk.chunk_order,
                    embedding_bytes,
                    chunk.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let chunks = self.load_all()?;
        let results = rank(chunks.into_iter(), query_embedding, limit, min_score);
        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self, query_embedding, transcript_ids), fields(id_count = transcript_ids.len()))]
    async fn search_within(
        &self,
        query_embedding: &[f32],
        transcript_ids: &[i64],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        if transcript_ids.is_empty() {
            return Ok(Vec::new());
        }

        let allowed: HashSet<i64> = transcript_ids.iter().copied().collect();
        let chunks = self.load_all()?;

        let results = rank(
            chunks
                .into_iter()
                .filter(|c| allowed.contains(&c.transcript_id)),
            query_embedding,
            limit,
            min_score,
        );

        debug!("Found {} matching chunks within filter", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_by_transcript(&self, transcript_id: i64) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM chunks WHERE transcript_id = ?1",
            params![transcript_id],
        )?;

        info!("Deleted {} chunks for transcript {}", deleted, transcript_id);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn get_by_transcript(&self, transcript_id: i64) -> Result<Vec<EmbeddedChunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, transcript_id, recorded_on, content, chunk_order, embedding, indexed_at
            FROM chunks
            WHERE transcript_id = ?1
            ORDER BY chunk_order
            "#,
        )?;

        let chunks = stmt.query_map(params![transcript_id], row_to_chunk)?;
        let result: Vec<EmbeddedChunk> = chunks.filter_map(|c| c.ok()).collect();
        debug!("Found {} chunks for transcript {}", result.len(), transcript_id);
        Ok(result)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let chunk = EmbeddedChunk::new(
            1,
            day(2024, 10, 5),
            "Planted tomatoes in the garden".to_string(),
            0,
            vec![1.0, 0.0, 0.0],
        );

        store.upsert(&chunk).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);

        let results = store.search(&[1.0, 0.0, 0.0], 10, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].chunk.recorded_on, day(2024, 10, 5));

        let deleted = store.delete_by_transcript(1).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_within_transcript_filter() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let chunks = vec![
            EmbeddedChunk::new(1, day(2024, 10, 5), "garden notes".to_string(), 0, vec![1.0, 0.0]),
            EmbeddedChunk::new(2, day(2024, 10, 6), "more garden".to_string(), 0, vec![0.9, 0.1]),
            EmbeddedChunk::new(3, day(2024, 11, 1), "unrelated".to_string(), 0, vec![0.8, 0.2]),
        ];
        store.upsert_batch(&chunks).await.unwrap();

        // Only transcripts 1 and 3 are allowed
        let results = store
            .search_within(&[1.0, 0.0], &[1, 3], 10, 0.0)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.chunk.transcript_id != 2));

        // Empty filter set means no results, not an unfiltered search
        let empty = store.search_within(&[1.0, 0.0], &[], 10, 0.0).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_get_by_transcript_ordering() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let mut chunks = vec![
            EmbeddedChunk::new(7, day(2024, 1, 1), "second".to_string(), 1, vec![0.0, 1.0]),
            EmbeddedChunk::new(7, day(2024, 1, 1), "first".to_string(), 0, vec![1.0, 0.0]),
        ];
        chunks.reverse();
        store.upsert_batch(&chunks).await.unwrap();

        let stored = store.get_by_transcript(7).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content, "first");
        assert_eq!(stored[1].content, "second");
    }

    #[tokio::test]
    async fn test_min_score_threshold() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .upsert_batch(&[
                EmbeddedChunk::new(1, day(2024, 1, 1), "close".to_string(), 0, vec![1.0, 0.0]),
                EmbeddedChunk::new(2, day(2024, 1, 1), "far".to_string(), 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "close");
    }
}
