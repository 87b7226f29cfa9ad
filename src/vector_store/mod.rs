//! Vector store abstraction for Minne.
//!
//! Provides a trait-based interface for different vector database backends.
//! Chunks carry a back-reference to their parent transcript in the
//! relational store, which is what lets hybrid queries constrain semantic
//! search to a date-filtered set of transcripts.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A transcript chunk stored with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Unique chunk ID.
    pub id: Uuid,
    /// Parent transcript in the relational store.
    pub transcript_id: i64,
    /// Recording date of the parent transcript (denormalized for display).
    pub recorded_on: NaiveDate,
    /// Text content of this chunk.
    pub content: String,
    /// Order of this chunk within the transcript.
    pub chunk_order: i32,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl EmbeddedChunk {
    /// Create a new embedded chunk.
    pub fn new(
        transcript_id: i64,
        recorded_on: NaiveDate,
        content: String,
        chunk_order: i32,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript_id,
            recorded_on,
            content,
            chunk_order,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: EmbeddedChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a chunk with its embedding.
    async fn upsert(&self, chunk: &EmbeddedChunk) -> Result<()>;

    /// Bulk upsert chunks.
    async fn upsert_batch(&self, chunks: &[EmbeddedChunk]) -> Result<usize>;

    /// Search for similar chunks with a minimum similarity threshold.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Search for similar chunks restricted to the given transcripts.
    ///
    /// This is the hybrid-search constraint: the caller date-filters
    /// transcript ids in the relational store first.
    async fn search_within(
        &self,
        query_embedding: &[f32],
        transcript_ids: &[i64],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Delete all chunks belonging to a transcript.
    async fn delete_by_transcript(&self, transcript_id: i64) -> Result<usize>;

    /// Get all chunks of a transcript in order.
    async fn get_by_transcript(&self, transcript_id: i64) -> Result<Vec<EmbeddedChunk>>;

    /// Total number of stored chunks.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
