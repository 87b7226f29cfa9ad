//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, EmbeddedChunk, SearchResult, VectorStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    chunks: RwLock<HashMap<String, EmbeddedChunk>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }

    fn rank(
        candidates: Vec<EmbeddedChunk>,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .map(|chunk| {
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                SearchResult { chunk, score }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        results
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, chunk: &EmbeddedChunk) -> Result<()> {
        let mut chunks = self.chunks.write().unwrap();
        chunks.insert(chunk.id.to_string(), chunk.clone());
        Ok(())
    }

    async fn upsert_batch(&self, batch: &[EmbeddedChunk]) -> Result<usize> {
        let mut chunks = self.chunks.write().unwrap();
        for chunk in batch {
            chunks.insert(chunk.id.to_string(), chunk.clone());
        }
        Ok(batch.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let chunks = self.chunks.read().unwrap();
        let candidates: Vec<EmbeddedChunk> = chunks.values().cloned().collect();
        Ok(Self::rank(candidates, query_embedding, limit, min_score))
    }

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
        let chunks = self.chunks.read().unwrap();
        let candidates: Vec<EmbeddedChunk> = chunks
            .values()
            .filter(|c| allowed.contains(&c.transcript_id))
            .cloned()
            .collect();

        Ok(Self::rank(candidates, query_embedding, limit, min_score))
    }

    async fn delete_by_transcript(&self, transcript_id: i64) -> Result<usize> {
        let mut chunks = self.chunks.write().unwrap();
        let initial_len = chunks.len();
        chunks.retain(|_, chunk| chunk.transcript_id != transcript_id);
        Ok(initial_len - chunks.len())
    }

    async fn get_by_transcript(&self, transcript_id: i64) -> Result<Vec<EmbeddedChunk>> {
        let chunks = self.chunks.read().unwrap();
        let mut result: Vec<EmbeddedChunk> = chunks
            .values()
            .filter(|c| c.transcript_id == transcript_id)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.chunk_order);
        Ok(result)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let chunk1 = EmbeddedChunk::new(1, day(2024, 10, 5), "Hello world".to_string(), 0, vec![1.0, 0.0, 0.0]);
        let chunk2 = EmbeddedChunk::new(1, day(2024, 10, 5), "Goodbye world".to_string(), 1, vec![0.0, 1.0, 0.0]);

        store.upsert_batch(&[chunk1, chunk2]).await.unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10, 0.0).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);

        let ordered = store.get_by_transcript(1).await.unwrap();
        assert_eq!(ordered[0].content, "Hello world");

        let deleted = store.delete_by_transcript(1).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_search_within() {
        let store = MemoryVectorStore::new();

        store
            .upsert_batch(&[
                EmbeddedChunk::new(1, day(2024, 1, 1), "a".to_string(), 0, vec![1.0, 0.0]),
                EmbeddedChunk::new(2, day(2024, 1, 2), "b".to_string(), 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search_within(&[1.0, 0.0], &[2], 10, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.transcript_id, 2);
    }
}
