//! Hybrid retrieval combining SQL date filtering with vector semantic search.
//!
//! Date filters narrow the candidate set in the relational store first; the
//! vector search then runs only within those transcripts. Count queries skip
//! the vector store entirely and count keyword occurrences in the matching
//! transcript texts.

use super::dates::{describe_range, parse_date_expr, DateRange};
use super::parser::ParsedQuery;
use crate::embedding::Embedder;
use crate::error::{MinneError, Result};
use crate::store::{TranscriptRecord, TranscriptStore};
use crate::vector_store::VectorStore;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A retrieved memory excerpt with its relational metadata attached.
#[derive(Debug, Clone)]
pub struct RetrievedMemory {
    pub transcript_id: i64,
    pub recorded_on: NaiveDate,
    /// Original audio filename, when the relational record is available.
    pub filename: Option<String>,
    /// Keywords of the parent transcript.
    pub keywords: Vec<String>,
    /// Text of the matched chunk.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl RetrievedMemory {
    /// Recording date formatted for display.
    pub fn format_date(&self) -> String {
        self.recorded_on.format("%B %d, %Y").to_string()
    }
}

/// Result of a count query.
#[derive(Debug, Clone)]
pub struct KeywordCounts {
    /// Mention count per keyword, in query order.
    pub counts: Vec<(String, u64)>,
    /// Sum of all keyword mentions.
    pub total_mentions: u64,
    /// Distinct recording dates with at least one mention, sorted.
    pub matching_dates: Vec<NaiveDate>,
    /// Human-readable description of the searched period.
    pub date_range: String,
}

/// Hybrid search over the relational store and the vector store.
pub struct HybridSearch {
    store: Arc<TranscriptStore>,
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl HybridSearch {
    pub fn new(
        store: Arc<TranscriptStore>,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            vector_store,
            embedder,
            min_score: 0.0,
        }
    }

    /// Set the minimum similarity score for vector hits.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Resolve the query's date filters against `today`.
    ///
    /// Unparseable expressions are dropped (never treated as match-nothing).
    fn resolve_ranges(parsed: &ParsedQuery, today: NaiveDate) -> Vec<DateRange> {
        parsed
            .date_filters
            .iter()
            .filter_map(|expr| parse_date_expr(expr, today))
            .collect()
    }

    /// Retrieve memory excerpts for a recall/insight/general query.
    ///
    /// When at least one date filter resolves, the vector search is
    /// constrained to transcripts recorded in any of the ranges; zero
    /// matching transcripts short-circuits to an empty result.
    #[instrument(skip(self, parsed), fields(intent = %parsed.intent))]
    pub async fn search(
        &self,
        parsed: &ParsedQuery,
        max_results: usize,
        today: NaiveDate,
    ) -> Result<Vec<RetrievedMemory>> {
        let ranges = Self::resolve_ranges(parsed, today);
        let date_filtered = !ranges.is_empty();

        // Step 1: date filter in the relational store
        let transcript_ids = if date_filtered {
            let mut ids: Vec<i64> = Vec::new();
            let mut seen = HashSet::new();
            for range in &ranges {
                for id in self.store.ids_in_range(range.start, range.end)? {
                    if seen.insert(id) {
                        ids.push(id);
                    }
                }
            }

            if ids.is_empty() {
                info!("Date filter matched no transcripts");
                return Ok(Vec::new());
            }

            debug!("Date filter narrowed to {} transcripts", ids.len());
            Some(ids)
        } else {
            None
        };

        // Step 2: semantic search, constrained when date-filtered.
        // The embedded text is the keyword set; "memory" is the neutral
        // fallback when the parser extracted none.
        let search_text = if parsed.keywords.is_empty() {
            "memory".to_string()
        } else {
            parsed.keywords.join(" ")
        };

        let query_embedding = self.embedder.embed(&search_text).await?;

        let results = match &transcript_ids {
            Some(ids) => {
                self.vector_store
                    .search_within(&query_embedding, ids, max_results, self.min_score)
                    .await?
            }
            None => {
                self.vector_store
                    .search(&query_embedding, max_results, self.min_score)
                    .await?
            }
        };

        // Step 3: attach relational metadata to the hits
        let mut records: HashMap<i64, TranscriptRecord> = HashMap::new();
        for result in &results {
            let id = result.chunk.transcript_id;
            if !records.contains_key(&id) {
                if let Some(record) = self.store.get(id)? {
                    records.insert(id, record);
                }
            }
        }

        let memories = results
            .into_iter()
            .map(|result| {
                let record = records.get(&result.chunk.transcript_id);
                RetrievedMemory {
                    transcript_id: result.chunk.transcript_id,
                    recorded_on: result.chunk.recorded_on,
                    filename: record.map(|r| r.filename.clone()),
                    keywords: record.map(|r| r.keywords.clone()).unwrap_or_default(),
                    content: result.chunk.content,
                    score: result.score,
                }
            })
            .collect();

        Ok(memories)
    }

    /// Count keyword mentions across transcripts in the requested period.
    #[instrument(skip(self, parsed))]
    pub async fn count(&self, parsed: &ParsedQuery, today: NaiveDate) -> Result<KeywordCounts> {
        if parsed.keywords.is_empty() {
            return Err(MinneError::Query(
                "No keywords provided for counting".to_string(),
            ));
        }

        let ranges = Self::resolve_ranges(parsed, today);

        // Collect candidate transcripts, deduplicated across ranges
        let records: Vec<TranscriptRecord> = if ranges.is_empty() {
            self.store.all_records()?
        } else {
            let mut seen = HashSet::new();
            let mut all = Vec::new();
            for range in &ranges {
                for record in self.store.records_in_range(range.start, range.end)? {
                    if seen.insert(record.id) {
                        all.push(record);
                    }
                }
            }
            all
        };

        let mut counts: Vec<(String, u64)> =
            parsed.keywords.iter().map(|k| (k.clone(), 0)).collect();
        let mut matching_dates: Vec<NaiveDate> = Vec::new();

        for record in &records {
            let text = record.text.to_lowercase();
            let mut matched = false;

            for (keyword, count) in counts.iter_mut() {
                let occurrences = count_occurrences(&text, &keyword.to_lowercase());
                if occurrences > 0 {
                    *count += occurrences;
                    matched = true;
                }
            }

            if matched {
                matching_dates.push(record.recorded_on);
            }
        }

        matching_dates.sort();
        matching_dates.dedup();

        let total_mentions = counts.iter().map(|(_, c)| c).sum();

        let date_range = match (&parsed.time_range, ranges.as_slice()) {
            (Some(phrase), _) => phrase.clone(),
            (None, [range]) => describe_range(range),
            (None, _) => "all time".to_string(),
        };

        info!(
            "Counted {} mentions across {} transcripts",
            total_mentions,
            records.len()
        );

        Ok(KeywordCounts {
            counts,
            total_mentions,
            matching_dates,
            date_range,
        })
    }
}

/// Count non-overlapping case-sensitive occurrences of `needle` in `haystack`.
/// Callers lowercase both sides for case-insensitive counting.
fn count_occurrences(haystack: &str, needle: &str) -> u64 {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::QueryIntent;
    use crate::store::NewTranscript;
    use crate::vector_store::{EmbeddedChunk, MemoryVectorStore};
    use async_trait::async_trait;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Deterministic embedder: "garden"-flavored text maps to one axis,
    /// everything else to the other.
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("garden") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn transcript(filename: &str, date: NaiveDate, text: &str, keywords: &[&str]) -> NewTranscript {
        NewTranscript {
            filename: filename.to_string(),
            recorded_on: date,
            text: text.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            entities: vec![],
            sentiment: None,
            duration_seconds: None,
            file_path: None,
        }
    }

    fn parsed(
        intent: QueryIntent,
        date_filters: &[&str],
        keywords: &[&str],
        count_request: bool,
    ) -> ParsedQuery {
        ParsedQuery {
            intent,
            date_filters: date_filters.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            time_range: None,
            count_request,
        }
    }

    async fn fixture() -> (HybridSearch, i64, i64) {
        let store = Arc::new(TranscriptStore::in_memory().unwrap());
        let vectors = Arc::new(MemoryVectorStore::new());

        let october_id = store
            .insert(&transcript(
                "2024-10-05_note.mp3",
                day(2024, 10, 5),
                "Spent the morning in the garden planting garlic",
                &["garden", "garlic"],
            ))
            .unwrap();

        let november_id = store
            .insert(&transcript(
                "2024-11-02_note.mp3",
                day(2024, 11, 2),
                "The garden is done for the year, started reading instead",
                &["garden", "reading"],
            ))
            .unwrap();

        vectors
            .upsert_batch(&[
                EmbeddedChunk::new(
                    october_id,
                    day(2024, 10, 5),
                    "Spent the morning in the garden planting garlic".to_string(),
                    0,
                    vec![1.0, 0.0],
                ),
                EmbeddedChunk::new(
                    november_id,
                    day(2024, 11, 2),
                    "The garden is done for the year, started reading instead".to_string(),
                    0,
                    vec![0.9, 0.1],
                ),
            ])
            .await
            .unwrap();

        let hybrid = HybridSearch::new(store, vectors, Arc::new(StubEmbedder));
        (hybrid, october_id, november_id)
    }

    #[tokio::test]
    async fn test_search_without_date_filter() {
        let (hybrid, _, _) = fixture().await;
        let today = day(2024, 11, 15);

        let query = parsed(QueryIntent::General, &[], &["garden"], false);
        let memories = hybrid.search(&query, 10, today).await.unwrap();

        assert_eq!(memories.len(), 2);
        // Metadata from the relational store is attached
        assert!(memories[0].filename.is_some());
        assert!(memories[0].keywords.contains(&"garden".to_string()));
    }

    #[tokio::test]
    async fn test_search_respects_date_filter() {
        let (hybrid, october_id, _) = fixture().await;
        let today = day(2024, 11, 15);

        let query = parsed(QueryIntent::Recall, &["October 2024"], &["garden"], false);
        let memories = hybrid.search(&query, 10, today).await.unwrap();

        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].transcript_id, october_id);
        assert_eq!(memories[0].recorded_on, day(2024, 10, 5));
    }

    #[tokio::test]
    async fn test_search_empty_date_match_short_circuits() {
        let (hybrid, _, _) = fixture().await;
        let today = day(2024, 11, 15);

        // A resolvable range with no transcripts must yield nothing,
        // never an unfiltered semantic search
        let query = parsed(QueryIntent::Recall, &["January 2020"], &["garden"], false);
        let memories = hybrid.search(&query, 10, today).await.unwrap();

        assert!(memories.is_empty());
    }

    #[tokio::test]
    async fn test_search_ignores_unparseable_dates() {
        let (hybrid, _, _) = fixture().await;
        let today = day(2024, 11, 15);

        // "sometime" resolves to nothing, so the search runs unfiltered
        let query = parsed(QueryIntent::Recall, &["sometime"], &["garden"], false);
        let memories = hybrid.search(&query, 10, today).await.unwrap();

        assert_eq!(memories.len(), 2);
    }

    #[tokio::test]
    async fn test_count_query_with_date_range() {
        let (hybrid, _, _) = fixture().await;
        let today = day(2024, 11, 15);

        let query = parsed(QueryIntent::Count, &["October 2024"], &["garden"], true);
        let counts = hybrid.count(&query, today).await.unwrap();

        assert_eq!(counts.counts, vec![("garden".to_string(), 1)]);
        assert_eq!(counts.total_mentions, 1);
        assert_eq!(counts.matching_dates, vec![day(2024, 10, 5)]);
        assert_eq!(counts.date_range, "October 01 - 31, 2024");
    }

    #[tokio::test]
    async fn test_count_query_all_time() {
        let (hybrid, _, _) = fixture().await;
        let today = day(2024, 11, 15);

        let query = parsed(QueryIntent::Count, &[], &["garden", "garlic"], true);
        let counts = hybrid.count(&query, today).await.unwrap();

        // "garden" appears once in each transcript, "garlic" once total
        assert_eq!(
            counts.counts,
            vec![("garden".to_string(), 2), ("garlic".to_string(), 1)]
        );
        assert_eq!(counts.total_mentions, 3);
        assert_eq!(counts.matching_dates.len(), 2);
        assert_eq!(counts.date_range, "all time");
    }

    #[tokio::test]
    async fn test_count_requires_keywords() {
        let (hybrid, _, _) = fixture().await;
        let today = day(2024, 11, 15);

        let query = parsed(QueryIntent::Count, &[], &[], true);
        let result = hybrid.count(&query, today).await;

        assert!(matches!(result, Err(MinneError::Query(_))));
    }

    #[tokio::test]
    async fn test_count_uses_time_range_phrase() {
        let (hybrid, _, _) = fixture().await;
        let today = day(2024, 11, 15);

        let mut query = parsed(QueryIntent::Count, &["last month"], &["garden"], true);
        query.time_range = Some("last month".to_string());

        let counts = hybrid.count(&query, today).await.unwrap();
        assert_eq!(counts.date_range, "last month");
        // Window is Oct 16 - Nov 15, which covers only the November note
        assert_eq!(counts.total_mentions, 1);
        assert_eq!(counts.matching_dates, vec![day(2024, 11, 2)]);
    }

    #[test]
    fn test_count_occurrences() {
        assert_eq!(count_occurrences("garden garden garden", "garden"), 3);
        assert_eq!(count_occurrences("gardening in the garden", "garden"), 2);
        assert_eq!(count_occurrences("nothing here", "garden"), 0);
        assert_eq!(count_occurrences("text", ""), 0);
    }
}
