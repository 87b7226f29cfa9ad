//! End-to-end pipeline for Minne.
//!
//! Coordinates ingestion (audio to indexed transcript) and querying
//! (question to count result or generated answer).

use crate::audio::{self, probe_duration};
use crate::chunking::{chunk_transcript, ChunkingConfig};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{MinneError, Result};
use crate::metadata::{date_from_filename, MetadataExtractor, RecordingMetadata};
use crate::query::{HybridSearch, KeywordCounts, QueryIntent, QueryParser};
use crate::rag::{RagEngine, RagResponse};
use crate::store::{NewTranscript, TranscriptStore};
use crate::transcription::{Transcriber, WhisperTranscriber};
use crate::vector_store::{EmbeddedChunk, SqliteVectorStore, VectorStore};
use chrono::{Local, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The main pipeline for ingesting and querying recordings.
pub struct Pipeline {
    settings: Settings,
    prompts: Prompts,
    transcriber: Arc<dyn Transcriber>,
    embedder: Arc<dyn Embedder>,
    store: Arc<TranscriptStore>,
    vector_store: Arc<SqliteVectorStore>,
}

impl Pipeline {
    /// Create a new pipeline from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        // Load prompts (with optional custom directory and variables)
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperTranscriber::with_config(
            &settings.transcription.model,
            settings.audio.chunk_duration_seconds,
            settings.transcription.max_concurrent_chunks,
        ));

        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let store = Arc::new(TranscriptStore::open(&settings.sqlite_path())?);
        let vector_store = Arc::new(SqliteVectorStore::new(&settings.vector_path())?);

        Ok(Self {
            settings,
            prompts,
            transcriber,
            embedder,
            store,
            vector_store,
        })
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        transcriber: Arc<dyn Transcriber>,
        embedder: Arc<dyn Embedder>,
        store: Arc<TranscriptStore>,
        vector_store: Arc<SqliteVectorStore>,
    ) -> Self {
        Self {
            settings,
            prompts,
            transcriber,
            embedder,
            store,
            vector_store,
        }
    }

    /// Get a reference to the relational store.
    pub fn store(&self) -> Arc<TranscriptStore> {
        self.store.clone()
    }

    /// Get a reference to the vector store (as trait object).
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone() as Arc<dyn VectorStore>
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build a query parser with the configured model and prompts.
    pub fn query_parser(&self) -> QueryParser {
        QueryParser::new(&self.settings.llm.model).with_prompts(self.prompts.clone())
    }

    /// Build a hybrid searcher over both stores.
    pub fn hybrid_search(&self) -> HybridSearch {
        HybridSearch::new(self.store(), self.vector_store(), self.embedder())
            .with_min_score(self.settings.llm.min_score)
    }

    /// Build a RAG engine with the configured model and prompts.
    pub fn rag_engine(&self) -> RagEngine {
        RagEngine::new(&self.settings.llm.model, self.settings.llm.temperature)
            .with_prompts(self.prompts.clone())
    }

    /// Process a recording: transcribe, extract metadata, persist, and index.
    #[instrument(skip(self), fields(path = %audio_path.display()))]
    pub async fn process_audio(
        &self,
        audio_path: &Path,
        force: bool,
        keep_audio: bool,
    ) -> Result<ProcessOutcome> {
        let filename = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MinneError::InvalidInput(format!("Bad path: {:?}", audio_path)))?
            .to_string();

        // Skip recordings that were already ingested
        if let Some(existing_id) = self.store.find_by_filename(&filename)? {
            if !force {
                info!("{} is already ingested, skipping", filename);
                return Ok(ProcessOutcome {
                    transcript_id: existing_id,
                    filename,
                    recorded_on: Local::now().date_naive(),
                    word_count: 0,
                    chunks_indexed: 0,
                    skipped: true,
                });
            }

            info!("Re-ingesting {} (force)", filename);
            self.vector_store.delete_by_transcript(existing_id).await?;
            self.store.delete(existing_id)?;
        }

        // Probe duration and enforce the limit before spending API calls
        let duration = probe_duration(audio_path).await?;
        if duration > self.settings.audio.max_duration_seconds as f64 {
            return Err(MinneError::InvalidInput(format!(
                "Recording duration ({:.0} seconds) exceeds maximum ({} seconds)",
                duration, self.settings.audio.max_duration_seconds
            )));
        }

        // Normalize to mono MP3 at the configured sample rate
        let temp_dir = self.settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;
        let stem = Path::new(&filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("recording");
        let normalized = temp_dir.join(format!("{}.mp3", stem));
        audio::normalize_audio(audio_path, &normalized, self.settings.audio.sample_rate).await?;

        // Transcribe
        info!("Transcribing {}", filename);
        eprintln!("  Transcribing...");
        let transcript = match &self.settings.transcription.language {
            Some(lang) if !lang.is_empty() => {
                self.transcriber
                    .transcribe_with_language(&normalized, lang)
                    .await?
            }
            _ => self.transcriber.transcribe(&normalized).await?,
        };
        eprintln!("  Transcription complete ({} segments)", transcript.segments.len());

        if let Err(e) = std::fs::remove_file(&normalized) {
            warn!("Failed to clean up normalized audio: {}", e);
        }

        // Extract metadata
        eprintln!("  Extracting metadata...");
        let recorded_on = date_from_filename(&filename, Local::now().date_naive());
        let extractor =
            MetadataExtractor::new(&self.settings.llm.model).with_prompts(self.prompts.clone());
        let annotations = extractor.extract(&transcript.full_text).await;
        let metadata = RecordingMetadata::new(recorded_on, annotations);
        eprintln!(
            "  Date: {}, {} keywords",
            recorded_on,
            metadata.keywords.len()
        );

        // Save transcript text and metadata sidecar
        let transcript_path = self.save_transcript(&filename, &transcript.full_text)?;
        if let Err(e) = metadata.save_sidecar(&transcript_path) {
            warn!("Failed to save metadata sidecar: {}", e);
        }

        // Insert into the relational store
        let transcript_id = self.store.insert(&NewTranscript {
            filename: filename.clone(),
            recorded_on,
            text: transcript.full_text.clone(),
            keywords: metadata.keywords.clone(),
            entities: metadata.entities.clone(),
            sentiment: metadata.sentiment.clone(),
            duration_seconds: Some(duration),
            file_path: Some(transcript_path.display().to_string()),
        })?;

        // Chunk, embed, index
        eprintln!("  Generating embeddings and indexing...");
        let chunks_indexed = self
            .index_transcript(transcript_id, recorded_on, &transcript)
            .await?;
        eprintln!("  Indexed {} chunks", chunks_indexed);

        // Archive the audio file
        if !keep_audio {
            if let Err(e) = self.archive_audio(audio_path, &filename) {
                warn!("Failed to archive audio file: {}", e);
            }
        }

        let word_count = transcript.word_count();

        Ok(ProcessOutcome {
            transcript_id,
            filename,
            recorded_on,
            word_count,
            chunks_indexed,
            skipped: false,
        })
    }

    /// Answer a natural-language query.
    #[instrument(skip(self), fields(query = %query_text))]
    pub async fn query(&self, query_text: &str) -> Result<QueryOutcome> {
        if query_text.trim().is_empty() {
            return Err(MinneError::InvalidInput("Empty query".to_string()));
        }

        let parsed = self.query_parser().parse(query_text).await;
        info!("Parsed query with intent {}", parsed.intent);

        let today = Local::now().date_naive();
        let hybrid = self.hybrid_search();

        if parsed.intent == QueryIntent::Count {
            let counts = hybrid.count(&parsed, today).await?;
            return Ok(QueryOutcome::Count(counts));
        }

        let memories = hybrid
            .search(
                &parsed,
                self.settings.llm.max_context_chunks as usize,
                today,
            )
            .await?;

        let response = self.rag_engine().answer(query_text, &memories).await?;
        Ok(QueryOutcome::Answer(response))
    }

    /// Delete a transcript from both stores.
    pub async fn delete_transcript(&self, id: i64) -> Result<()> {
        let removed = self.store.delete(id)?;
        if removed == 0 {
            return Err(MinneError::RecordingNotFound(id.to_string()));
        }
        self.vector_store.delete_by_transcript(id).await?;
        Ok(())
    }

    /// Write the transcript text file under the data directory.
    fn save_transcript(&self, filename: &str, text: &str) -> Result<PathBuf> {
        let transcripts_dir = self.settings.transcripts_dir();
        std::fs::create_dir_all(&transcripts_dir)?;

        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let path = transcripts_dir.join(format!("{}.txt", stem));
        std::fs::write(&path, text)?;
        Ok(path)
    }

    /// Chunk a transcript, embed the chunks, and index them.
    async fn index_transcript(
        &self,
        transcript_id: i64,
        recorded_on: NaiveDate,
        transcript: &crate::transcription::Transcript,
    ) -> Result<usize> {
        let config = ChunkingConfig {
            target_duration: self.settings.chunking.target_chunk_seconds,
            min_duration: self.settings.chunking.min_chunk_seconds,
            max_duration: self.settings.chunking.max_chunk_seconds,
        };

        let chunks = chunk_transcript(transcript, &config);
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let documents: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                EmbeddedChunk::new(
                    transcript_id,
                    recorded_on,
                    chunk.content,
                    chunk.order,
                    embedding,
                )
            })
            .collect();

        self.vector_store.upsert_batch(&documents).await
    }

    /// Move a processed audio file into the archive directory.
    fn archive_audio(&self, audio_path: &Path, filename: &str) -> Result<PathBuf> {
        let processed_dir = self.settings.processed_dir();
        std::fs::create_dir_all(&processed_dir)?;

        let mut dest = processed_dir.join(filename);

        // Don't overwrite an existing archived file
        if dest.exists() {
            let stem = Path::new(filename)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(filename);
            let ext = Path::new(filename)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("mp3");
            dest = processed_dir.join(format!("{}_{}.{}", stem, Utc::now().timestamp(), ext));
        }

        // rename fails across filesystems; fall back to copy + remove
        if std::fs::rename(audio_path, &dest).is_err() {
            std::fs::copy(audio_path, &dest)?;
            std::fs::remove_file(audio_path)?;
        }

        info!("Archived {} to {:?}", filename, dest);
        Ok(dest)
    }
}

/// Result of processing a recording.
#[derive(Debug)]
pub struct ProcessOutcome {
    /// Id of the transcript in the relational store.
    pub transcript_id: i64,
    /// Original audio filename.
    pub filename: String,
    /// Recording date derived from the filename.
    pub recorded_on: NaiveDate,
    /// Word count of the transcript.
    pub word_count: usize,
    /// Number of chunks indexed in the vector store.
    pub chunks_indexed: usize,
    /// Whether processing was skipped (already ingested).
    pub skipped: bool,
}

/// Result of a query: either keyword counts or a generated answer.
#[derive(Debug)]
pub enum QueryOutcome {
    Count(KeywordCounts),
    Answer(RagResponse),
}
