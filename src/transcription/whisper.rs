//! OpenAI Whisper transcription implementation.

use super::{Transcriber, Transcript, TranscriptSegment};
use crate::audio::split_audio;
use crate::error::{MinneError, Result};
use crate::openai::create_client;
use async_openai::types::{AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with default settings.
    pub fn new() -> Self {
        Self::with_config("whisper-1", 120, 3)
    }

    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(
        model: &str,
        chunk_duration_seconds: u32,
        max_concurrent_chunks: usize,
    ) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            chunk_duration_seconds,
            max_concurrent_chunks,
        }
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if let Some(lang) = language {
            request_builder.language(lang);
        }

        let request = request_builder.build()
            .map_err(|e| MinneError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self.client.audio().transcribe_verbose_json(request).await
            .map_err(|e| MinneError::OpenAI(format!("Whisper API error: {}", e)))?;

        // Parse segments from verbose JSON response
        let segments: Vec<TranscriptSegment> = response.segments
            .map(|segs| {
                segs.iter()
                    .map(|s| TranscriptSegment::new(
                        s.start as f64,
                        s.end as f64,
                        s.text.trim().to_string(),
                    ))
                    .collect()
            })
            .unwrap_or_else(|| {
                // Fallback: create single segment from full text
                vec![TranscriptSegment::new(
                    0.0,
                    response.duration as f64,
                    response.text.trim().to_string(),
                )]
            });

        debug!("Transcribed {} segments", segments.len());
        Ok(segments)
    }

    /// Transcribe an audio file, splitting if necessary.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_with_splitting(
        &self,
        audio_path: &Path,
        language: Option<&str>,
        source: &str,
    ) -> Result<Transcript> {
        let temp_dir = tempfile::tempdir()?;
        let chunks = split_audio(audio_path, temp_dir.path(), self.chunk_duration_seconds).await?;

        if chunks.len() == 1 {
            // No splitting needed
            let segments = self.transcribe_single(audio_path, language).await?;
            return Ok(Transcript::new(source.to_string(), segments));
        }

        let chunk_count = chunks.len();
        info!("Processing {} audio chunks with {}", chunk_count, self.model);

        // Create progress bar
        let pb = Arc::new(ProgressBar::new(chunk_count as u64));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Whisper   [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("█▓░"),
        );

        // Process chunks in parallel with concurrency limit, fail fast on error
        let mut results: Vec<(usize, f64, Vec<TranscriptSegment>)> = Vec::with_capacity(chunk_count);

        let mut stream = stream::iter(chunks.into_iter().enumerate())
            .map(|(idx, (chunk_path, time_offset))| {
                let language = language.map(|s| s.to_string());
                async move {
                    let result = self.transcribe_single(&chunk_path, language.as_deref()).await;
                    (idx, time_offset, result)
                }
            })
            .buffer_unordered(self.max_concurrent_chunks);

        while let Some((idx, time_offset, result)) = stream.next().await {
            pb.inc(1);
            match result {
                Ok(segments) => results.push((idx, time_offset, segments)),
                Err(e) => {
                    pb.finish_and_clear();
                    drop(temp_dir);
                    let err_msg = format!("Chunk {} at {:.0}s failed: {}", idx, time_offset, e);
                    eprintln!("  Error: {}", err_msg);
                    return Err(MinneError::Transcription(err_msg));
                }
            }
        }

        pb.finish_and_clear();

        // Sort by chunk index and merge segments
        results.sort_by_key(|(idx, _, _)| *idx);

        let mut all_segments = Vec::new();
        for (_, time_offset, mut segments) in results {
            // Adjust timestamps by the chunk's time offset
            for segment in &mut segments {
                segment.start_seconds += time_offset;
                segment.end_seconds += time_offset;
            }
            all_segments.extend(segments);
        }

        // Clean up temp files
        drop(temp_dir);

        Ok(Transcript::new(source.to_string(), all_segments))
    }
}

impl Default for WhisperTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let source = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        self.transcribe_with_splitting(audio_path, None, &source).await
    }

    async fn transcribe_with_language(&self, audio_path: &Path, language: &str) -> Result<Transcript> {
        let source = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        self.transcribe_with_splitting(audio_path, Some(language), &source).await
    }
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok()
}
