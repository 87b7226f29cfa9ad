//! Transcription module for Minne.
//!
//! Handles speech-to-text transcription of voice recordings using the
//! OpenAI Whisper API.

mod models;
mod whisper;

pub use models::{format_timestamp, Transcript, TranscriptSegment};
pub use whisper::{is_api_key_configured, WhisperTranscriber};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file and return segments with timestamps.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;

    /// Transcribe an audio file with a specific language hint.
    async fn transcribe_with_language(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<Transcript>;
}
