//! Transcript chunking for embedding.
//!
//! Splits a transcript into sub-spans that become the unit of embedding and
//! retrieval. Chunk boundaries follow segment timestamps.

use crate::transcription::Transcript;
use serde::{Deserialize, Serialize};

/// A chunk of transcript text ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Order of this chunk in the transcript.
    pub order: i32,
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk duration in seconds.
    pub target_duration: u32,
    /// Minimum chunk duration in seconds.
    pub min_duration: u32,
    /// Maximum chunk duration in seconds.
    pub max_duration: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_duration: 120,
            min_duration: 30,
            max_duration: 300,
        }
    }
}

/// Split a transcript into duration-based chunks.
///
/// Segments that overlap a chunk window are joined into that chunk. Short
/// transcripts become a single chunk; empty transcripts produce none.
pub fn chunk_transcript(transcript: &Transcript, config: &ChunkingConfig) -> Vec<TextChunk> {
    if transcript.segments.is_empty() {
        return Vec::new();
    }

    // Very short recordings don't need splitting
    if transcript.duration_seconds <= config.min_duration as f64 {
        return vec![TextChunk {
            content: transcript.full_text.clone(),
            start_seconds: 0.0,
            end_seconds: transcript.duration_seconds,
            order: 0,
        }];
    }

    let target_duration = config.target_duration as f64;
    let total_duration = transcript.duration_seconds;

    let mut chunks = Vec::new();
    let mut chunk_start = 0.0;
    let mut chunk_order = 0;

    while chunk_start < total_duration {
        let chunk_end = (chunk_start + target_duration).min(total_duration);

        // Collect all segments that overlap this time range
        let chunk_content: String = transcript
            .segments
            .iter()
            .filter(|seg| seg.start_seconds < chunk_end && seg.end_seconds > chunk_start)
            .map(|seg| seg.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if !chunk_content.trim().is_empty() {
            chunks.push(TextChunk {
                content: chunk_content.trim().to_string(),
                start_seconds: chunk_start,
                end_seconds: chunk_end,
                order: chunk_order,
            });
            chunk_order += 1;
        }

        chunk_start = chunk_end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptSegment;

    #[test]
    fn test_chunking_by_duration() {
        let segments = vec![
            TranscriptSegment::new(0.0, 30.0, "First segment".to_string()),
            TranscriptSegment::new(30.0, 60.0, "Second segment".to_string()),
            TranscriptSegment::new(60.0, 90.0, "Third segment".to_string()),
            TranscriptSegment::new(90.0, 120.0, "Fourth segment".to_string()),
        ];

        let transcript = Transcript::new("test".to_string(), segments);

        let config = ChunkingConfig {
            target_duration: 60,
            min_duration: 30,
            max_duration: 120,
        };

        let chunks = chunk_transcript(&transcript, &config);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.contains("First"));
        assert!(chunks[0].content.contains("Second"));
        assert!(chunks[1].content.contains("Third"));
        assert!(chunks[1].content.contains("Fourth"));
        assert_eq!(chunks[0].order, 0);
        assert_eq!(chunks[1].order, 1);
    }

    #[test]
    fn test_short_transcript_single_chunk() {
        let segments = vec![TranscriptSegment::new(0.0, 12.0, "Quick note".to_string())];
        let transcript = Transcript::new("test".to_string(), segments);

        let chunks = chunk_transcript(&transcript, &ChunkingConfig::default());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Quick note");
    }

    #[test]
    fn test_empty_transcript() {
        let transcript = Transcript::new("test".to_string(), vec![]);
        let chunks = chunk_transcript(&transcript, &ChunkingConfig::default());
        assert!(chunks.is_empty());
    }
}
