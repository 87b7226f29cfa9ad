//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// A complete transcript with segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Source recording this transcript belongs to (file stem).
    pub source: String,
    /// Individual transcript segments with timestamps.
    pub segments: Vec<TranscriptSegment>,
    /// Full transcript text (concatenated segments).
    pub full_text: String,
    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(source: String, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let duration_seconds = segments
            .last()
            .map(|s| s.end_seconds)
            .unwrap_or(0.0);

        Self {
            source,
            segments,
            full_text,
            duration_seconds,
        }
    }

    /// Number of whitespace-separated words in the transcript.
    pub fn word_count(&self) -> usize {
        self.full_text.split_whitespace().count()
    }

    /// Get the text content between two timestamps.
    pub fn text_between(&self, start: f64, end: f64) -> String {
        self.segments
            .iter()
            .filter(|s| s.start_seconds >= start && s.end_seconds <= end)
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A single segment of a transcript with timestamp information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_creation() {
        let segments = vec![
            TranscriptSegment::new(0.0, 5.0, "Hello world".to_string()),
            TranscriptSegment::new(5.0, 10.0, "This is a test".to_string()),
        ];

        let transcript = Transcript::new("2024-10-05_note".to_string(), segments);

        assert_eq!(transcript.source, "2024-10-05_note");
        assert_eq!(transcript.full_text, "Hello world This is a test");
        assert_eq!(transcript.duration_seconds, 10.0);
        assert_eq!(transcript.word_count(), 6);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.0), "01:05");
        assert_eq!(format_timestamp(3665.0), "01:01:05");
    }

    #[test]
    fn test_text_between() {
        let segments = vec![
            TranscriptSegment::new(0.0, 5.0, "First".to_string()),
            TranscriptSegment::new(5.0, 10.0, "Second".to_string()),
            TranscriptSegment::new(10.0, 15.0, "Third".to_string()),
        ];

        let transcript = Transcript::new("test".to_string(), segments);
        assert_eq!(transcript.text_between(5.0, 10.0), "Second");
    }
}
