//! Metadata extraction for ingested recordings.
//!
//! Derives the recording date from the audio filename and extracts keywords,
//! entities, and sentiment from the transcript text. Extraction uses an LLM
//! call returning JSON, with a heuristic token-based fallback when the call
//! or the parse fails.

use crate::config::Prompts;
use crate::error::{MinneError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Maximum number of keywords kept per recording.
const MAX_KEYWORDS: usize = 15;

/// Metadata extracted for a single recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Calendar date the recording was made.
    pub recorded_on: NaiveDate,
    /// Topic keywords extracted from the transcript.
    pub keywords: Vec<String>,
    /// People, organizations, and places mentioned.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Overall tone (positive, neutral, negative).
    #[serde(default)]
    pub sentiment: Option<String>,
}

impl RecordingMetadata {
    /// Combine a recording date with extracted annotations.
    pub fn new(recorded_on: NaiveDate, annotations: TranscriptAnnotations) -> Self {
        Self {
            recorded_on,
            keywords: annotations.keywords,
            entities: annotations.entities,
            sentiment: annotations.sentiment,
        }
    }

    /// Save metadata as a JSON sidecar next to the transcript file.
    pub fn save_sidecar(&self, transcript_path: &Path) -> Result<std::path::PathBuf> {
        let sidecar = transcript_path.with_extension("metadata.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&sidecar, json)?;
        Ok(sidecar)
    }
}

/// Annotations extracted from transcript text, before a date is attached.
#[derive(Debug, Clone, Default)]
pub struct TranscriptAnnotations {
    pub keywords: Vec<String>,
    pub entities: Vec<String>,
    pub sentiment: Option<String>,
}

/// Derive the recording date from an audio filename.
///
/// Recognized formats, tried in order:
/// - `YYYY-MM-DD_anything.ext` (date before the first underscore)
/// - `YYMMDD_HHMM.ext` (compact date in the first six characters)
///
/// Anything else falls back to `today`.
pub fn date_from_filename(filename: &str, today: NaiveDate) -> NaiveDate {
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);

    if let Some((prefix, _)) = stem.split_once('_') {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date;
        }
        if prefix.len() == 6 {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, "%y%m%d") {
                return date;
            }
        }
    } else if let Some(prefix) = stem.get(..6) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%y%m%d") {
            return date;
        }
    }

    today
}

/// Raw extraction result from the LLM.
#[derive(Debug, Deserialize)]
struct LlmExtraction {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    sentiment: Option<String>,
}

/// LLM-backed metadata extractor with a heuristic fallback.
pub struct MetadataExtractor {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl MetadataExtractor {
    pub fn new(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Extract keywords, entities, and sentiment from a transcript.
    ///
    /// Falls back to heuristic keyword extraction if the LLM call fails or
    /// returns something unparseable.
    pub async fn extract(&self, transcript: &str) -> TranscriptAnnotations {
        match self.extract_with_llm(transcript).await {
            Ok(extraction) => {
                let mut keywords: Vec<String> = extraction
                    .keywords
                    .into_iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                keywords.dedup();
                keywords.truncate(MAX_KEYWORDS);

                info!("Extracted {} keywords via LLM", keywords.len());

                TranscriptAnnotations {
                    keywords,
                    entities: extraction.entities,
                    sentiment: extraction.sentiment,
                }
            }
            Err(e) => {
                warn!("LLM metadata extraction failed, using heuristic fallback: {}", e);
                TranscriptAnnotations {
                    keywords: heuristic_keywords(transcript),
                    entities: Vec::new(),
                    sentiment: None,
                }
            }
        }
    }

    async fn extract_with_llm(&self, transcript: &str) -> Result<LlmExtraction> {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), transcript.to_string());

        let system_message = self
            .prompts
            .render_with_custom(&self.prompts.metadata.system, &vars);
        let user_message = self
            .prompts
            .render_with_custom(&self.prompts.metadata.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()
                .map_err(|e| MinneError::Metadata(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(|e| MinneError::Metadata(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(|e| MinneError::Metadata(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            MinneError::OpenAI(format!("Failed to get extraction response: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| MinneError::Metadata("Empty response from LLM".to_string()))?;

        debug!("LLM extraction response: {}", &content[..content.len().min(500)]);

        parse_extraction(content)
    }
}

/// Parse the LLM response into an extraction, tolerating surrounding prose.
fn parse_extraction(response: &str) -> Result<LlmExtraction> {
    let json_start = response.find('{');
    let json_end = response.rfind('}');

    let json_str = match (json_start, json_end) {
        (Some(start), Some(end)) if end > start => &response[start..=end],
        _ => response,
    };

    serde_json::from_str(json_str).map_err(|e| {
        MinneError::Metadata(format!(
            "Failed to parse extraction response: {}. Response was: {}",
            e,
            &response[..response.len().min(500)]
        ))
    })
}

/// Common words excluded from heuristic keyword extraction.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "been", "before", "being", "could",
    "did", "doing", "down", "from", "going", "gonna", "have", "having",
    "here", "into", "just", "like", "many", "more", "most", "much", "need", "only",
    "other", "over", "really", "said", "should", "some", "something",
    "that", "them", "then", "there", "these", "they", "thing", "things",
    "this", "those", "today", "very", "want", "well", "went", "were",
    "what", "when", "where", "which", "will", "with", "would", "your",
];

/// Heuristic keyword extraction: stopword-filtered tokens longer than three
/// characters, deduplicated in order of first appearance.
pub fn heuristic_keywords(text: &str) -> Vec<String> {
    let word_re = regex::Regex::new(r"[a-zA-Z][a-zA-Z']+").expect("valid regex");

    let mut seen = std::collections::HashSet::new();
    let mut keywords = Vec::new();

    for token in word_re.find_iter(text) {
        let word = token.as_str().to_lowercase();
        if word.len() <= 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if seen.insert(word.clone()) {
            keywords.push(word);
        }
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
    }

    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_from_iso_filename() {
        let today = day(2025, 1, 1);
        assert_eq!(
            date_from_filename("2024-10-05_note.mp3", today),
            day(2024, 10, 5)
        );
    }

    #[test]
    fn test_date_from_compact_filename() {
        let today = day(2025, 1, 1);
        assert_eq!(
            date_from_filename("250206_1156.mp3", today),
            day(2025, 2, 6)
        );
        // Compact form without an underscore
        assert_eq!(date_from_filename("250206.wav", today), day(2025, 2, 6));
    }

    #[test]
    fn test_date_fallback_to_today() {
        let today = day(2025, 3, 14);
        assert_eq!(date_from_filename("groceries.mp3", today), today);
        assert_eq!(date_from_filename("abc_def.mp3", today), today);
    }

    #[test]
    fn test_heuristic_keywords() {
        let keywords = heuristic_keywords(
            "I went to the dentist today and talked about the insurance paperwork",
        );
        assert!(keywords.contains(&"dentist".to_string()));
        assert!(keywords.contains(&"insurance".to_string()));
        assert!(keywords.contains(&"paperwork".to_string()));
        // Stopwords and short words are filtered
        assert!(!keywords.contains(&"went".to_string()));
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"about".to_string()));
    }

    #[test]
    fn test_heuristic_keywords_dedup() {
        let keywords = heuristic_keywords("garden garden GARDEN tomatoes");
        assert_eq!(
            keywords,
            vec!["garden".to_string(), "tomatoes".to_string()]
        );
    }

    #[test]
    fn test_parse_extraction_with_prose() {
        let response = r#"Here is the metadata:
{"keywords": ["dentist"], "entities": ["Dr. Reed"], "sentiment": "neutral"}
Hope that helps."#;

        let extraction = parse_extraction(response).unwrap();
        assert_eq!(extraction.keywords, vec!["dentist"]);
        assert_eq!(extraction.entities, vec!["Dr. Reed"]);
        assert_eq!(extraction.sentiment.as_deref(), Some("neutral"));
    }

    #[test]
    fn test_parse_extraction_missing_fields() {
        let extraction = parse_extraction(r#"{"keywords": ["a"]}"#).unwrap();
        assert!(extraction.entities.is_empty());
        assert!(extraction.sentiment.is_none());
    }
}
