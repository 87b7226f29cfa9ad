//! Natural-language query parsing.
//!
//! Classifies a question into an intent and extracts structured filters
//! (date expressions, keywords, time range). The primary path asks an LLM
//! for a JSON parse; any failure falls back to heuristic parsing so a query
//! always produces a usable result.

use super::dates::find_date_expressions;
use crate::config::Prompts;
use crate::error::{MinneError, Result};
use crate::metadata::heuristic_keywords;
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    /// Asking about a specific memory.
    Recall,
    /// Asking how many times something happened.
    Count,
    /// Asking for patterns or analysis.
    Insight,
    /// Anything else.
    General,
}

impl std::str::FromStr for QueryIntent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recall" => Ok(QueryIntent::Recall),
            "count" => Ok(QueryIntent::Count),
            "insight" => Ok(QueryIntent::Insight),
            "general" => Ok(QueryIntent::General),
            _ => Err(format!("Unknown query intent: {}", s)),
        }
    }
}

impl std::fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryIntent::Recall => write!(f, "recall"),
            QueryIntent::Count => write!(f, "count"),
            QueryIntent::Insight => write!(f, "insight"),
            QueryIntent::General => write!(f, "general"),
        }
    }
}

/// Structured parameters extracted from a natural-language query.
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub intent: QueryIntent,
    /// Date expressions mentioned in the query ("yesterday", "October 5, 2023").
    pub date_filters: Vec<String>,
    /// Topic keywords extracted from the query.
    pub keywords: Vec<String>,
    /// Time period phrase, if any ("last week", "in June").
    pub time_range: Option<String>,
    /// Whether the user asked for a count or frequency.
    pub count_request: bool,
}

/// Raw JSON shape returned by the LLM.
#[derive(Debug, Deserialize)]
struct LlmParsedQuery {
    #[serde(default)]
    date_filters: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    time_range: Option<String>,
    #[serde(default)]
    count_request: bool,
    #[serde(default)]
    query_type: Option<String>,
}

/// Phrases that indicate a frequency question.
const COUNT_PHRASES: &[&str] = &["how many", "how often", "count", "frequency", "times"];

/// Phrases that indicate an analysis question.
const INSIGHT_PHRASES: &[&str] = &["pattern", "trend", "insight", "analysis", "analyze", "summar"];

/// Parses natural-language queries into structured parameters.
pub struct QueryParser {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl QueryParser {
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

    /// Parse a query, falling back to heuristic parsing on any LLM failure.
    pub async fn parse(&self, query: &str) -> ParsedQuery {
        match self.parse_with_llm(query).await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("LLM query parsing failed, using heuristic fallback: {}", e);
                Self::heuristic_parse(query)
            }
        }
    }

    async fn parse_with_llm(&self, query: &str) -> Result<ParsedQuery> {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());

        let system_message = self
            .prompts
            .render_with_custom(&self.prompts.parser.system, &vars);
        let user_message = self
            .prompts
            .render_with_custom(&self.prompts.parser.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()
                .map_err(|e| MinneError::Query(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(|e| MinneError::Query(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(|e| MinneError::Query(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            MinneError::OpenAI(format!("Failed to get parsing response: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| MinneError::Query("Empty response from LLM".to_string()))?;

        debug!("LLM parse response: {}", &content[..content.len().min(500)]);

        let raw = Self::parse_response(content)?;
        Ok(Self::from_llm(raw))
    }

    /// Parse the LLM response into the raw shape, tolerating surrounding prose.
    fn parse_response(response: &str) -> Result<LlmParsedQuery> {
        let json_start = response.find('{');
        let json_end = response.rfind('}');

        let json_str = match (json_start, json_end) {
            (Some(start), Some(end)) if end > start => &response[start..=end],
            _ => response,
        };

        serde_json::from_str(json_str).map_err(|e| {
            MinneError::Query(format!(
                "Failed to parse query response: {}. Response was: {}",
                e,
                &response[..response.len().min(500)]
            ))
        })
    }

    fn from_llm(raw: LlmParsedQuery) -> ParsedQuery {
        let mut intent = raw
            .query_type
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(QueryIntent::General);

        // An explicit count request wins regardless of the LLM's label
        if raw.count_request {
            intent = QueryIntent::Count;
        }

        ParsedQuery {
            intent,
            date_filters: raw.date_filters,
            keywords: raw
                .keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            time_range: raw.time_range.filter(|t| !t.is_empty()),
            count_request: raw.count_request,
        }
    }

    /// Heuristic parsing used when the LLM is unavailable.
    pub fn heuristic_parse(query: &str) -> ParsedQuery {
        let lower = query.to_lowercase();

        let date_filters = find_date_expressions(&lower);

        let count_request = COUNT_PHRASES.iter().any(|p| lower.contains(p));
        let wants_insight = INSIGHT_PHRASES.iter().any(|p| lower.contains(p));

        // Keywords: stopword-filtered tokens, minus anything that is part of
        // a detected date expression
        let keywords: Vec<String> = heuristic_keywords(&lower)
            .into_iter()
            .filter(|k| !date_filters.iter().any(|d| d.contains(k.as_str())))
            .filter(|k| !COUNT_PHRASES.contains(&k.as_str()))
            .collect();

        let time_range = find_time_range(&lower);

        let intent = if count_request {
            QueryIntent::Count
        } else if !date_filters.is_empty() {
            QueryIntent::Recall
        } else if wants_insight {
            QueryIntent::Insight
        } else {
            QueryIntent::General
        };

        ParsedQuery {
            intent,
            date_filters,
            keywords,
            time_range,
            count_request,
        }
    }
}

/// Find a time-range phrase in the query, if any.
fn find_time_range(lower: &str) -> Option<String> {
    let patterns = [
        r"last\s+(week|month|year)",
        r"(january|february|march|april|may|june|july|august|september|october|november|december)(\s+\d{4})?",
        r"in\s+\d{4}",
    ];

    for pattern in patterns {
        let re = regex::Regex::new(pattern).expect("valid regex");
        if let Some(m) = re.find(lower) {
            return Some(m.as_str().to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_count_query() {
        let parsed =
            QueryParser::heuristic_parse("How many times did I mention the dentist last month?");

        assert_eq!(parsed.intent, QueryIntent::Count);
        assert!(parsed.count_request);
        assert!(parsed.keywords.contains(&"dentist".to_string()));
        assert_eq!(parsed.date_filters, vec!["last month"]);
        assert_eq!(parsed.time_range.as_deref(), Some("last month"));
    }

    #[test]
    fn test_heuristic_recall_query() {
        let parsed = QueryParser::heuristic_parse("What did I say about the garden yesterday?");

        assert_eq!(parsed.intent, QueryIntent::Recall);
        assert!(!parsed.count_request);
        assert!(parsed.keywords.contains(&"garden".to_string()));
        assert_eq!(parsed.date_filters, vec!["yesterday"]);
    }

    #[test]
    fn test_heuristic_insight_query() {
        let parsed = QueryParser::heuristic_parse("What patterns do you see in my mood?");

        assert_eq!(parsed.intent, QueryIntent::Insight);
        assert!(parsed.date_filters.is_empty());
    }

    #[test]
    fn test_heuristic_general_query() {
        let parsed = QueryParser::heuristic_parse("Tell me about the conference");

        assert_eq!(parsed.intent, QueryIntent::General);
        assert!(parsed.keywords.contains(&"conference".to_string()));
        assert!(parsed.time_range.is_none());
    }

    #[test]
    fn test_count_beats_date_filters() {
        // Both a date and a count phrase: the count intent wins
        let parsed =
            QueryParser::heuristic_parse("How many times did I talk about rust in October 2023?");

        assert_eq!(parsed.intent, QueryIntent::Count);
        assert!(!parsed.date_filters.is_empty());
    }

    #[test]
    fn test_date_words_not_keywords() {
        let parsed = QueryParser::heuristic_parse("meetings on october 5, 2023");

        assert!(parsed.keywords.contains(&"meetings".to_string()));
        assert!(!parsed.keywords.contains(&"october".to_string()));
    }

    #[test]
    fn test_parse_llm_response() {
        let raw = QueryParser::parse_response(
            r#"{"date_filters": ["last week"], "keywords": ["Dentist"], "time_range": "last week",
                "count_request": false, "query_type": "recall"}"#,
        )
        .unwrap();
        let parsed = QueryParser::from_llm(raw);

        assert_eq!(parsed.intent, QueryIntent::Recall);
        assert_eq!(parsed.keywords, vec!["dentist"]);
        assert_eq!(parsed.time_range.as_deref(), Some("last week"));
    }

    #[test]
    fn test_parse_llm_response_with_prose() {
        let raw = QueryParser::parse_response(
            "Here you go:\n{\"keywords\": [\"rust\"], \"count_request\": true}\nDone.",
        )
        .unwrap();
        let parsed = QueryParser::from_llm(raw);

        // count_request forces the count intent even without a query_type
        assert_eq!(parsed.intent, QueryIntent::Count);
    }

    #[test]
    fn test_parse_llm_response_invalid() {
        assert!(QueryParser::parse_response("not json at all").is_err());
    }

    #[test]
    fn test_intent_display_roundtrip() {
        for intent in [
            QueryIntent::Recall,
            QueryIntent::Count,
            QueryIntent::Insight,
            QueryIntent::General,
        ] {
            let parsed: QueryIntent = intent.to_string().parse().unwrap();
            assert_eq!(parsed, intent);
        }
    }
}
