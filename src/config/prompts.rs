//! Prompt templates for Minne.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// Prompts for query parsing.
    pub parser: ParserPrompts,
    /// Prompts for metadata extraction during ingestion.
    pub metadata: MetadataPrompts,
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompts for parsing natural-language queries into structured filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ParserPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI specialized in parsing natural language queries about personal memories.
Extract key information from the user's query and respond with a single JSON object."#
                .to_string(),

            user: r#"User query: {{query}}

Extract and categorize the following information:
1. "date_filters": Any specific dates or date expressions mentioned (e.g., "October 5, 2023", "yesterday")
2. "keywords": Important topic words (e.g., "vacation", "meeting", "John")
3. "time_range": Any time period mentioned (e.g., "last week", "in June"), or null
4. "count_request": Is the user asking for a count or frequency? (true/false)
5. "query_type": one of "recall" (asking about a specific memory), "count" (asking how many times something happened), "insight" (asking for patterns or analysis), or "general" (anything else)

Respond with a valid JSON object and nothing else. Example:
{"date_filters": ["last week"], "keywords": ["dentist"], "time_range": "last week", "count_request": false, "query_type": "recall"}"#
                .to_string(),
        }
    }
}

/// Prompts for keyword/entity/sentiment extraction from transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataPrompts {
    pub system: String,
    pub user: String,
}

impl Default for MetadataPrompts {
    fn default() -> Self {
        Self {
            system: r#"You analyze transcripts of personal voice recordings and extract metadata.
Respond with a single JSON object and nothing else."#
                .to_string(),

            user: r#"Transcript:
{{transcript}}

Extract:
- "keywords": the most important topic words as lowercase single words or short phrases (nouns, names, activities), at most 15
- "entities": people, organizations, and places mentioned
- "sentiment": the overall tone, one of "positive", "neutral", or "negative"

Respond with a JSON object. Example:
{"keywords": ["dentist", "appointment", "insurance"], "entities": ["Dr. Reed"], "sentiment": "neutral"}"#
                .to_string(),
        }
    }
}

/// Prompts for answer generation over retrieved memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
    pub chat_system: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are Minne, a personal memory assistant that helps users recall information
from their daily audio recordings.

Guidelines:
- Answer questions using only the provided excerpts from the user's recordings
- Mention the recording date when it is relevant to the answer
- If the excerpts don't contain the answer, say you don't know and suggest a different query
- Be concise but thorough"#
                .to_string(),

            user: r#"Question: {{question}}

Relevant excerpts from your recordings:

{{context}}

Please answer the question based on the above excerpts."#
                .to_string(),

            chat_system: r#"You are Minne, a personal memory assistant. You have access to excerpts from
the user's recorded voice notes.

In this conversation:
- Answer questions using the excerpts provided with each message
- Remember previous questions in the conversation for follow-ups
- Mention recording dates when relevant
- If asked about something not in the recordings, say so honestly"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        // Store custom variables
        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            // Load parser prompts if file exists
            let parser_path = custom_path.join("parser.toml");
            if parser_path.exists() {
                let content = std::fs::read_to_string(&parser_path)?;
                prompts.parser = toml::from_str(&content)?;
            }

            // Load metadata prompts if file exists
            let metadata_path = custom_path.join("metadata.toml");
            if metadata_path.exists() {
                let content = std::fs::read_to_string(&metadata_path)?;
                prompts.metadata = toml::from_str(&content)?;
            }

            // Load RAG prompts if file exists
            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        // Start with custom variables, then override with provided vars
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.parser.system.is_empty());
        assert!(!prompts.metadata.user.is_empty());
        assert!(!prompts.rag.system.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Question: {{question}} with {{count}} excerpts.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("question".to_string(), "what happened".to_string());
        vars.insert("count".to_string(), "3".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Question: what happened with 3 excerpts.");
    }

    #[test]
    fn test_custom_variables_precedence() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("name".to_string(), "from_config".to_string());

        let mut vars = std::collections::HashMap::new();
        vars.insert("name".to_string(), "from_call".to_string());

        let result = prompts.render_with_custom("{{name}}", &vars);
        assert_eq!(result, "from_call");
    }
}
