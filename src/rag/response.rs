//! RAG response generation.

use super::format_context_for_prompt;
use crate::config::Prompts;
use crate::error::{MinneError, Result};
use crate::openai::create_client;
use crate::query::RetrievedMemory;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Maximum retained conversation messages in chat mode.
const MAX_HISTORY: usize = 20;

/// RAG engine for answering questions from retrieved memories.
pub struct RagEngine {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    prompts: Prompts,
    conversation_history: Vec<ChatCompletionRequestMessage>,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(model: &str, temperature: f32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            temperature,
            prompts: Prompts::default(),
            conversation_history: Vec::new(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Answer a single question from the given memory excerpts.
    #[instrument(skip(self, memories), fields(question = %question))]
    pub async fn answer(
        &self,
        question: &str,
        memories: &[RetrievedMemory],
    ) -> Result<RagResponse> {
        info!("Generating answer from {} excerpts", memories.len());

        if memories.is_empty() {
            return Ok(RagResponse {
                answer: "I couldn't find any memories matching your query. Try a different \
                         wording or a wider date range."
                    .to_string(),
                sources: Vec::new(),
            });
        }

        let context_text = format_context_for_prompt(memories);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context_text);

        let user_prompt = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.rag.system.clone())
                .build()
                .map_err(|e| MinneError::Rag(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| MinneError::Rag(e.to_string()))?
                .into(),
        ];

        let answer = self.complete(messages).await?;

        debug!("Generated answer with {} sources", memories.len());

        Ok(RagResponse {
            answer,
            sources: memories.to_vec(),
        })
    }

    /// Continue a chat session with fresh excerpts for the latest message.
    #[instrument(skip(self, memories), fields(message = %message))]
    pub async fn chat(
        &mut self,
        message: &str,
        memories: &[RetrievedMemory],
    ) -> Result<RagResponse> {
        info!("Chat message with {} excerpts", memories.len());

        let user_content = if memories.is_empty() {
            format!(
                "Question: {}\n\n(No relevant memories found for this question)",
                message
            )
        } else {
            format!(
                "Question: {}\n\nRelevant excerpts from your recordings:\n{}",
                message,
                format_context_for_prompt(memories)
            )
        };

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(user_content)
            .build()
            .map_err(|e| MinneError::Rag(e.to_string()))?;
        self.conversation_history.push(user_message.into());

        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.rag.chat_system.clone())
                .build()
                .map_err(|e| MinneError::Rag(e.to_string()))?
                .into(),
        ];
        messages.extend(self.conversation_history.clone());

        let answer = self.complete(messages).await?;

        let assistant_message = ChatCompletionRequestAssistantMessageArgs::default()
            .content(answer.clone())
            .build()
            .map_err(|e| MinneError::Rag(e.to_string()))?;
        self.conversation_history.push(assistant_message.into());

        // Trim history if too long
        if self.conversation_history.len() > MAX_HISTORY {
            self.conversation_history =
                self.conversation_history[self.conversation_history.len() - MAX_HISTORY..].to_vec();
        }

        Ok(RagResponse {
            answer,
            sources: memories.to_vec(),
        })
    }

    async fn complete(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| MinneError::Rag(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            MinneError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .ok_or_else(|| MinneError::Rag("Empty response from LLM".to_string()))
    }

    /// Clear conversation history.
    pub fn clear_history(&mut self) {
        self.conversation_history.clear();
    }
}

/// A generated answer with its supporting memories.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Memory excerpts used for the answer.
    pub sources: Vec<RetrievedMemory>,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Supporting memories ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (score: {:.2})",
                    source.format_date(),
                    source.score
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_for_display() {
        let response = RagResponse {
            answer: "You planted garlic.".to_string(),
            sources: vec![RetrievedMemory {
                transcript_id: 1,
                recorded_on: NaiveDate::from_ymd_opt(2024, 10, 5).unwrap(),
                filename: None,
                keywords: vec![],
                content: "Planted garlic".to_string(),
                score: 0.91,
            }],
        };

        let display = response.format_for_display();
        assert!(display.starts_with("You planted garlic."));
        assert!(display.contains("October 05, 2024"));
        assert!(display.contains("0.91"));
    }

    #[test]
    fn test_format_for_display_no_sources() {
        let response = RagResponse {
            answer: "I don't know.".to_string(),
            sources: vec![],
        };

        assert_eq!(response.format_for_display(), "I don't know.");
    }
}
