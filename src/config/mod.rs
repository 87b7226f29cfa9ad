//! Configuration management for Minne.

mod prompts;
mod settings;

pub use prompts::{MetadataPrompts, ParserPrompts, Prompts, RagPrompts};
pub use settings::{
    AudioSettings, ChunkingSettings, DatabaseSettings, EmbeddingSettings, GeneralSettings,
    LlmSettings, PromptSettings, Settings, TranscriptionSettings,
};
