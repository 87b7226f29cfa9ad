//! Error types for Minne.

use thiserror::Error;

/// Library-level error type for Minne operations.
#[derive(Error, Debug)]
pub enum MinneError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio processing failed: {0}")]
    Audio(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Metadata extraction failed: {0}")]
    Metadata(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Answer generation failed: {0}")]
    Rag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Minne operations.
pub type Result<T> = std::result::Result<T, MinneError>;
