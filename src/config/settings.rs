//! Configuration settings for Minne.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub audio: AudioSettings,
    pub transcription: TranscriptionSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub database: DatabaseSettings,
    pub llm: LlmSettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (transcripts, processed audio).
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.minne".to_string(),
            temp_dir: "/tmp/minne".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Audio handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Sample rate used when re-encoding segments (Hz).
    pub sample_rate: u32,
    /// Duration in seconds for splitting long recordings.
    pub chunk_duration_seconds: u32,
    /// Maximum recording duration to process (in seconds).
    pub max_duration_seconds: u32,
    /// Recognized audio file extensions for directory ingest.
    pub extensions: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_duration_seconds: 120,
            max_duration_seconds: 7200, // 2 hours
            extensions: vec![
                "mp3".to_string(),
                "wav".to_string(),
                "m4a".to_string(),
                "flac".to_string(),
                "ogg".to_string(),
            ],
        }
    }
}

impl AudioSettings {
    /// Check whether a path has a recognized audio extension.
    pub fn is_audio_file(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| e == &ext)
            })
            .unwrap_or(false)
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Optional language hint (ISO 639-1 code).
    pub language: Option<String>,
    /// Maximum concurrent chunk transcriptions.
    pub max_concurrent_chunks: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
            max_concurrent_chunks: 3,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk duration in seconds.
    pub target_chunk_seconds: u32,
    /// Minimum chunk duration in seconds.
    pub min_chunk_seconds: u32,
    /// Maximum chunk duration in seconds.
    pub max_chunk_seconds: u32,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            target_chunk_seconds: 120,
            min_chunk_seconds: 30,
            max_chunk_seconds: 300,
        }
    }
}

/// Database path settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the relational transcript database.
    pub sqlite_path: String,
    /// Path to the vector database.
    pub vector_path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.minne/memories.db".to_string(),
            vector_path: "~/.minne/vectors.db".to_string(),
        }
    }
}

/// Language model settings for query parsing and answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model for answer generation and metadata extraction.
    pub model: String,
    /// Sampling temperature for answer generation.
    pub temperature: f32,
    /// Maximum number of context excerpts to include in a prompt.
    pub max_context_chunks: u32,
    /// Minimum similarity score for retrieved excerpts (0.0-1.0).
    pub min_score: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_context_chunks: 5,
            min_score: 0.3,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::MinneError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("minne")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Directory where transcript text files are written.
    pub fn transcripts_dir(&self) -> PathBuf {
        self.data_dir().join("transcripts")
    }

    /// Directory where ingested audio files are archived.
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir().join("processed_audio")
    }

    /// Get the expanded relational database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.database.sqlite_path)
    }

    /// Get the expanded vector database path.
    pub fn vector_path(&self) -> PathBuf {
        Self::expand_path(&self.database.vector_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.transcription.model, "whisper-1");
        assert_eq!(parsed.embedding.dimensions, 1536);
        assert_eq!(parsed.audio.sample_rate, 16_000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
            [llm]
            model = "gpt-4o"
            temperature = 0.5
        "#;

        let settings: Settings = toml::from_str(partial).unwrap();
        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.llm.temperature, 0.5);
        assert_eq!(settings.general.log_level, "info");
    }

    #[test]
    fn test_is_audio_file() {
        let audio = AudioSettings::default();
        assert!(audio.is_audio_file(std::path::Path::new("note.mp3")));
        assert!(audio.is_audio_file(std::path::Path::new("NOTE.WAV")));
        assert!(!audio.is_audio_file(std::path::Path::new("note.txt")));
        assert!(!audio.is_audio_file(std::path::Path::new("noext")));
    }
}
