//! CLI module for Minne.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Minne - Personal Memory Assistant
///
/// A CLI tool that turns voice notes into a searchable personal memory.
/// The name "Minne" comes from the Norwegian word for "memory."
#[derive(Parser, Debug)]
#[command(name = "minne")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Minne and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Transcribe and index a voice recording
    Process {
        /// Path to the audio file
        audio_path: String,

        /// Force re-processing even if already ingested
        #[arg(short, long)]
        force: bool,

        /// Leave the audio file in place instead of archiving it
        #[arg(long)]
        keep_audio: bool,
    },

    /// Ingest all recordings in a directory
    Ingest {
        /// Directory containing audio files
        directory: String,

        /// Process subdirectories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Force re-processing of already ingested recordings
        #[arg(short, long)]
        force: bool,

        /// Leave audio files in place instead of archiving them
        #[arg(long)]
        keep_audio: bool,
    },

    /// Ask a natural-language question about your memories
    Query {
        /// The question to ask
        text: String,
    },

    /// Start an interactive chat session
    Chat,

    /// Search for relevant memory excerpts
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Minimum similarity score (0.0-1.0)
        #[arg(short, long, default_value = "0.3")]
        min_score: f32,
    },

    /// List ingested recordings
    List,

    /// Export a stored transcript
    Export {
        /// Transcript id to export
        id: i64,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Delete a recording from both stores
    Delete {
        /// Transcript id to delete
        id: i64,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
