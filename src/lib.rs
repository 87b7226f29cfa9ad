//! Minne - Personal Memory Assistant
//!
//! A CLI tool that turns voice notes into a searchable personal memory.
//!
//! The name "Minne" comes from the Norwegian word for "memory."
//!
//! # Overview
//!
//! Minne allows you to:
//! - Transcribe voice recordings and extract dates, keywords, and entities
//! - Store transcripts in a relational database and a vector database
//! - Ask natural-language questions that combine date filters with
//!   semantic search ("what did I say about the garden last week?")
//! - Count how often a topic came up over a period of time
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `audio` - Local audio probing and segmentation
//! - `transcription` - Speech-to-text transcription
//! - `metadata` - Recording date and keyword extraction
//! - `store` - Relational transcript store
//! - `chunking` - Transcript chunking for embedding
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `query` - Query parsing and hybrid retrieval
//! - `rag` - Answer generation from retrieved memories
//! - `pipeline` - End-to-end coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use minne::config::Settings;
//! use minne::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     // Ingest a voice note
//!     let outcome = pipeline.process_audio("2024-10-05_note.mp3".as_ref(), false, true).await?;
//!     println!("Indexed {} chunks", outcome.chunks_indexed);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod metadata;
pub mod openai;
pub mod pipeline;
pub mod query;
pub mod rag;
pub mod store;
pub mod transcription;
pub mod vector_store;

pub use error::{MinneError, Result};
