//! Minne CLI entry point.

use anyhow::Result;
use clap::Parser;
use minne::cli::{commands, Cli, Commands};
use minne::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("minne={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Process { audio_path, force, keep_audio } => {
            commands::run_process(audio_path, *force, *keep_audio, settings).await?;
        }

        Commands::Ingest { directory, recursive, force, keep_audio } => {
            commands::run_ingest(directory, *recursive, *force, *keep_audio, settings).await?;
        }

        Commands::Query { text } => {
            commands::run_query(text, settings).await?;
        }

        Commands::Chat => {
            commands::run_chat(settings).await?;
        }

        Commands::Search { query, limit, min_score } => {
            commands::run_search(query, *limit, *min_score, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Export { id, output, format } => {
            commands::run_export(*id, output.clone(), format, settings).await?;
        }

        Commands::Delete { id } => {
            commands::run_delete(*id, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
