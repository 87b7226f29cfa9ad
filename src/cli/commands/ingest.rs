//! Bulk ingest command implementation.
//!
//! Walks a directory of audio files and processes each one in turn. One
//! linear pass per invocation; failures are reported and skipped.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Run the ingest command over a directory.
pub async fn run_ingest(
    directory: &str,
    recursive: bool,
    force: bool,
    keep_audio: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Process) {
        Output::error(&format!("{}", e));
        Output::info("Run 'minne doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let dir = Path::new(directory);
    if !dir.is_dir() {
        Output::error(&format!("Directory not found: {}", directory));
        anyhow::bail!("Directory not found: {}", directory);
    }

    let mut audio_files = Vec::new();
    collect_audio_files(dir, recursive, &settings, &mut audio_files)?;
    audio_files.sort();

    if audio_files.is_empty() {
        Output::warning(&format!("No audio files found in {}", directory));
        return Ok(());
    }

    Output::info(&format!("Found {} audio files to process", audio_files.len()));

    let pipeline = Pipeline::new(settings)?;
    let pb = Output::progress_bar(audio_files.len() as u64, "Ingesting recordings");

    let mut successful = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for audio_path in &audio_files {
        match pipeline.process_audio(audio_path, force, keep_audio).await {
            Ok(outcome) if outcome.skipped => skipped += 1,
            Ok(_) => successful += 1,
            Err(e) => {
                warn!("Error processing {:?}: {}", audio_path, e);
                pb.println(format!("  Failed: {} ({})", audio_path.display(), e));
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    Output::success(&format!(
        "Ingest complete: {} processed, {} skipped, {} failed",
        successful, skipped, failed
    ));

    if failed > 0 {
        anyhow::bail!("{} recordings failed to process", failed);
    }

    Ok(())
}

/// Collect audio files from a directory, optionally recursing.
fn collect_audio_files(
    dir: &Path,
    recursive: bool,
    settings: &Settings,
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if recursive {
                collect_audio_files(&path, recursive, settings, out)?;
            }
        } else if settings.audio.is_audio_file(&path) {
            out.push(path);
        }
    }

    Ok(())
}
