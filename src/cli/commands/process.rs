//! Process command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use std::path::Path;

/// Run the process command for a single recording.
pub async fn run_process(
    audio_path: &str,
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

    let path = Path::new(audio_path);
    if !path.is_file() {
        Output::error(&format!("File not found: {}", audio_path));
        anyhow::bail!("File not found: {}", audio_path);
    }

    let pipeline = Pipeline::new(settings)?;

    Output::info(&format!("Processing {}", audio_path));

    match pipeline.process_audio(path, force, keep_audio).await {
        Ok(outcome) if outcome.skipped => {
            Output::warning(&format!(
                "{} was already ingested (id {}). Use --force to reprocess.",
                outcome.filename, outcome.transcript_id
            ));
        }
        Ok(outcome) => {
            Output::success(&format!(
                "Ingested {} ({} words, {} chunks indexed)",
                outcome.filename, outcome.word_count, outcome.chunks_indexed
            ));
            Output::kv("Recording date", &outcome.recorded_on.to_string());
            Output::kv("Transcript id", &outcome.transcript_id.to_string());
        }
        Err(e) => {
            Output::error(&format!("Failed to process {}: {}", audio_path, e));
            return Err(e.into());
        }
    }

    Ok(())
}
