//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    match pipeline.store().list() {
        Ok(recordings) => {
            if recordings.is_empty() {
                Output::info("No recordings ingested yet. Use 'minne process <audio>' to add one.");
            } else {
                Output::header(&format!("Ingested recordings ({})", recordings.len()));
                println!();

                for recording in &recordings {
                    Output::recording_info(
                        recording.id,
                        &recording.filename,
                        recording.recorded_on,
                        recording.word_count,
                        &recording.keywords,
                    );
                }

                let total_words: i64 = recordings.iter().map(|r| r.word_count).sum();
                println!();
                Output::kv("Total recordings", &recordings.len().to_string());
                Output::kv("Total words", &total_words.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list recordings: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
