//! Export command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use serde_json::json;

/// Run the export command.
pub async fn run_export(
    id: i64,
    output: Option<String>,
    format: &str,
    settings: Settings,
) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    let record = match pipeline.store().get(id)? {
        Some(record) => record,
        None => {
            Output::error(&format!("No transcript with id {}", id));
            anyhow::bail!("No transcript with id {}", id);
        }
    };

    let content = match format {
        "text" => record.text.clone(),
        "json" => {
            let annotations = pipeline.store().annotations(id)?;
            let annotations: serde_json::Map<String, serde_json::Value> = annotations
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();

            serde_json::to_string_pretty(&json!({
                "id": record.id,
                "filename": record.filename,
                "recorded_on": record.recorded_on.to_string(),
                "word_count": record.word_count,
                "duration_seconds": record.duration_seconds,
                "keywords": record.keywords,
                "annotations": annotations,
                "text": record.text,
            }))?
        }
        other => {
            Output::error(&format!("Unknown format: {} (expected text or json)", other));
            anyhow::bail!("Unknown format: {}", other);
        }
    };

    match output {
        Some(path) => {
            std::fs::write(&path, content)?;
            Output::success(&format!("Exported transcript {} to {}", id, path));
        }
        None => {
            println!("{}", content);
        }
    }

    Ok(())
}
