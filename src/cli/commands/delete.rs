//! Delete command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(id: i64, settings: Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    match pipeline.delete_transcript(id).await {
        Ok(()) => {
            Output::success(&format!("Deleted recording {}", id));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Err(e.into())
        }
    }
}
