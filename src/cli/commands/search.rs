//! Search command implementation.
//!
//! Raw semantic search over the vector store, without query parsing or
//! answer generation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    limit: usize,
    min_score: f32,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        Output::info("Run 'minne doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner("Searching...");

    let results = async {
        let embedding = pipeline.embedder().embed(query).await?;
        pipeline.vector_store().search(&embedding, limit, min_score).await
    }
    .await;

    spinner.finish_and_clear();

    match results {
        Ok(hits) => {
            if hits.is_empty() {
                Output::warning("No memories found matching your query.");
            } else {
                Output::success(&format!("Found {} results", hits.len()));

                for hit in &hits {
                    Output::memory_result(
                        &hit.chunk.recorded_on.format("%B %d, %Y").to_string(),
                        hit.score,
                        &hit.chunk.content,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
