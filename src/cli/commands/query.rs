//! Query command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{Pipeline, QueryOutcome};
use crate::query::KeywordCounts;
use crate::rag::RagResponse;
use anyhow::Result;

/// How many matching dates to print before eliding the rest.
const MAX_DATES_SHOWN: usize = 5;

/// How many supporting memories to print under an answer.
const MAX_SOURCES_SHOWN: usize = 3;

/// Run the query command.
pub async fn run_query(text: &str, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        Output::info("Run 'minne doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner("Searching your memories...");
    let outcome = pipeline.query(text).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(QueryOutcome::Count(counts)) => {
            print_count_results(&counts);
        }
        Ok(QueryOutcome::Answer(response)) => {
            print_answer(&response);
        }
        Err(e) => {
            Output::error(&format!("Query failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Print keyword frequency results.
pub fn print_count_results(counts: &KeywordCounts) {
    Output::header("Keyword frequency");
    Output::kv("Period", &counts.date_range);
    Output::kv("Total mentions", &counts.total_mentions.to_string());
    println!();

    for (keyword, count) in &counts.counts {
        println!("  '{}': {} mentions", keyword, count);
    }

    if !counts.matching_dates.is_empty() {
        println!("\nFound in recordings from these dates:");
        for date in counts.matching_dates.iter().take(MAX_DATES_SHOWN) {
            println!("  - {}", date.format("%Y-%m-%d"));
        }

        let remaining = counts.matching_dates.len().saturating_sub(MAX_DATES_SHOWN);
        if remaining > 0 {
            println!("  ... and {} more dates", remaining);
        }
    }
}

/// Print a generated answer with its supporting memories.
pub fn print_answer(response: &RagResponse) {
    println!("\n{}\n", response.answer);

    if !response.sources.is_empty() {
        Output::header("Supporting memories");
        for source in response.sources.iter().take(MAX_SOURCES_SHOWN) {
            Output::memory_result(&source.format_date(), source.score, &source.content);
        }
    }
}
