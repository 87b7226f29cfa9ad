//! Interactive chat command.
//!
//! A read-eval loop over the query pipeline: each message is parsed and
//! retrieved like a one-shot query, then answered with conversation history.

use super::query::print_count_results;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::query::QueryIntent;
use chrono::Local;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        Output::info("Run 'minne doctor' for detailed diagnostics.");
        return Err(e);
    }

    let pipeline = Pipeline::new(settings)?;
    let parser = pipeline.query_parser();
    let hybrid = pipeline.hybrid_search();
    let mut engine = pipeline.rag_engine();

    let max_chunks = pipeline.settings().llm.max_context_chunks as usize;

    println!("\n{}", style("Minne").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your recorded memories. Type 'exit' to quit, 'clear' to reset the conversation.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // EOF
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            engine.clear_history();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");

        let parsed = parser.parse(input).await;
        let today = Local::now().date_naive();

        // Count questions get a frequency table instead of a generated answer
        if parsed.intent == QueryIntent::Count {
            let result = hybrid.count(&parsed, today).await;
            spinner.finish_and_clear();

            match result {
                Ok(counts) => print_count_results(&counts),
                Err(e) => Output::error(&format!("{}", e)),
            }
            continue;
        }

        let memories = match hybrid.search(&parsed, max_chunks, today).await {
            Ok(memories) => memories,
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Retrieval failed: {}", e));
                continue;
            }
        };

        match engine.chat(input, &memories).await {
            Ok(response) => {
                spinner.finish_and_clear();
                println!("\n{} {}\n", style("Minne:").cyan().bold(), response.answer);
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
