//! Answer generation over retrieved memories.
//!
//! Takes the excerpts produced by hybrid retrieval and synthesizes a final
//! answer with a chat-completion call.

mod response;

pub use response::{RagEngine, RagResponse};

use crate::query::RetrievedMemory;

/// Format memory excerpts for inclusion in a prompt.
pub fn format_context_for_prompt(memories: &[RetrievedMemory]) -> String {
    memories
        .iter()
        .enumerate()
        .map(|(i, memory)| {
            format!(
                "---\n[{}] Recorded on {}\n{}\n---",
                i + 1,
                memory.format_date(),
                memory.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Truncate content to a single-line snippet with ellipsis.
pub fn snippet(content: &str, max_len: usize) -> String {
    let flat = content.replace('\n', " ");
    if flat.chars().count() <= max_len {
        flat
    } else {
        let truncated: String = flat.chars().take(max_len).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn memory(content: &str) -> RetrievedMemory {
        RetrievedMemory {
            transcript_id: 1,
            recorded_on: NaiveDate::from_ymd_opt(2024, 10, 5).unwrap(),
            filename: Some("2024-10-05_note.mp3".to_string()),
            keywords: vec!["garden".to_string()],
            content: content.to_string(),
            score: 0.87,
        }
    }

    #[test]
    fn test_format_context_for_prompt() {
        let context = format_context_for_prompt(&[memory("Planted garlic")]);
        assert!(context.contains("[1] Recorded on October 05, 2024"));
        assert!(context.contains("Planted garlic"));
    }

    #[test]
    fn test_snippet_truncation() {
        assert_eq!(snippet("short", 10), "short");
        assert_eq!(snippet("multi\nline", 20), "multi line");

        let long = "x".repeat(200);
        let s = snippet(&long, 150);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), 153);
    }
}
