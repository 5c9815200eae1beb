//! Rendering retrieved records into the prompt's context block.

use super::RetrievalResult;
use crate::vector_store::{Provenance, ScoredRecord};

/// Context block used when nothing was retrieved.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant context found in the knowledge base.";

/// Render a retrieval result as a single context string.
///
/// Records keep the order they arrive in. The output depends only on the input.
pub fn format_context(result: &RetrievalResult) -> String {
    if result.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }

    result
        .records()
        .iter()
        .map(format_record)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_record(record: &ScoredRecord) -> String {
    let header = format!(
        "--- context from {} (score: {:.2}) ---",
        record.provenance.kind(),
        record.score
    );

    match &record.provenance {
        Provenance::Code { file_path, snippet } => {
            format!("{}\nFile: {}\n```\n{}\n```", header, file_path, snippet)
        }
        Provenance::Meeting { file_name, text } => {
            format!("{}\nSource: {}\n{}", header, file_name, text)
        }
    }
}
