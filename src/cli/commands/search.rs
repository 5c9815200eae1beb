//! Search command implementation.

use crate::catalog::KnowledgeBaseCatalog;
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::events::{AnswerEvent, EventEmitter};
use crate::rag::{ContextRetriever, Question, RetrievalLimits, RoutingDecision};
use crate::vector_store::QdrantStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the search command: retrieval only, no answer generation.
pub async fn run_search(query: &str, collection: Option<String>, settings: Settings) -> Result<()> {
    let catalog = Arc::new(KnowledgeBaseCatalog::load_or_empty(&settings.catalog_path()));
    let retriever = ContextRetriever::new(
        Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?),
        Arc::new(QdrantStore::from_settings(&settings.vector_store)?),
        catalog,
        settings.vector_store.meetings_collection.clone(),
    )
    .with_limits(RetrievalLimits::from(&settings.vector_store));

    let decision = match collection {
        Some(collection) => RoutingDecision::Specific(collection),
        None => RoutingDecision::General,
    };

    let spinner = Output::spinner("Searching...");
    let mut emitter = EventEmitter::new(Vec::new());
    let result = retriever
        .retrieve(&decision, &Question::new(query), &mut emitter)
        .await;
    spinner.finish_and_clear();

    for event in emitter.into_sink() {
        if let AnswerEvent::Warning(text) = event {
            Output::warning(&text);
        }
    }

    match result {
        Ok(result) if result.is_empty() => {
            Output::warning("No results found matching your query.");
        }
        Ok(result) => {
            Output::success(&format!("Found {} results", result.len()));
            for record in result.records() {
                Output::search_result(record);
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
