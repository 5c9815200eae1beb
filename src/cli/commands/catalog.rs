//! Catalog command implementation.

use crate::catalog::KnowledgeBaseCatalog;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// List the knowledge bases questions can be routed to.
pub fn run_catalog(settings: &Settings) -> Result<()> {
    let path = settings.catalog_path();
    let catalog = match KnowledgeBaseCatalog::try_load(&path) {
        Ok(catalog) => catalog,
        Err(e) => {
            Output::warning(&e.to_string());
            KnowledgeBaseCatalog::empty()
        }
    };

    Output::header("Knowledge Bases");
    Output::kv("Catalog", &path.display().to_string());
    println!();

    if catalog.is_empty() {
        Output::info("No repositories configured; questions use meetings and general knowledge only.");
    }
    for entry in catalog.entries() {
        Output::list_item(&format!(
            "{} ({}) -> {}",
            entry.name, entry.repo, entry.collection_name
        ));
    }
    Output::list_item(&format!(
        "Meetings -> {}",
        settings.vector_store.meetings_collection
    ));

    Ok(())
}
