//! Knowledge-base catalog.
//!
//! The catalog is the static list of code repositories that have been indexed
//! into the vector store. It is loaded once at startup and shared read-only
//! for the lifetime of the process.

use crate::error::{Result, TransmeetError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One registered code knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Display name of the repository.
    pub name: String,
    /// External repository identifier (e.g. `owner/repo`).
    #[serde(rename = "github_repo", default)]
    pub repo: String,
    /// Vector store collection holding this repository's embeddings.
    #[serde(rename = "qdrant_collection")]
    pub collection_name: String,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    repositories: Vec<RepositoryConfig>,
}

/// Read-only list of known collections, in load order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseCatalog {
    entries: Vec<RepositoryConfig>,
    /// Why the catalog file could not be used, when it degraded to empty.
    load_warning: Option<String>,
}

impl KnowledgeBaseCatalog {
    /// Build a catalog from entries. Entries without a collection name are skipped.
    pub fn new(entries: Vec<RepositoryConfig>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|e| {
                let keep = !e.collection_name.trim().is_empty();
                if !keep {
                    warn!("Skipping catalog entry '{}' with no collection name", e.name);
                }
                keep
            })
            .collect();
        Self {
            entries,
            load_warning: None,
        }
    }

    /// An empty catalog; routing will always fall back to general knowledge.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON document.
    pub fn from_json(content: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(content)
            .map_err(|e| TransmeetError::Config(format!("Invalid catalog document: {}", e)))?;
        Ok(Self::new(doc.repositories))
    }

    /// Load the catalog from a file, failing on missing or malformed input.
    pub fn try_load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TransmeetError::Config(format!("Cannot read catalog {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Load the catalog, degrading to an empty catalog on any error.
    ///
    /// The failure is kept in [`load_warning`](Self::load_warning) so callers
    /// can report it alongside each answer.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(catalog) => {
                debug!("Loaded {} knowledge bases from {}", catalog.len(), path.display());
                catalog
            }
            Err(e) => {
                warn!("{}; continuing with an empty catalog", e);
                Self {
                    entries: Vec::new(),
                    load_warning: Some(format!("{}; continuing with an empty catalog", e)),
                }
            }
        }
    }

    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn entries(&self) -> &[RepositoryConfig] {
        &self.entries
    }

    /// Collection names in load order (may contain duplicates).
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.collection_name.as_str())
    }

    pub fn contains_collection(&self, collection: &str) -> bool {
        self.collection_names().any(|c| c == collection)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
