//! In-memory vector store implementation.
//!
//! Useful for testing and small demos.

use super::{cosine_similarity, Provenance, ScoredRecord, VectorSearch};
use crate::error::{Result, TransmeetError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

struct StoredPoint {
    embedding: Vec<f32>,
    provenance: Provenance,
}

/// In-memory store keyed by collection name.
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<StoredPoint>>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store with no collections.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty collection if it does not exist yet.
    pub fn create_collection(&self, collection: &str) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| TransmeetError::Transport("memory store lock poisoned".to_string()))?;
        collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    /// Insert a point, creating the collection on first use.
    pub fn insert(&self, collection: &str, embedding: Vec<f32>, provenance: Provenance) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| TransmeetError::Transport("memory store lock poisoned".to_string()))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredPoint {
                embedding,
                provenance,
            });
        Ok(())
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorSearch for MemoryVectorStore {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| TransmeetError::Transport("memory store lock poisoned".to_string()))?;

        let points = collections
            .get(collection)
            .ok_or_else(|| TransmeetError::CollectionNotFound(collection.to_string()))?;

        let mut results: Vec<ScoredRecord> = points
            .iter()
            .map(|p| ScoredRecord::new(cosine_similarity(vector, &p.embedding), p.provenance.clone()))
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }
}
