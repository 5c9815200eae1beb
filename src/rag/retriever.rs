//! Context retrieval: targeted search or deep fan-out across every collection.

use super::{Question, RetrievalResult, RoutingDecision};
use crate::catalog::KnowledgeBaseCatalog;
use crate::config::VectorStoreSettings;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::events::{AnswerEvent, EventEmitter, EventSink};
use crate::vector_store::{ScoredRecord, VectorSearch};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result-size bounds for both retrieval tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalLimits {
    /// Records requested from the routed collection.
    pub targeted: usize,
    /// Records requested from each collection during fan-out.
    pub per_collection: usize,
    /// Records kept after merging the fan-out.
    pub deep_max: usize,
    /// Collection searches in flight at once.
    pub max_concurrent: usize,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            targeted: 7,
            per_collection: 5,
            deep_max: 10,
            max_concurrent: 4,
        }
    }
}

impl From<&VectorStoreSettings> for RetrievalLimits {
    fn from(settings: &VectorStoreSettings) -> Self {
        Self {
            targeted: settings.targeted_limit,
            per_collection: settings.fanout_limit,
            deep_max: settings.deep_max_results,
            max_concurrent: settings.max_concurrent_searches.max(1),
        }
    }
}

/// Finds supporting records for a routed question.
pub struct ContextRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorSearch>,
    catalog: Arc<KnowledgeBaseCatalog>,
    meetings_collection: String,
    limits: RetrievalLimits,
}

impl ContextRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorSearch>,
        catalog: Arc<KnowledgeBaseCatalog>,
        meetings_collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            catalog,
            meetings_collection: meetings_collection.into(),
            limits: RetrievalLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: RetrievalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Collections searched by the deep tier: catalog order, then meetings, each once.
    pub fn fanout_collections(&self) -> Vec<String> {
        let mut collections: Vec<String> = Vec::new();
        let all = self
            .catalog
            .collection_names()
            .chain(std::iter::once(self.meetings_collection.as_str()));
        for name in all {
            if !collections.iter().any(|c| c == name) {
                collections.push(name.to_string());
            }
        }
        collections
    }

    /// Embed the question and search according to `decision`.
    ///
    /// Only an embedding failure is an error. Search failures become
    /// `Warning` events and contribute nothing.
    #[instrument(skip_all, fields(decision = %decision))]
    pub async fn retrieve<S: EventSink>(
        &self,
        decision: &RoutingDecision,
        question: &Question,
        emitter: &mut EventEmitter<S>,
    ) -> Result<RetrievalResult> {
        let vector = self.embedder.embed(&question.text).await?;

        match decision {
            RoutingDecision::Specific(collection) => {
                self.targeted(collection, &vector, emitter).await
            }
            RoutingDecision::General => self.deep(&vector, emitter).await,
        }
    }

    async fn targeted<S: EventSink>(
        &self,
        collection: &str,
        vector: &[f32],
        emitter: &mut EventEmitter<S>,
    ) -> Result<RetrievalResult> {
        emitter
            .emit(AnswerEvent::info(format!("Searching collection '{}'", collection)))
            .await?;

        match self.store.search(collection, vector, self.limits.targeted).await {
            Ok(mut records) => {
                sort_by_score(&mut records);
                records.truncate(self.limits.targeted);
                debug!("Targeted search returned {} records", records.len());
                Ok(RetrievalResult::new(records))
            }
            Err(e) => {
                warn!("Targeted search in '{}' failed: {}", collection, e);
                emitter
                    .emit(AnswerEvent::warning(format!(
                        "Could not search collection '{}': {}",
                        collection, e
                    )))
                    .await?;
                Ok(RetrievalResult::empty())
            }
        }
    }

    async fn deep<S: EventSink>(
        &self,
        vector: &[f32],
        emitter: &mut EventEmitter<S>,
    ) -> Result<RetrievalResult> {
        let collections = self.fanout_collections();
        info!("Deep search across {} collections", collections.len());
        emitter
            .emit(AnswerEvent::info(format!(
                "Searching all knowledge bases: {}",
                collections.join(", ")
            )))
            .await?;

        // Each search owns its inputs; the ask future must stay Send for spawned tasks.
        let limit = self.limits.per_collection;
        let store = self.store.clone();
        let vector: Arc<[f32]> = Arc::from(vector);
        let mut outcomes: Vec<(usize, String, Result<Vec<ScoredRecord>>)> =
            stream::iter(collections.into_iter().enumerate())
                .map(move |(idx, collection)| {
                    let store = store.clone();
                    let vector = vector.clone();
                    async move {
                        let result = store.search(&collection, &vector, limit).await;
                        (idx, collection, result)
                    }
                })
                .buffer_unordered(self.limits.max_concurrent)
                .collect()
                .await;

        // Merge in search order so equal scores favour earlier collections.
        outcomes.sort_by_key(|(idx, _, _)| *idx);

        let mut merged = Vec::new();
        for (_, collection, result) in outcomes {
            match result {
                Ok(records) => merged.extend(records),
                Err(e) => {
                    warn!("Deep search skipped '{}': {}", collection, e);
                    emitter
                        .emit(AnswerEvent::warning(format!(
                            "Could not search collection '{}': {}",
                            collection, e
                        )))
                        .await?;
                }
            }
        }

        sort_by_score(&mut merged);
        merged.truncate(self.limits.deep_max);
        debug!("Deep search kept {} records", merged.len());
        Ok(RetrievalResult::new(merged))
    }
}

/// Stable sort, highest score first. NaN scores sort as the highest.
fn sort_by_score(records: &mut [ScoredRecord]) {
    records.sort_by(|a, b| b.score.total_cmp(&a.score));
}
