//! Question routing against the knowledge-base catalog.

use super::{Question, RoutingDecision};
use crate::catalog::KnowledgeBaseCatalog;
use crate::config::Prompts;
use crate::error::{Result, TransmeetError};
use crate::generation::{ChatProvider, ChatRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Identifier the classifier answers with when no base applies.
pub const GENERAL_TOKEN: &str = "general";

/// Classification is always deterministic.
const ROUTING_TEMPERATURE: f32 = 0.0;

/// Classifies a question into one catalog collection, the meetings
/// collection, or general knowledge.
pub struct QueryRouter {
    provider: Arc<dyn ChatProvider>,
    prompts: Arc<Prompts>,
    meetings_collection: String,
}

impl QueryRouter {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        prompts: Arc<Prompts>,
        meetings_collection: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            prompts,
            meetings_collection: meetings_collection.into(),
        }
    }

    /// Render the classification system prompt for a catalog.
    pub fn build_prompt(&self, catalog: &KnowledgeBaseCatalog) -> String {
        let options = catalog
            .entries()
            .iter()
            .map(|e| {
                format!(
                    "- `{}`: for questions about {} ({})",
                    e.collection_name, e.name, e.repo
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("options".to_string(), options);
        vars.insert("meetings_collection".to_string(), self.meetings_collection.clone());
        vars.insert("general".to_string(), GENERAL_TOKEN.to_string());

        self.prompts.render_with_custom(&self.prompts.routing.system, &vars)
    }

    /// Decide where to look for context. Never fails: a classification
    /// error degrades to [`RoutingDecision::General`].
    #[instrument(skip_all, fields(provider = %self.provider.name()))]
    pub async fn route(&self, question: &Question, catalog: &KnowledgeBaseCatalog) -> RoutingDecision {
        match self.classify(question, catalog).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("{}; using general", e);
                RoutingDecision::General
            }
        }
    }

    /// Ask the classifier once. Provider failures surface as
    /// [`TransmeetError::Routing`].
    pub async fn classify(
        &self,
        question: &Question,
        catalog: &KnowledgeBaseCatalog,
    ) -> Result<RoutingDecision> {
        if catalog.is_empty() {
            debug!("Empty catalog, routing to general");
            return Ok(RoutingDecision::General);
        }

        let request = ChatRequest::new(
            self.build_prompt(catalog),
            question.text.clone(),
            ROUTING_TEMPERATURE,
        );

        let raw = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| TransmeetError::Routing(e.to_string()))?;
        let decision = self.parse_choice(&raw, catalog);
        info!("Router chose '{}' (raw answer {:?})", decision, raw.trim());
        Ok(decision)
    }

    /// Normalize the classifier's answer. Anything outside the offered set is general.
    pub fn parse_choice(&self, raw: &str, catalog: &KnowledgeBaseCatalog) -> RoutingDecision {
        let token = raw
            .trim()
            .trim_matches(|c: char| matches!(c, '`' | '"' | '\'') || c.is_whitespace())
            .trim_end_matches('.');

        if token == self.meetings_collection || catalog.contains_collection(token) {
            RoutingDecision::Specific(token.to_string())
        } else {
            RoutingDecision::General
        }
    }
}
