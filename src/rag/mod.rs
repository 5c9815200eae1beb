//! Query-time retrieval-augmented answering.
//!
//! A question flows through four stages:
//!
//! 1. [`QueryRouter`] picks one collection, or none ([`RoutingDecision::General`]).
//! 2. [`ContextRetriever`] runs a targeted search or a deep fan-out over every collection.
//! 3. [`format_context`] renders the records into one prompt block.
//! 4. [`AnswerGenerator`] streams the answer from the primary provider, falling
//!    back once to a secondary provider.

pub mod context;
mod response;
mod retriever;
mod router;

pub use context::{format_context, NO_CONTEXT_SENTINEL};
pub use response::{AnswerGenerator, GenerationOutcome};
pub use retriever::{ContextRetriever, RetrievalLimits};
pub use router::{QueryRouter, GENERAL_TOKEN};

use crate::vector_store::ScoredRecord;
use std::fmt;

/// A user question with optional prior conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub text: String,
    pub history: Option<String>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            history: None,
        }
    }

    /// Attach conversation history. Blank history is treated as absent.
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        let history = history.into();
        let trimmed = history.trim();
        self.history = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
}

/// Which knowledge base a question should be answered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Search only this collection.
    Specific(String),
    /// No specific base; search everything.
    General,
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingDecision::Specific(collection) => write!(f, "{}", collection),
            RoutingDecision::General => write!(f, "{}", GENERAL_TOKEN),
        }
    }
}

/// Retrieved records, highest score first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    records: Vec<ScoredRecord>,
}

impl RetrievalResult {
    pub fn new(records: Vec<ScoredRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ScoredRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ScoredRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
