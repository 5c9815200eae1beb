//! Transmeet - Answers from code and meetings
//!
//! Answers natural-language questions from an engineering team using a routed
//! retrieval pipeline over code repositories and meeting transcripts.
//!
//! # Overview
//!
//! For each question Transmeet:
//! - routes it to one knowledge base (a repository, the meetings, or none)
//! - retrieves supporting records from Qdrant, fanning out over every
//!   collection when no single base applies
//! - streams an answer from the primary model, falling back once to a
//!   secondary provider
//! - reports progress as a strictly ordered stream of events
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `catalog` - Registered code knowledge bases
//! - `embedding` - Query embeddings
//! - `vector_store` - Similarity search (Qdrant, in-memory)
//! - `generation` - Chat providers
//! - `rag` - Routing, retrieval, context formatting and answer generation
//! - `events` - Answer events and their sinks
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use transmeet::config::Settings;
//! use transmeet::events::{EventEmitter, JsonLinesSink};
//! use transmeet::orchestrator::Orchestrator;
//! use transmeet::rag::Question;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let mut emitter = EventEmitter::new(JsonLinesSink::new(std::io::stdout()));
//!     orchestrator
//!         .ask(&Question::new("What did we decide about the release?"), &mut emitter)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod events;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use error::{Result, TransmeetError};
