//! Vector search abstraction for Transmeet.
//!
//! Retrieval only ever needs one capability from the store: a scored
//! nearest-neighbour search against a named collection.

mod memory;
mod qdrant;

pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;

use crate::error::{Result, TransmeetError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Where a retrieved record came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Provenance {
    /// A snippet of source code from an indexed repository.
    Code { file_path: String, snippet: String },
    /// A passage from a meeting transcript.
    Meeting { file_name: String, text: String },
}

impl Provenance {
    /// Parse a stored payload by its `source` tag.
    ///
    /// `github` is accepted as an alias of `code` and `code` as an alias of
    /// `snippet`, matching what the repository indexer writes.
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self> {
        let text_field = |key: &str| payload.get(key).and_then(Value::as_str);

        match text_field("source") {
            Some("code") | Some("github") => Ok(Provenance::Code {
                file_path: text_field("file_path").unwrap_or("unknown_file").to_string(),
                snippet: text_field("snippet")
                    .or_else(|| text_field("code"))
                    .unwrap_or_default()
                    .to_string(),
            }),
            Some("meeting") => Ok(Provenance::Meeting {
                file_name: text_field("file_name").unwrap_or("unknown_meeting").to_string(),
                text: text_field("text").unwrap_or_default().to_string(),
            }),
            Some(other) => Err(TransmeetError::UnknownProvenance(other.to_string())),
            None => Err(TransmeetError::UnknownProvenance("<missing source tag>".to_string())),
        }
    }

    /// Short label used in context headers.
    pub fn kind(&self) -> &'static str {
        match self {
            Provenance::Code { .. } => "code",
            Provenance::Meeting { .. } => "meeting",
        }
    }

    /// File path or meeting file name.
    pub fn origin(&self) -> &str {
        match self {
            Provenance::Code { file_path, .. } => file_path,
            Provenance::Meeting { file_name, .. } => file_name,
        }
    }
}

/// A record returned by a vector search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    /// Similarity score (provider-defined, higher is more relevant).
    pub score: f32,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl ScoredRecord {
    pub fn new(score: f32, provenance: Provenance) -> Self {
        Self { score, provenance }
    }
}

/// Nearest-neighbour search over named collections.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Search `collection` for the `limit` records closest to `vector`,
    /// highest score first.
    ///
    /// Fails with `CollectionNotFound` for unknown collections and
    /// `Transport` for any other failure.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_code_payload_accepts_indexer_aliases() {
        let p = Provenance::from_payload(&payload(json!({
            "source": "github",
            "file_path": "src/main.py",
            "code": "print('hi')"
        })))
        .unwrap();

        assert_eq!(
            p,
            Provenance::Code {
                file_path: "src/main.py".to_string(),
                snippet: "print('hi')".to_string()
            }
        );
        assert_eq!(p.kind(), "code");
    }

    #[test]
    fn test_meeting_payload_defaults_missing_fields() {
        let p = Provenance::from_payload(&payload(json!({"source": "meeting", "text": "we agreed"})))
            .unwrap();
        assert_eq!(p.origin(), "unknown_meeting");
        assert_eq!(p.kind(), "meeting");
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let err = Provenance::from_payload(&payload(json!({"source": "slack", "text": "x"})))
            .unwrap_err();
        assert!(matches!(err, TransmeetError::UnknownProvenance(tag) if tag == "slack"));

        let err = Provenance::from_payload(&payload(json!({"text": "x"}))).unwrap_err();
        assert!(matches!(err, TransmeetError::UnknownProvenance(_)));
    }
}
