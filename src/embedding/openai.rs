//! OpenAI-compatible embeddings implementation.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{Result, TransmeetError};
use crate::openai::{create_client, http_client};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Embedder backed by any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: Option<u32>,
    timeout: Duration,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings. Fails if the configured key is missing.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(
                settings.base_url.as_deref(),
                settings.api_key_env.as_deref(),
                http_client(settings.timeout())?,
            )?,
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            timeout: settings.timeout(),
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(&self.model)
            .input(EmbeddingInput::StringArray(vec![text.to_string()]));
        if let Some(dimensions) = self.dimensions {
            args.dimensions(dimensions);
        }
        let request = args
            .build()
            .map_err(|e| TransmeetError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| TransmeetError::Embedding(format!("Timed out after {:?}", self.timeout)))?
            .map_err(|e| TransmeetError::Embedding(format!("Embedding API error: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .min_by_key(|e| e.index)
            .map(|e| e.embedding)
            .ok_or_else(|| TransmeetError::Embedding("Empty embedding response".to_string()))?;

        debug!("Generated query embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> EmbeddingSettings {
        EmbeddingSettings {
            base_url: Some(format!("{}/v1", server.uri())),
            api_key_env: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{"object": "embedding", "index": 0, "embedding": [0.25, 0.5, 0.75]}],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 3, "total_tokens": 3}
            })))
            .mount(&server)
            .await;

        let embedder = OpenAIEmbedder::from_settings(&settings_for(&server)).unwrap();
        let vector = embedder.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.25, 0.5, 0.75]);
        assert_eq!(embedder.model(), "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_embed_failure_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "bad input", "type": "invalid_request_error", "param": null, "code": null}
            })))
            .mount(&server)
            .await;

        let embedder = OpenAIEmbedder::from_settings(&settings_for(&server)).unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, TransmeetError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_embedding_is_attempted_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "slow down", "type": "requests", "param": null, "code": "rate_limit_exceeded"}
            })))
            .mount(&server)
            .await;

        let embedder = OpenAIEmbedder::from_settings(&settings_for(&server)).unwrap();
        let err = embedder.embed("hello").await.unwrap_err();

        assert!(matches!(err, TransmeetError::Embedding(_)));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
