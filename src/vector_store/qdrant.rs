//! Qdrant vector search over its REST API.

use super::{Provenance, ScoredRecord, VectorSearch};
use crate::config::VectorStoreSettings;
use crate::error::{Result, TransmeetError};
use crate::openai::resolve_api_key;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

/// Read-only Qdrant client. Cheap to share across concurrent searches.
pub struct QdrantStore {
    client: reqwest::Client,
    base: Url,
    api_key: Option<String>,
}

impl QdrantStore {
    /// Create a client from settings.
    pub fn from_settings(settings: &VectorStoreSettings) -> Result<Self> {
        let base = Url::parse(&settings.url).map_err(|e| {
            TransmeetError::Config(format!("Invalid vector store url '{}': {}", settings.url, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            base,
            api_key: resolve_api_key(settings.api_key_env.as_deref())?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TransmeetError::Config(format!("Vector store url '{}' cannot be a base", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// List collection names. Used for reachability diagnostics.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Listing {
            result: Collections,
        }
        #[derive(Deserialize)]
        struct Collections {
            collections: Vec<Named>,
        }
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }

        let url = self.endpoint(&["collections"])?;
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| TransmeetError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransmeetError::Transport(format!(
                "Listing collections returned {}",
                response.status()
            )));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| TransmeetError::Transport(e.to_string()))?;
        Ok(listing.result.collections.into_iter().map(|c| c.name).collect())
    }
}

#[async_trait]
impl VectorSearch for QdrantStore {
    #[instrument(skip(self, vector), fields(dims = vector.len()))]
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let url = self.endpoint(&["collections", collection, "points", "search"])?;
        let body = serde_json::json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransmeetError::Transport(format!("{}: {}", collection, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransmeetError::CollectionNotFound(collection.to_string()));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransmeetError::Transport(format!(
                "{}: search returned {} {}",
                collection, status, detail
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| TransmeetError::Transport(format!("{}: bad response: {}", collection, e)))?;

        let mut records = Vec::with_capacity(parsed.result.len());
        for point in parsed.result {
            let payload = point.payload.unwrap_or_default();
            match Provenance::from_payload(&payload) {
                Ok(provenance) => records.push(ScoredRecord::new(point.score, provenance)),
                Err(e) => warn!("Dropping point from '{}': {}", collection, e),
            }
        }

        debug!("'{}' returned {} records", collection, records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> QdrantStore {
        let settings = VectorStoreSettings {
            url: server.uri(),
            ..VectorStoreSettings::default()
        };
        QdrantStore::from_settings(&settings).unwrap()
    }

    #[tokio::test]
    async fn test_search_parses_records_and_drops_unknown_sources() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/kb_alpha/points/search"))
            .and(body_partial_json(json!({"limit": 7, "with_payload": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"id": 1, "version": 0, "score": 0.91,
                     "payload": {"source": "github", "file_path": "a.rs", "code": "fn a() {}"}},
                    {"id": 2, "version": 0, "score": 0.80,
                     "payload": {"source": "wiki", "text": "??"}},
                    {"id": 3, "version": 0, "score": 0.72,
                     "payload": {"source": "meeting", "file_name": "m1.json", "text": "we shipped"}}
                ],
                "status": "ok",
                "time": 0.001
            })))
            .mount(&server)
            .await;

        let records = store_for(&server).search("kb_alpha", &[0.1, 0.2], 7).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].provenance.kind(), "code");
        assert_eq!(records[1].provenance.origin(), "m1.json");
        assert!((records[0].score - 0.91).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_collection_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/kb_missing/points/search"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "status": {"error": "Not found: Collection `kb_missing` doesn't exist!"},
                "time": 0.0
            })))
            .mount(&server)
            .await;

        let err = store_for(&server).search("kb_missing", &[0.1], 5).await.unwrap_err();
        assert!(matches!(err, TransmeetError::CollectionNotFound(c) if c == "kb_missing"));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = store_for(&server).search("kb_alpha", &[0.1], 5).await.unwrap_err();
        assert!(matches!(err, TransmeetError::Transport(_)));
    }

    #[tokio::test]
    async fn test_list_collections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"collections": [{"name": "kb_alpha"}, {"name": "transmeet_meetings_local"}]},
                "status": "ok",
                "time": 0.0
            })))
            .mount(&server)
            .await;

        let names = store_for(&server).list_collections().await.unwrap();
        assert_eq!(names, vec!["kb_alpha", "transmeet_meetings_local"]);
    }
}
