//! Scripted collaborators for unit tests.

use crate::embedding::Embedder;
use crate::error::{Result, TransmeetError};
use crate::generation::{ChatProvider, ChatRequest, TextStream};
use crate::vector_store::{ScoredRecord, VectorSearch};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum StreamScript {
    Refused(String),
    Fragments(Vec<std::result::Result<String, String>>),
}

/// Chat provider that replays queued responses and records every request.
pub struct ScriptedProvider {
    name: String,
    completions: Mutex<VecDeque<std::result::Result<String, String>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            completions: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn complete_ok(self, text: &str) -> Self {
        self.completions.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn complete_err(self, message: &str) -> Self {
        self.completions.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn stream_ok(self, fragments: &[&str]) -> Self {
        let items = fragments.iter().map(|f| Ok(f.to_string())).collect();
        self.streams.lock().unwrap().push_back(StreamScript::Fragments(items));
        self
    }

    /// The stream call itself fails (e.g. connection refused).
    pub fn stream_refused(self, message: &str) -> Self {
        self.streams
            .lock()
            .unwrap()
            .push_back(StreamScript::Refused(message.to_string()));
        self
    }

    /// Yield `fragments`, then fail mid-stream.
    pub fn stream_then_fail(self, fragments: &[&str], message: &str) -> Self {
        let mut items: Vec<_> = fragments.iter().map(|f| Ok(f.to_string())).collect();
        items.push(Err(message.to_string()));
        self.streams.lock().unwrap().push_back(StreamScript::Fragments(items));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn provider_error(&self, message: &str) -> TransmeetError {
        TransmeetError::Provider(format!("{}: {}", self.name, message))
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.completions.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(self.provider_error(&message)),
            None => Err(self.provider_error("no scripted completion")),
        }
    }

    async fn stream(&self, request: &ChatRequest) -> Result<TextStream> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.streams.lock().unwrap().pop_front();
        match next {
            Some(StreamScript::Fragments(items)) => {
                let name = self.name.clone();
                let items = items.into_iter().map(move |item| {
                    item.map_err(|m| TransmeetError::Provider(format!("{}: {}", name, m)))
                });
                Ok(futures::stream::iter(items).boxed())
            }
            Some(StreamScript::Refused(message)) => Err(self.provider_error(&message)),
            None => Err(self.provider_error("no scripted stream")),
        }
    }
}

/// Embedder returning a fixed vector, or always failing.
pub struct FixedEmbedder {
    vector: Option<Vec<f32>>,
    calls: Mutex<usize>,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: None,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        *self.calls.lock().unwrap() += 1;
        self.vector
            .clone()
            .ok_or_else(|| TransmeetError::Embedding("embedding service unavailable".to_string()))
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// Wraps a store and records which collections were searched, in order.
pub struct RecordingStore {
    inner: Arc<dyn VectorSearch>,
    searched: Mutex<Vec<(String, usize)>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn VectorSearch>) -> Self {
        Self {
            inner,
            searched: Mutex::new(Vec::new()),
        }
    }

    /// `(collection, limit)` pairs in call order.
    pub fn searched(&self) -> Vec<(String, usize)> {
        self.searched.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorSearch for RecordingStore {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        self.searched
            .lock()
            .unwrap()
            .push((collection.to_string(), limit));
        self.inner.search(collection, vector, limit).await
    }
}
