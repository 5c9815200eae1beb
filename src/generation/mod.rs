//! Chat-completion providers used for routing and answer generation.

mod openai;

pub use openai::OpenAIChatProvider;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of answer fragments. An `Err` item means the provider failed mid-stream.
pub type TextStream = BoxStream<'static, Result<String>>;

/// A single-turn chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }

    /// Same prompt with a different temperature.
    pub fn with_temperature(&self, temperature: f32) -> Self {
        Self {
            temperature,
            ..self.clone()
        }
    }
}

/// A language model endpoint.
///
/// Implementations make exactly one attempt per call; retry and fallback
/// policy belongs to the caller.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Human-readable provider label for logs and events.
    fn name(&self) -> &str;

    /// Complete the request and return the whole text.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Start a streamed completion. Fragments are yielded as they arrive.
    async fn stream(&self, request: &ChatRequest) -> Result<TextStream>;
}
