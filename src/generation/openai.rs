//! OpenAI-compatible chat provider.

use super::{ChatProvider, ChatRequest, TextStream};
use crate::config::ProviderSettings;
use crate::error::{Result, TransmeetError};
use crate::openai::{create_client, http_client};
use async_openai::config::{Config, OpenAIConfig};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateChatCompletionStreamResponse,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{retry::Never, Event, EventSource};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Chat provider for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAIChatProvider {
    client: async_openai::Client<OpenAIConfig>,
    http: reqwest::Client,
    label: String,
    model: String,
    timeout: Duration,
}

impl OpenAIChatProvider {
    /// Create a provider from settings. Fails if the configured key is missing.
    pub fn from_settings(label: &str, settings: &ProviderSettings) -> Result<Self> {
        let http = http_client(settings.timeout())?;
        Ok(Self {
            client: create_client(
                settings.base_url.as_deref(),
                settings.api_key_env.as_deref(),
                http.clone(),
            )?,
            http,
            label: label.to_string(),
            model: settings.model.clone(),
            timeout: settings.timeout(),
        })
    }

    fn build_request(&self, request: &ChatRequest) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| self.error(e))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| self.error(e))?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(request.temperature)
            .build()
            .map_err(|e| self.error(e))
    }

    fn error(&self, e: impl std::fmt::Display) -> TransmeetError {
        provider_error(&self.label, e)
    }

    fn timed_out(&self) -> TransmeetError {
        self.error(format!("no response within {:?}", self.timeout))
    }
}

fn provider_error(label: &str, e: impl std::fmt::Display) -> TransmeetError {
    TransmeetError::Provider(format!("{}: {}", label, e))
}

/// Readable text for a failed event source, including the error body when the
/// server rejected the request.
async fn describe_stream_error(error: reqwest_eventsource::Error) -> String {
    match error {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            format!("{} {}", status, body.trim())
        }
        other => other.to_string(),
    }
}

/// Turn an open event source into answer fragments.
///
/// The source never reconnects. The first error ends the stream, and
/// `[DONE]` or the server closing the connection ends it normally.
fn fragments(source: EventSource, label: String) -> TextStream {
    futures::stream::unfold(Some(source), move |state| {
        let label = label.clone();
        async move {
            let mut source = state?;
            loop {
                let failure = match source.next().await {
                    Some(Ok(Event::Open)) => continue,
                    Some(Ok(Event::Message(message))) if message.data == "[DONE]" => {
                        source.close();
                        return None;
                    }
                    Some(Ok(Event::Message(message))) => {
                        match serde_json::from_str::<CreateChatCompletionStreamResponse>(&message.data) {
                            Ok(chunk) => {
                                let text = chunk
                                    .choices
                                    .into_iter()
                                    .next()
                                    .and_then(|choice| choice.delta.content)
                                    .filter(|text| !text.is_empty());
                                match text {
                                    Some(text) => return Some((Ok(text), Some(source))),
                                    None => continue,
                                }
                            }
                            Err(e) => format!("malformed stream event ({}): {}", e, message.data),
                        }
                    }
                    Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                        source.close();
                        return None;
                    }
                    Some(Err(e)) => describe_stream_error(e).await,
                };

                source.close();
                warn!("{} stream failed: {}", label, failure);
                return Some((Err(provider_error(&label, failure)), None));
            }
        }
    })
    .boxed()
}

#[async_trait]
impl ChatProvider for OpenAIChatProvider {
    fn name(&self) -> &str {
        &self.label
    }

    #[instrument(skip(self, request), fields(provider = %self.label, model = %self.model))]
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let request = self.build_request(request)?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| self.timed_out())?
            .map_err(|e| self.error(e))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.error("empty response"))?;

        debug!("Completion returned {} chars", text.len());
        Ok(text)
    }

    #[instrument(skip(self, request), fields(provider = %self.label, model = %self.model))]
    async fn stream(&self, request: &ChatRequest) -> Result<TextStream> {
        let mut request = self.build_request(request)?;
        request.stream = Some(true);

        let config = self.client.config();
        let builder = self
            .http
            .post(config.url("/chat/completions"))
            .headers(config.headers())
            .json(&request);
        let mut source = EventSource::new(builder).map_err(|e| self.error(e))?;
        source.set_retry_policy(Box::new(Never));

        // A refused or rejected request fails here, before any fragment.
        let opened = tokio::time::timeout(self.timeout, source.next())
            .await
            .map_err(|_| self.timed_out())?;
        match opened {
            Some(Ok(Event::Open)) => {}
            Some(Ok(Event::Message(_))) | None => {
                source.close();
                return Err(self.error("stream did not open"));
            }
            Some(Err(e)) => {
                source.close();
                return Err(self.error(describe_stream_error(e).await));
            }
        }

        Ok(fragments(source, self.label.clone()))
    }
}
