//! Answer generation with streaming and a single fallback hop.

use super::Question;
use crate::config::Prompts;
use crate::error::{Result, TransmeetError};
use crate::events::{AnswerEvent, EventEmitter, EventSink};
use crate::generation::{ChatProvider, ChatRequest};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Marker used in the prompt when there is no conversation history.
const NO_HISTORY: &str = "None.";

/// How the answer was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The primary provider streamed the answer; `StreamEnd` was emitted.
    Streamed { chunks: usize },
    /// The fallback provider answered; `FinalAnswer` was emitted.
    Fallback,
}

/// Produces the final answer from the primary provider, or once from the fallback.
pub struct AnswerGenerator {
    primary: Arc<dyn ChatProvider>,
    fallback: Arc<dyn ChatProvider>,
    prompts: Arc<Prompts>,
    primary_temperature: f32,
    fallback_temperature: f32,
}

impl AnswerGenerator {
    pub fn new(
        primary: Arc<dyn ChatProvider>,
        fallback: Arc<dyn ChatProvider>,
        prompts: Arc<Prompts>,
    ) -> Self {
        Self {
            primary,
            fallback,
            prompts,
            primary_temperature: 0.7,
            fallback_temperature: 0.2,
        }
    }

    /// Set sampling temperatures for the primary and fallback paths.
    pub fn with_temperatures(mut self, primary: f32, fallback: f32) -> Self {
        self.primary_temperature = primary;
        self.fallback_temperature = fallback;
        self
    }

    /// Build the primary request: system instructions plus history, context and question.
    pub fn build_request(&self, question: &Question, context: &str) -> ChatRequest {
        let mut vars = HashMap::new();
        vars.insert(
            "history".to_string(),
            question.history.clone().unwrap_or_else(|| NO_HISTORY.to_string()),
        );
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.text.clone());

        let user = self.prompts.render_with_custom(&self.prompts.answer.user, &vars);
        ChatRequest::new(self.prompts.answer.system.clone(), user, self.primary_temperature)
    }

    /// Generate and emit the answer, ending with exactly one terminal event.
    ///
    /// Returns an error only when both providers failed (after emitting `Error`)
    /// or when the event sink itself fails.
    #[instrument(skip_all, fields(primary = %self.primary.name(), fallback = %self.fallback.name()))]
    pub async fn generate<S: EventSink>(
        &self,
        question: &Question,
        context: &str,
        emitter: &mut EventEmitter<S>,
    ) -> Result<GenerationOutcome> {
        let request = self.build_request(question, context);
        emitter.emit(AnswerEvent::info("Generating final answer...")).await?;

        let (primary_error, chunks) = match self.primary.stream(&request).await {
            Ok(mut stream) => {
                let mut chunks = 0usize;
                let mut failure = None;
                while let Some(fragment) = stream.next().await {
                    match fragment {
                        Ok(text) => {
                            chunks += 1;
                            emitter.emit(AnswerEvent::AnswerChunk(text)).await?;
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                (failure, chunks)
            }
            Err(e) => (Some(e), 0),
        };

        let Some(primary_error) = primary_error else {
            debug!("Primary stream finished after {} chunks", chunks);
            emitter.emit(AnswerEvent::StreamEnd).await?;
            return Ok(GenerationOutcome::Streamed { chunks });
        };

        warn!("Primary provider failed after {} chunks: {}", chunks, primary_error);
        let notice = if chunks > 0 {
            format!(
                "Primary provider failed mid-answer ({}); discarding partial answer and using {}",
                primary_error,
                self.fallback.name()
            )
        } else {
            format!(
                "Primary provider failed ({}); using {}",
                primary_error,
                self.fallback.name()
            )
        };
        emitter.emit(AnswerEvent::warning(notice)).await?;

        let fallback_request = request.with_temperature(self.fallback_temperature);
        match self.fallback.complete(&fallback_request).await {
            Ok(answer) => {
                info!("Fallback provider answered ({} chars)", answer.len());
                emitter.emit(AnswerEvent::FinalAnswer(answer)).await?;
                Ok(GenerationOutcome::Fallback)
            }
            Err(e) => {
                let message = format!(
                    "Answer generation failed: primary ({}), fallback ({})",
                    primary_error, e
                );
                emitter.emit(AnswerEvent::error(message.clone())).await?;
                Err(TransmeetError::Provider(message))
            }
        }
    }
}
