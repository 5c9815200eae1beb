//! Pipeline events and the sinks that deliver them to callers.
//!
//! Every request produces a strictly ordered sequence of events closed by
//! exactly one terminal event (`StreamEnd`, `FinalAnswer` or `Error`).

use crate::error::{Result, TransmeetError};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use tokio::sync::mpsc;
use tracing::warn;

/// Payload carried by `STREAM_END` on the wire.
const STREAM_END_PAYLOAD: &str = "Success";

/// One observable step of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerEvent {
    Info(String),
    Warning(String),
    Error(String),
    AnswerChunk(String),
    StreamEnd,
    FinalAnswer(String),
}

#[derive(Serialize)]
struct WireEvent<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    payload: &'a str,
}

impl AnswerEvent {
    pub fn info(text: impl Into<String>) -> Self {
        AnswerEvent::Info(text.into())
    }

    pub fn warning(text: impl Into<String>) -> Self {
        AnswerEvent::Warning(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        AnswerEvent::Error(text.into())
    }

    /// Wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            AnswerEvent::Info(_) => "INFO",
            AnswerEvent::Warning(_) => "WARNING",
            AnswerEvent::Error(_) => "ERROR",
            AnswerEvent::AnswerChunk(_) => "ANSWER_CHUNK",
            AnswerEvent::StreamEnd => "STREAM_END",
            AnswerEvent::FinalAnswer(_) => "FINAL_ANSWER",
        }
    }

    /// Wire `payload` text.
    pub fn payload(&self) -> &str {
        match self {
            AnswerEvent::Info(text)
            | AnswerEvent::Warning(text)
            | AnswerEvent::Error(text)
            | AnswerEvent::AnswerChunk(text)
            | AnswerEvent::FinalAnswer(text) => text,
            AnswerEvent::StreamEnd => STREAM_END_PAYLOAD,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnswerEvent::StreamEnd | AnswerEvent::FinalAnswer(_) | AnswerEvent::Error(_)
        )
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> String {
        let wire = WireEvent {
            kind: self.kind(),
            payload: self.payload(),
        };
        // Two string fields always serialize.
        serde_json::to_string(&wire).unwrap_or_default()
    }
}

/// Destination for events.
#[async_trait]
pub trait EventSink: Send {
    async fn deliver(&mut self, event: AnswerEvent) -> Result<()>;
}

/// Collects events in memory.
#[async_trait]
impl EventSink for Vec<AnswerEvent> {
    async fn deliver(&mut self, event: AnswerEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Newline-delimited JSON, flushed after every event.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    async fn deliver(&mut self, event: AnswerEvent) -> Result<()> {
        writeln!(self.writer, "{}", event.to_json_line())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards events to an async channel (HTTP streaming responses).
pub struct ChannelSink {
    tx: mpsc::Sender<AnswerEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<AnswerEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn deliver(&mut self, event: AnswerEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TransmeetError::Emit("event receiver dropped".to_string()))
    }
}

/// Orders events into a sink and guarantees a single terminal event.
pub struct EventEmitter<S: EventSink> {
    sink: S,
    terminated: bool,
}

impl<S: EventSink> EventEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            terminated: false,
        }
    }

    /// Deliver an event. Anything after the terminal event is dropped.
    pub async fn emit(&mut self, event: AnswerEvent) -> Result<()> {
        if self.terminated {
            warn!("Dropping {} event emitted after the terminal event", event.kind());
            return Ok(());
        }
        self.terminated = event.is_terminal();
        self.sink.deliver(event).await
    }

    /// Whether the terminal event has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
