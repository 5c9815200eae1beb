//! Ask command implementation.

use crate::cli::{preflight, PlainTextSink};
use crate::config::Settings;
use crate::events::{AnswerEvent, EventEmitter, EventSink, JsonLinesSink};
use crate::orchestrator::Orchestrator;
use crate::rag::Question;
use anyhow::Result;
use std::io::IsTerminal;
use tokio::io::AsyncReadExt;

/// Run the ask command.
///
/// Emits JSON lines on stdout unless `plain` is set. Returns an error (exit
/// code 1) unless the answer ended with `STREAM_END` or `FINAL_ANSWER`.
pub async fn run_ask(
    question: &[String],
    history: Option<String>,
    plain: bool,
    verbose: bool,
    settings: Settings,
) -> Result<()> {
    let history = match history {
        Some(history) => Some(history),
        None => read_piped_history().await?,
    };

    let mut question = Question::new(question.join(" "));
    if let Some(history) = history {
        question = question.with_history(history);
    }

    if plain {
        let mut emitter = EventEmitter::new(PlainTextSink::new(verbose));
        answer(&question, &settings, &mut emitter).await
    } else {
        let mut emitter = EventEmitter::new(JsonLinesSink::new(std::io::stdout()));
        answer(&question, &settings, &mut emitter).await
    }
}

async fn answer<S: EventSink>(
    question: &Question,
    settings: &Settings,
    emitter: &mut EventEmitter<S>,
) -> Result<()> {
    if question.text.is_empty() {
        emitter.emit(AnswerEvent::error("Question is empty")).await?;
        anyhow::bail!("Question is empty");
    }

    let orchestrator = match preflight::check_credentials(settings)
        .and_then(|_| Orchestrator::new(settings))
    {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            emitter.emit(AnswerEvent::error(e.to_string())).await?;
            return Err(e.into());
        }
    };

    orchestrator.ask(question, emitter).await?;
    Ok(())
}

/// History piped on stdin by a chat front-end. Nothing is read from a terminal.
async fn read_piped_history() -> Result<Option<String>> {
    if std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let mut buf = String::new();
    tokio::io::stdin().read_to_string(&mut buf).await?;
    Ok((!buf.trim().is_empty()).then_some(buf))
}
