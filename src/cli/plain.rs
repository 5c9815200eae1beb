//! Plain-text rendering of answer events for terminals.

use super::Output;
use crate::error::Result;
use crate::events::{AnswerEvent, EventSink};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::io::{Stdout, Write};

/// Human-oriented output: answer text on the writer (stdout), progress on stderr.
///
/// Without `verbose`, `Info` events only drive a spinner that is cleared
/// before any answer text is printed.
pub struct PlainTextSink<W: Write + Send = Stdout> {
    writer: W,
    verbose: bool,
    spinner: Option<ProgressBar>,
}

impl PlainTextSink {
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(std::io::stdout(), verbose)
    }
}

impl<W: Write + Send> PlainTextSink<W> {
    pub fn with_writer(writer: W, verbose: bool) -> Self {
        Self {
            writer,
            verbose,
            spinner: None,
        }
    }

    pub fn into_inner(mut self) -> W {
        self.clear_spinner();
        self.writer
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for PlainTextSink<W> {
    async fn deliver(&mut self, event: AnswerEvent) -> Result<()> {
        if let AnswerEvent::Info(text) = &event {
            if self.verbose {
                Output::progress(text);
            } else {
                self.spinner
                    .get_or_insert_with(|| Output::spinner(text))
                    .set_message(text.clone());
            }
            return Ok(());
        }

        self.clear_spinner();
        match event {
            AnswerEvent::Info(_) => {}
            AnswerEvent::Warning(text) => Output::warning(&text),
            AnswerEvent::Error(text) => Output::error(&text),
            AnswerEvent::AnswerChunk(text) => {
                write!(self.writer, "{}", text)?;
                self.writer.flush()?;
            }
            AnswerEvent::StreamEnd => writeln!(self.writer)?,
            AnswerEvent::FinalAnswer(text) => writeln!(self.writer, "{}", text)?,
        }
        Ok(())
    }
}
