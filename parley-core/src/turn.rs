//! Stream consumption loop
//!
//! [`TurnRunner::run`] produces one assistant turn:
//!
//! 1. Append the user's message, so it is part of the context sent out.
//! 2. Stream a completion over the full transcript.
//! 3. Accumulate fragments, checking the [`CancelToken`] before each one.
//! 4. Commit the joined text once, unless it is empty.
//! 5. If the stream fails before producing any text, make one blocking
//!    call instead; if that fails too, commit a humanized error.
//!
//! The token's flags are released when the turn ends, whichever path it took.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::humanize::humanize_error;
use crate::llm::CompletionSource;
use crate::store::TranscriptStore;
use crate::types::Role;

/// How a turn ended. Every variant except [`TurnOutcome::Empty`] carries the
/// text that was committed as the assistant message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream ran to completion.
    Streamed(String),
    /// Cancelled after some text arrived; the partial text was kept.
    Cancelled(String),
    /// The stream broke after some text arrived; the partial text was kept.
    Salvaged(String),
    /// The stream failed up front and the blocking call succeeded.
    Fallback(String),
    /// Both calls failed; a humanized explanation was committed.
    Failed(String),
    /// Nothing to commit (cancelled before the first fragment, or the model
    /// returned no text).
    Empty,
}

impl TurnOutcome {
    /// Text committed as the assistant turn, if any.
    pub fn committed(&self) -> Option<&str> {
        match self {
            TurnOutcome::Streamed(t)
            | TurnOutcome::Cancelled(t)
            | TurnOutcome::Salvaged(t)
            | TurnOutcome::Fallback(t)
            | TurnOutcome::Failed(t) => Some(t),
            TurnOutcome::Empty => None,
        }
    }
}

/// Drives a [`CompletionSource`] against a [`TranscriptStore`].
pub struct TurnRunner<'a> {
    source: &'a dyn CompletionSource,
    temperature: f32,
}

/// What the streaming phase produced.
enum StreamResult {
    Finished(String),
    Cancelled(String),
    Broken { partial: String, error: Error },
}

impl<'a> TurnRunner<'a> {
    pub fn new(source: &'a dyn CompletionSource, temperature: f32) -> Self {
        Self {
            source,
            temperature,
        }
    }

    /// Run one user turn to completion.
    ///
    /// `on_chunk` sees every non-empty fragment as it arrives, for display.
    /// Store failures are returned as errors; completion failures never are.
    pub fn run(
        &self,
        store: &mut dyn TranscriptStore,
        prompt: &str,
        cancel: &CancelToken,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<TurnOutcome> {
        let _generation = cancel.begin();

        store.add_message(Role::User.as_str(), prompt)?;
        let history = store.get_messages()?;

        let outcome = match self.stream(&history, cancel, on_chunk) {
            StreamResult::Finished(text) if text.is_empty() => TurnOutcome::Empty,
            StreamResult::Finished(text) => TurnOutcome::Streamed(text),
            StreamResult::Cancelled(text) if text.is_empty() => {
                tracing::info!("Generation cancelled before any output");
                TurnOutcome::Empty
            }
            StreamResult::Cancelled(text) => {
                tracing::info!(chars = text.len(), "Generation cancelled, keeping partial reply");
                TurnOutcome::Cancelled(text)
            }
            StreamResult::Broken { partial, error } if !partial.is_empty() => {
                tracing::warn!(error = %error, chars = partial.len(), "Stream broke, keeping partial reply");
                TurnOutcome::Salvaged(partial)
            }
            StreamResult::Broken { error, .. } => {
                tracing::warn!(source = self.source.name(), error = %error, "Streaming failed, falling back to blocking completion");
                match self.source.complete(&history, self.temperature) {
                    Ok(text) => {
                        on_chunk(&text);
                        TurnOutcome::Fallback(text)
                    }
                    Err(e) => {
                        tracing::error!(source = self.source.name(), error = %e, "Fallback completion failed");
                        let text = humanize_error(&e);
                        on_chunk(&text);
                        TurnOutcome::Failed(text)
                    }
                }
            }
        };

        if let Some(text) = outcome.committed() {
            if !text.is_empty() {
                store.add_message(Role::Assistant.as_str(), text)?;
            }
        }
        Ok(outcome)
    }

    fn stream(
        &self,
        history: &[crate::types::ChatMessage],
        cancel: &CancelToken,
        on_chunk: &mut dyn FnMut(&str),
    ) -> StreamResult {
        let mut chunks: Vec<String> = Vec::new();

        let stream = match self.source.stream_complete(history, self.temperature) {
            Ok(stream) => stream,
            Err(error) => {
                return StreamResult::Broken {
                    partial: String::new(),
                    error,
                }
            }
        };

        for item in stream {
            if cancel.is_cancelled() {
                return StreamResult::Cancelled(chunks.concat());
            }
            match item {
                Ok(chunk) if chunk.is_empty() => continue,
                Ok(chunk) => {
                    on_chunk(&chunk);
                    chunks.push(chunk);
                }
                Err(error) => {
                    return StreamResult::Broken {
                        partial: chunks.concat(),
                        error,
                    }
                }
            }
        }

        // A stop pressed while the last fragment was in flight still counts.
        if cancel.is_cancelled() {
            return StreamResult::Cancelled(chunks.concat());
        }
        StreamResult::Finished(chunks.concat())
    }
}
