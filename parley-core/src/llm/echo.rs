//! Echo completion source
//!
//! Makes no network calls. Replies with the last user message, which is
//! enough to drive the chat loop end to end without an API key.

use crate::error::Result;
use crate::llm::{ChunkStream, CompletionSource};
use crate::types::{ChatMessage, Role};

/// Offline source that echoes the most recent user message.
#[derive(Debug, Default)]
pub struct EchoSource;

impl EchoSource {
    pub fn new() -> Self {
        Self
    }

    fn reply(messages: &[ChatMessage]) -> String {
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        format!("You said: {}", last)
    }
}

impl CompletionSource for EchoSource {
    fn name(&self) -> &str {
        "echo"
    }

    fn complete(&self, messages: &[ChatMessage], _temperature: f32) -> Result<String> {
        Ok(Self::reply(messages))
    }

    fn stream_complete<'a>(
        &'a self,
        messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<ChunkStream<'a>> {
        let reply = Self::reply(messages);
        // Split after each space so the fragments concatenate back exactly.
        let chunks: Vec<String> = reply.split_inclusive(' ').map(str::to_string).collect();
        Ok(Box::new(chunks.into_iter().map(Ok)))
    }
}
