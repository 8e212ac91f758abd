//! Completion sources
//!
//! A [`CompletionSource`] turns a transcript into assistant text, either in
//! one blocking call or as a lazy stream of text fragments.
//!
//! - [`OpenAiSource`]: OpenAI-compatible `/chat/completions` endpoint
//! - [`EchoSource`]: offline source that repeats the last user message

pub mod echo;
pub mod openai;

pub use echo::EchoSource;
pub use openai::OpenAiSource;

use crate::error::Result;
use crate::types::ChatMessage;

/// Lazy, finite sequence of text fragments.
///
/// A stream cannot be restarted; retrying means calling
/// [`CompletionSource::stream_complete`] again. Fragments may be empty
/// (keep-alive events) and an item may be an error if the stream breaks.
pub type ChunkStream<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

/// A remote (or local) language model.
pub trait CompletionSource {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Generate the full reply in one call.
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;

    /// Start a streaming generation.
    fn stream_complete<'a>(
        &'a self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChunkStream<'a>>;
}
