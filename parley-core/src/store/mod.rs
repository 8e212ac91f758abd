//! Transcript storage
//!
//! Every backend implements [`TranscriptStore`], a bounded, append-only log of
//! [`ChatMessage`]s for a single session:
//! - [`EphemeralStore`]: in-process, lost when the process exits
//! - [`DurableStore`]: a list in a key-value backend ([`ListBackend`]) with a
//!   TTL refreshed on every write
//!
//! Both keep at most `2 * max_turns` messages and drop the oldest first.

pub mod backend;
pub mod durable;
pub mod ephemeral;
pub mod redis_backend;

pub use backend::{ListBackend, MemoryListBackend};
pub use durable::{DurableStore, ProbePolicy};
pub use ephemeral::EphemeralStore;
pub use redis_backend::{ClientRegistry, RedisBackend};

use crate::error::Result;
use crate::types::ChatMessage;

/// Uniform contract over transcript backends.
pub trait TranscriptStore: Send {
    /// All messages, oldest first. Undecodable records are skipped.
    fn get_messages(&self) -> Result<Vec<ChatMessage>>;

    /// Append a message stamped with the current time.
    ///
    /// Unknown roles are stored as `user`. The transcript is trimmed to the
    /// most recent `2 * max_turns` messages afterwards.
    fn add_message(&mut self, role: &str, content: &str) -> Result<()>;

    /// Delete the whole transcript. The next append recreates it.
    fn clear(&mut self) -> Result<()>;

    /// Number of stored messages.
    fn get_message_count(&self) -> Result<usize>;
}

/// Maximum number of messages kept for a `max_turns` bound.
pub fn message_cap(max_turns: usize) -> usize {
    max_turns.saturating_mul(2)
}
