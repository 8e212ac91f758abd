//! In-process transcript store

use std::collections::VecDeque;

use crate::error::Result;
use crate::store::{message_cap, TranscriptStore};
use crate::types::{ChatMessage, Role, StoredMessage};

/// Transcript kept in process memory.
///
/// Used when no durable backend is configured, and as the fallback when the
/// configured one is unreachable at startup. Nothing expires and nothing is
/// shared with other processes.
#[derive(Debug)]
pub struct EphemeralStore {
    messages: VecDeque<StoredMessage>,
    cap: usize,
}

impl EphemeralStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            cap: message_cap(max_turns),
        }
    }
}

impl TranscriptStore for EphemeralStore {
    fn get_messages(&self) -> Result<Vec<ChatMessage>> {
        Ok(self
            .messages
            .iter()
            .cloned()
            .map(StoredMessage::into_chat)
            .collect())
    }

    fn add_message(&mut self, role: &str, content: &str) -> Result<()> {
        self.messages
            .push_back(StoredMessage::now(Role::normalize(role), content));
        while self.messages.len() > self.cap {
            self.messages.pop_front();
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.messages.clear();
        Ok(())
    }

    fn get_message_count(&self) -> Result<usize> {
        Ok(self.messages.len())
    }
}
