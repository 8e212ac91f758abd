//! Durable transcript store over a [`ListBackend`]
//!
//! Each session's transcript lives in one list at
//! `{key_prefix}session:{session_id}:messages`. Entries are independent JSON
//! records (`{"role", "content", "ts"}`), so one corrupt entry never hides the
//! rest of the conversation.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::store::backend::ListBackend;
use crate::store::{message_cap, TranscriptStore};
use crate::types::{ChatMessage, Role, SessionId, StoredMessage};

/// Liveness probe schedule used when a durable store is opened.
#[derive(Debug, Clone)]
pub struct ProbePolicy {
    /// Total ping attempts, including the first.
    pub attempts: u32,
    /// Wait after the first failure; doubled after each further failure.
    pub initial_backoff: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

impl ProbePolicy {
    /// Probe without waiting between attempts.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            initial_backoff: Duration::ZERO,
        }
    }
}

/// Storage key for a session's transcript.
pub fn transcript_key(key_prefix: &str, session_id: &SessionId) -> String {
    format!("{}session:{}:messages", key_prefix, session_id)
}

/// Transcript persisted in a key-value list with a sliding TTL.
pub struct DurableStore {
    backend: Arc<dyn ListBackend>,
    key: String,
    max_turns: usize,
    ttl: Duration,
    healthy: bool,
}

impl DurableStore {
    /// Open the store and probe the backend.
    ///
    /// A failing probe does not return an error: the store is created and
    /// [`DurableStore::is_healthy`] reports `false`. Callers decide whether
    /// to trust it.
    pub fn open(
        backend: Arc<dyn ListBackend>,
        key_prefix: &str,
        session_id: &SessionId,
        max_turns: usize,
        ttl: Duration,
        policy: &ProbePolicy,
    ) -> Self {
        let key = transcript_key(key_prefix, session_id);
        let healthy = probe(backend.as_ref(), policy);
        tracing::info!(key = %key, healthy, "Opened durable transcript store");
        Self {
            backend,
            key,
            max_turns,
            ttl,
            healthy,
        }
    }

    /// Result of the liveness probe run at construction time.
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Ping with exponential backoff between attempts.
fn probe(backend: &dyn ListBackend, policy: &ProbePolicy) -> bool {
    let attempts = policy.attempts.max(1);
    let mut delay = policy.initial_backoff;

    for attempt in 1..=attempts {
        match backend.ping() {
            Ok(()) => return true,
            Err(e) => {
                tracing::warn!(attempt, attempts, error = %e, "Backend liveness probe failed");
            }
        }
        if attempt < attempts {
            std::thread::sleep(delay);
            delay *= 2;
        }
    }
    false
}

impl TranscriptStore for DurableStore {
    fn get_messages(&self) -> Result<Vec<ChatMessage>> {
        let raw = self.backend.range(&self.key)?;
        let mut messages = Vec::with_capacity(raw.len());
        for (idx, item) in raw.iter().enumerate() {
            match StoredMessage::decode(item) {
                Ok(msg) => messages.push(msg.into_chat()),
                Err(e) => {
                    tracing::debug!(key = %self.key, index = idx, error = %e, "Skipping malformed message record");
                }
            }
        }
        Ok(messages)
    }

    fn add_message(&mut self, role: &str, content: &str) -> Result<()> {
        let record = StoredMessage::now(Role::normalize(role), content).encode()?;
        self.backend
            .append_bounded(&self.key, &record, message_cap(self.max_turns), self.ttl)
    }

    fn clear(&mut self) -> Result<()> {
        tracing::info!(key = %self.key, "Clearing transcript");
        self.backend.delete(&self.key)
    }

    fn get_message_count(&self) -> Result<usize> {
        self.backend.len(&self.key)
    }
}
