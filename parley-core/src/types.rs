//! Core domain types for parley
//!
//! | Term | Definition |
//! |------|------------|
//! | **Transcript** | Ordered sequence of messages for one session |
//! | **Session** | One logical conversation, identified by a [`SessionId`] |
//! | **Turn** | One message; a turn pair is one user + one assistant message |
//!
//! The public read shape of a message is [`ChatMessage`] (`role` + `content`).
//! [`StoredMessage`] adds the write timestamp and only exists on the storage side.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================
// Role
// ============================================

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Parse a role, coercing anything unrecognized to [`Role::User`].
    pub fn normalize(s: &str) -> Self {
        s.parse().unwrap_or(Role::User)
    }

    /// Capitalized label used in transcripts ("User", "Assistant", "System").
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Messages
// ============================================

/// A message as seen by callers: role and content, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A message record as written to a durable list.
///
/// Wire format: `{"role": "...", "content": "...", "ts": <epoch seconds>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub ts: i64,
}

impl StoredMessage {
    /// Stamp a message with the current time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            ts: Utc::now().timestamp(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode one list entry.
    ///
    /// Entries written with an unknown role still decode; the role is
    /// normalized the same way writes are.
    pub fn decode(raw: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct RawRecord {
            role: String,
            content: String,
            #[serde(default)]
            ts: i64,
        }

        let record: RawRecord = serde_json::from_str(raw)?;
        Ok(Self {
            role: Role::normalize(&record.role),
            content: record.content,
            ts: record.ts,
        })
    }

    pub fn into_chat(self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content,
        }
    }
}

// ============================================
// Session
// ============================================

/// Opaque, stable identifier of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh id: 32 lowercase hex characters.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Accept an externally supplied id.
    ///
    /// Ids are embedded in storage keys, so empty ids and ids containing
    /// whitespace or `:` are rejected.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Config("session id must not be empty".to_string()));
        }
        if s.chars().any(|c| c == ':' || c.is_whitespace()) {
            return Err(Error::Config(format!(
                "session id must not contain ':' or whitespace: {:?}",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for display.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
