//! List backend abstraction
//!
//! The durable store only needs a handful of list primitives from its
//! key-value backend. [`ListBackend`] captures them so the store can run on
//! Redis in production and on [`MemoryListBackend`] in tests or embedded use.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Error, Result};

/// List primitives consumed by [`crate::store::DurableStore`].
///
/// Implementations must be safe to share between stores addressing
/// different keys.
pub trait ListBackend: Send + Sync {
    /// Liveness check.
    fn ping(&self) -> Result<()>;

    /// Append `record` to the list at `key`, keep only the last `max_len`
    /// entries, and reset the key's time-to-live to `ttl`.
    fn append_bounded(&self, key: &str, record: &str, max_len: usize, ttl: Duration)
        -> Result<()>;

    /// All entries of the list, oldest first. Missing keys read as empty.
    fn range(&self, key: &str) -> Result<Vec<String>>;

    /// Length of the list at `key`.
    fn len(&self, key: &str) -> Result<usize>;

    /// Remove the key entirely.
    fn delete(&self, key: &str) -> Result<()>;
}

/// In-process [`ListBackend`] with a virtual clock.
///
/// Time only moves when [`MemoryListBackend::advance`] is called, which makes
/// expiry deterministic. [`MemoryListBackend::set_offline`] makes every call
/// fail like an unreachable server would.
#[derive(Debug, Default)]
pub struct MemoryListBackend {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    lists: HashMap<String, MemoryList>,
    now: Duration,
    offline: bool,
}

#[derive(Debug)]
struct MemoryList {
    items: VecDeque<String>,
    expires_at: Option<Duration>,
}

impl MemoryState {
    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(Error::Store("connection refused".to_string()));
        }
        Ok(())
    }

    /// Drop the key if its TTL has run out.
    fn live_list(&mut self, key: &str) -> Option<&mut MemoryList> {
        let now = self.now;
        let expired = self
            .lists
            .get(key)
            .and_then(|l| l.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            self.lists.remove(key);
        }
        self.lists.get_mut(key)
    }
}

impl MemoryListBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Store("memory backend lock poisoned".to_string()))
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut state) = self.lock() {
            state.now += by;
        }
    }

    /// Simulate the server going away (or coming back).
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.lock() {
            state.offline = offline;
        }
    }

    /// Append a raw entry without trimming or touching the TTL.
    pub fn push_raw(&self, key: &str, raw: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.check_online()?;
        if state.live_list(key).is_none() {
            state.lists.insert(
                key.to_string(),
                MemoryList {
                    items: VecDeque::new(),
                    expires_at: None,
                },
            );
        }
        if let Some(list) = state.lists.get_mut(key) {
            list.items.push_back(raw.to_string());
        }
        Ok(())
    }

    /// Remaining time-to-live of `key`, if it exists and has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut state = self.lock().ok()?;
        let now = state.now;
        state
            .live_list(key)
            .and_then(|l| l.expires_at)
            .map(|at| at - now)
    }

    /// Keys that currently exist.
    pub fn keys(&self) -> Vec<String> {
        let Ok(mut state) = self.lock() else {
            return Vec::new();
        };
        let all: Vec<String> = state.lists.keys().cloned().collect();
        all.into_iter()
            .filter(|k| state.live_list(k).is_some())
            .collect()
    }
}

impl ListBackend for MemoryListBackend {
    fn ping(&self) -> Result<()> {
        self.lock()?.check_online()
    }

    fn append_bounded(
        &self,
        key: &str,
        record: &str,
        max_len: usize,
        ttl: Duration,
    ) -> Result<()> {
        let mut state = self.lock()?;
        state.check_online()?;
        let expires_at = Some(state.now + ttl);

        if state.live_list(key).is_none() {
            state.lists.insert(
                key.to_string(),
                MemoryList {
                    items: VecDeque::new(),
                    expires_at: None,
                },
            );
        }
        let Some(list) = state.lists.get_mut(key) else {
            return Ok(());
        };
        list.items.push_back(record.to_string());
        while list.items.len() > max_len {
            list.items.pop_front();
        }
        list.expires_at = expires_at;

        // LTRIM to an empty range deletes the key in Redis; mirror that.
        if list.items.is_empty() {
            state.lists.remove(key);
        }
        Ok(())
    }

    fn range(&self, key: &str) -> Result<Vec<String>> {
        let mut state = self.lock()?;
        state.check_online()?;
        Ok(state
            .live_list(key)
            .map(|l| l.items.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn len(&self, key: &str) -> Result<usize> {
        let mut state = self.lock()?;
        state.check_online()?;
        Ok(state.live_list(key).map(|l| l.items.len()).unwrap_or(0))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.check_online()?;
        state.lists.remove(key);
        Ok(())
    }
}
