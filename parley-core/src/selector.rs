//! Startup choice between durable and ephemeral transcript storage
//!
//! Evaluated once per session. A configured but unusable durable backend
//! degrades to in-memory storage with a warning; it never stops the chat
//! from starting.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::store::{
    ClientRegistry, DurableStore, EphemeralStore, ListBackend, ProbePolicy, TranscriptStore,
};
use crate::types::SessionId;

/// Which storage backend a session ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Durable,
    Ephemeral,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Durable => "durable",
            BackendKind::Ephemeral => "ephemeral",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of backend selection.
pub struct StoreSelection {
    pub store: Box<dyn TranscriptStore>,
    pub kind: BackendKind,
    /// Set when a durable backend was configured but could not be used.
    pub warning: Option<String>,
}

impl std::fmt::Debug for StoreSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSelection")
            .field("kind", &self.kind)
            .field("warning", &self.warning)
            .finish_non_exhaustive()
    }
}

/// Inputs that decide where a session's transcript lives.
#[derive(Debug, Clone)]
pub struct SelectorOptions {
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub max_turns: usize,
    pub ttl: std::time::Duration,
    pub probe: ProbePolicy,
}

impl SelectorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            redis_url: config
                .history
                .redis_url
                .clone()
                .filter(|u| !u.trim().is_empty()),
            key_prefix: config.key_prefix(),
            max_turns: config.history.max_turns,
            ttl: config.history.ttl(),
            probe: ProbePolicy::default(),
        }
    }
}

/// Select a store using the shared Redis client registry.
pub fn select_store(
    options: &SelectorOptions,
    session_id: &SessionId,
    registry: &ClientRegistry,
) -> StoreSelection {
    select_with(options, session_id, |url| {
        let backend: Arc<dyn ListBackend> = registry.get(url)?;
        Ok(backend)
    })
}

/// Select a store, obtaining the durable backend through `connect`.
pub fn select_with<F>(options: &SelectorOptions, session_id: &SessionId, connect: F) -> StoreSelection
where
    F: FnOnce(&str) -> Result<Arc<dyn ListBackend>>,
{
    let Some(url) = options.redis_url.as_deref() else {
        tracing::info!("No durable backend configured, using in-memory transcript");
        return ephemeral(options, None);
    };

    let backend = match connect(url) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!(error = %e, "Could not create durable backend client");
            return ephemeral(
                options,
                Some(format!(
                    "Durable history unavailable ({}); this session will not be saved.",
                    e
                )),
            );
        }
    };

    let store = DurableStore::open(
        backend,
        &options.key_prefix,
        session_id,
        options.max_turns,
        options.ttl,
        &options.probe,
    );
    if !store.is_healthy() {
        tracing::warn!(key = %store.key(), "Durable backend failed liveness probe");
        return ephemeral(
            options,
            Some(
                "Durable history unreachable; this session will not be saved.".to_string(),
            ),
        );
    }

    StoreSelection {
        store: Box::new(store),
        kind: BackendKind::Durable,
        warning: None,
    }
}

fn ephemeral(options: &SelectorOptions, warning: Option<String>) -> StoreSelection {
    StoreSelection {
        store: Box::new(EphemeralStore::new(options.max_turns)),
        kind: BackendKind::Ephemeral,
        warning,
    }
}
