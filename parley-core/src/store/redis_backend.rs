//! Redis-backed [`ListBackend`] and the per-process client registry
//!
//! A [`RedisBackend`] is created once per connection URL and shared by every
//! store that talks to that server. [`ClientRegistry`] owns those instances,
//! keeps at most `capacity` of them and evicts the least recently used.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use redis::{Client, Commands, Connection};

use crate::error::{Error, Result};
use crate::store::backend::ListBackend;

/// Default number of distinct servers the registry keeps clients for.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 8;

/// [`ListBackend`] over a single Redis connection.
///
/// The connection is opened lazily with a short timeout and dropped after any
/// failed command, so the next call reconnects instead of reusing a broken
/// socket.
pub struct RedisBackend {
    client: Client,
    url: String,
    timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl RedisBackend {
    /// Create a backend for `url` without connecting.
    ///
    /// Fails only if the URL cannot be parsed.
    pub fn open(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
            conn: Mutex::new(None),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("redis connection lock poisoned".to_string()))
    }

    fn connect(&self) -> Result<Connection> {
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        tracing::debug!(url = %self.url, "Opened redis connection");
        Ok(conn)
    }

    /// Run `op` on the shared connection, reconnecting if needed.
    fn with_conn<T>(&self, op: impl FnOnce(&mut Connection) -> redis::RedisResult<T>) -> Result<T> {
        let mut guard = self.lock()?;
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(Error::Store("redis connection unavailable".to_string()));
        };
        match op(conn) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Redis command failed, dropping connection");
                *guard = None;
                Err(e.into())
            }
        }
    }
}

impl ListBackend for RedisBackend {
    fn ping(&self) -> Result<()> {
        self.with_conn(|conn| redis::cmd("PING").query::<String>(conn))
            .map(|_| ())
    }

    /// RPUSH, LTRIM and EXPIRE in one MULTI/EXEC so a crash can never leave
    /// the list over-length or without a TTL.
    fn append_bounded(
        &self,
        key: &str,
        record: &str,
        max_len: usize,
        ttl: Duration,
    ) -> Result<()> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        // LTRIM key -N -1 keeps the last N; with N = 0 use an empty range.
        let (start, stop) = if max_len == 0 {
            (1, 0)
        } else {
            (-(isize::try_from(max_len).unwrap_or(isize::MAX)), -1)
        };

        self.with_conn(|conn| {
            redis::pipe()
                .atomic()
                .rpush(key, record)
                .ignore()
                .ltrim(key, start, stop)
                .ignore()
                .expire(key, ttl_secs)
                .ignore()
                .query::<()>(conn)
        })
    }

    fn range(&self, key: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| conn.lrange(key, 0, -1))
    }

    fn len(&self, key: &str) -> Result<usize> {
        self.with_conn(|conn| conn.llen(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| conn.del::<_, ()>(key))
    }
}

/// Process-wide cache of [`RedisBackend`]s keyed by URL.
///
/// Repeated lookups for the same URL return the same instance, so stores
/// created for new sessions reuse an existing connection.
pub struct ClientRegistry {
    capacity: usize,
    timeout: Duration,
    /// Most recently used at the back.
    entries: Mutex<VecDeque<(String, Arc<RedisBackend>)>>,
}

impl ClientRegistry {
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            timeout,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Get the cached backend for `url`, creating it on first use.
    pub fn get(&self, url: &str) -> Result<Arc<RedisBackend>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Store("client registry lock poisoned".to_string()))?;

        if let Some(pos) = entries.iter().position(|(u, _)| u == url) {
            if let Some(entry) = entries.remove(pos) {
                let backend = Arc::clone(&entry.1);
                entries.push_back(entry);
                return Ok(backend);
            }
        }

        let backend = Arc::new(RedisBackend::open(url, self.timeout)?);
        entries.push_back((url.to_string(), Arc::clone(&backend)));
        while entries.len() > self.capacity {
            if let Some((evicted, _)) = entries.pop_front() {
                tracing::debug!(url = %evicted, "Evicted redis client from registry");
            }
        }
        Ok(backend)
    }

    /// Number of cached clients.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_CAPACITY, Duration::from_millis(250))
    }
}
