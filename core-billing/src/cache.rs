//! Session-scoped cache of GET responses.
//!
//! Entries are keyed by path and query, expire after a fixed TTL and are
//! evicted least-recently-used once the capacity is reached. Mutations
//! invalidate by path prefix; sign-out and forced logout clear everything
//! through [`SessionScopedCache`].

use async_trait::async_trait;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_auth::SessionScopedCache;
use core_runtime::config::CacheSettings;
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct CachedResponse {
    value: Value,
    stored_at: DateTime<Utc>,
}

pub struct QueryCache {
    /// `None` when caching is disabled
    entries: Option<Mutex<LruCache<String, CachedResponse>>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    /// Bumped by every `clear`, under the entries lock
    generation: AtomicU64,
}

impl QueryCache {
    pub fn new(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        let entries = NonZeroUsize::new(settings.capacity)
            .filter(|_| settings.enabled)
            .map(|capacity| Mutex::new(LruCache::new(capacity)));
        let ttl = chrono::Duration::from_std(settings.ttl).unwrap_or(chrono::Duration::MAX);

        Self {
            entries,
            ttl,
            clock,
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Cache key for a request, e.g. `/organizations?page=1&limit=10`.
    pub fn key(path: &str, query: &[(String, String)]) -> String {
        if query.is_empty() {
            return path.to_string();
        }
        let query = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", path, query)
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.as_ref()?.lock().await;
        let now = self.clock.now();

        let fresh = match entries.get(key) {
            Some(entry) => now - entry.stored_at < self.ttl,
            None => return None,
        };
        if !fresh {
            entries.pop(key);
            debug!(key, "Cached response expired");
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub async fn put(&self, key: impl Into<String>, value: Value) {
        if let Some(entries) = &self.entries {
            let stored_at = self.clock.now();
            entries
                .lock()
                .await
                .put(key.into(), CachedResponse { value, stored_at });
        }
    }

    /// Current clear generation. Read it before fetching and hand it to
    /// [`QueryCache::put_if_current`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Stores `value` only if no `clear` ran since `generation` was read.
    ///
    /// A response fetched for a session that has since ended is dropped.
    pub async fn put_if_current(&self, generation: u64, key: impl Into<String>, value: Value) -> bool {
        let Some(entries) = &self.entries else {
            return false;
        };
        let mut entries = entries.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping response fetched before the cache was cleared");
            return false;
        }
        let stored_at = self.clock.now();
        entries.put(key.into(), CachedResponse { value, stored_at });
        true
    }

    /// Drops every entry for `prefix` and the paths below it.
    ///
    /// `/payments` matches `/payments?page=2` and `/payments/subscription/s-1`
    /// but not `/paymentsx`.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let Some(entries) = &self.entries else {
            return 0;
        };
        let mut entries = entries.lock().await;

        let stale: Vec<String> = entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| matches_prefix(key, prefix))
            .cloned()
            .collect();
        for key in &stale {
            entries.pop(key);
        }

        debug!(prefix, removed = stale.len(), "Cache invalidated");
        stale.len()
    }

    pub async fn clear(&self) {
        match &self.entries {
            Some(entries) => {
                let mut entries = entries.lock().await;
                self.generation.fetch_add(1, Ordering::SeqCst);
                entries.clear();
            }
            None => {
                self.generation.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub async fn len(&self) -> usize {
        match &self.entries {
            Some(entries) => entries.lock().await.len(),
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn matches_prefix(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('?') || rest.starts_with('/'),
        None => false,
    }
}

#[async_trait]
impl SessionScopedCache for QueryCache {
    async fn clear_session_data(&self) {
        self.clear().await;
    }

    fn name(&self) -> &str {
        "billing-query-cache"
    }
}
