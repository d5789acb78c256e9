//! In-memory TTL cache of upstream GET responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode};
use tokio::time::Instant;

/// An upstream response, as stored and replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// Upstream status
    pub status: StatusCode,
    /// Upstream `Content-Type`
    pub content_type: Option<HeaderValue>,
    /// Upstream body
    pub body: Bytes,
}

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    response: CachedResponse,
}

/// Responses keyed by path and query string, fresh for `ttl`.
///
/// Every [`clear`](Self::clear) starts a new generation. A response fetched
/// during an older generation is never stored.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    capacity: usize,
    generation: AtomicU64,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ResponseCache {
    /// Creates an empty cache. A zero `ttl` or `capacity` disables caching.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            generation: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached response for `key` if it is still fresh.
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        (entry.stored_at.elapsed() < self.ttl).then(|| entry.response.clone())
    }

    /// Current generation, to be passed to [`insert_since`](Self::insert_since)
    /// once the response is fetched.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Stores a response, evicting expired entries first and the oldest
    /// entry when the cache is full.
    pub fn insert(&self, key: String, response: CachedResponse) {
        self.insert_since(self.generation(), key, response);
    }

    /// Stores a response fetched during `generation`, unless the cache was
    /// cleared since. Returns whether it was stored.
    pub fn insert_since(&self, generation: u64, key: String, response: CachedResponse) -> bool {
        if self.ttl.is_zero() || self.capacity == 0 {
            return false;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation() != generation {
            return false;
        }
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                response,
            },
        );
        true
    }

    /// Drops every entry, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
