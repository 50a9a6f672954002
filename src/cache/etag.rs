//! ETag cache for conditional requests.
//!
//! # Responsibilities
//! - Remember the last `ETag` and body seen for each URL
//! - Supply `If-None-Match` values
//! - Rebuild bodies when the server answers `304 Not Modified`
//!
//! # Design Decisions
//! - Keys are the exact request URL, no normalization
//! - Bodies are `Bytes`, shared with the caller rather than copied
//! - Unbounded unless `max_entries` is set, then least recently used is evicted

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::schema::CacheConfig;
use crate::observability::metrics;

/// A cached validator and the body it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub etag: String,
    pub body: Bytes,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    last_used: u64,
}

/// A thread-safe URL → (etag, body) map.
#[derive(Debug, Clone, Default)]
pub struct EtagCache {
    inner: Arc<DashMap<String, Slot>>,
    tick: Arc<AtomicU64>,
    max_entries: Option<usize>,
}

impl EtagCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `max_entries` URLs.
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::default()
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        match config.max_entries {
            Some(limit) => Self::with_capacity_limit(limit),
            None => Self::new(),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    /// Last entry stored for `url`.
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        let tick = self.next_tick();
        self.inner.get_mut(url).map(|mut slot| {
            slot.last_used = tick;
            slot.entry.clone()
        })
    }

    /// Store `etag` and `body` for `url`, replacing any previous entry.
    ///
    /// Empty ETags are ignored.
    pub fn put(&self, url: &str, etag: &str, body: Bytes) {
        if etag.is_empty() {
            return;
        }

        let tick = self.next_tick();
        let entry = CacheEntry {
            etag: etag.to_string(),
            body,
        };

        if let Some(mut slot) = self.inner.get_mut(url) {
            slot.entry = entry;
            slot.last_used = tick;
            return;
        }

        if let Some(limit) = self.max_entries {
            while self.inner.len() >= limit && self.evict_oldest() {}
        }

        self.inner.insert(
            url.to_string(),
            Slot {
                entry,
                last_used: tick,
            },
        );
        metrics::record_cache_size(self.inner.len());
    }

    /// Cached body for `url`, used to answer a `304`.
    pub fn reconstruct(&self, url: &str) -> Option<Bytes> {
        self.get(url).map(|entry| entry.body)
    }

    pub fn remove(&self, url: &str) -> Option<CacheEntry> {
        self.inner.remove(url).map(|(_, slot)| slot.entry)
    }

    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_cache_size(0);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .inner
            .iter()
            .min_by_key(|r| r.value().last_used)
            .map(|r| r.key().clone());

        match oldest {
            Some(url) => {
                tracing::debug!(url = %url, "Evicting least recently used cache entry");
                self.inner.remove(&url);
                true
            }
            None => false,
        }
    }
}
