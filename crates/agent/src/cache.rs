//! Process-wide answer cache keyed by query fingerprint.

use std::time::{Duration, Instant};

use moka::future::Cache;
use tracing::debug;

use campusdesk_core::config::CacheConfig;
use campusdesk_core::domain::query::{Fingerprint, Query};

#[derive(Clone, Debug)]
struct CacheEntry {
    created_at: Instant,
    value: String,
}

/// Bounded TTL cache of composed answers.
///
/// Expired entries are reclaimed by moka; when capacity is reached its
/// TinyLFU policy evicts the entries least likely to be asked again.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<Fingerprint, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder().max_capacity(max_entries).time_to_live(ttl).build();
        Self { entries, ttl }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn lookup(&self, query: &Query) -> Option<String> {
        let fingerprint = query.fingerprint();
        let entry = self.entries.get(&fingerprint).await?;

        // moka expiry is lazy; never serve an answer at or past its TTL.
        if entry.created_at.elapsed() >= self.ttl {
            self.entries.invalidate(&fingerprint).await;
            debug!(event_name = "cache.expired", fingerprint = fingerprint.short(), "entry expired");
            return None;
        }

        Some(entry.value)
    }

    pub async fn store(&self, query: &Query, value: impl Into<String>) {
        let entry = CacheEntry { created_at: Instant::now(), value: value.into() };
        self.entries.insert(query.fingerprint(), entry).await;
    }

    pub async fn invalidate_all(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}
