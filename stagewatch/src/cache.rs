//! Namespaced, TTL-bound, tenant-scoped cache over a pluggable local store.
//!
//! The cache is an optimization, not a source of truth: reads that fail to
//! parse purge the entry and report a miss, and write failures are
//! swallowed. Used for paint-then-refresh: cached data is served
//! immediately while a fresh fetch overwrites it in the background.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::utils::unix_now;

/// Fixed cache key prefixes, one per data class.
pub mod keys {
    use crate::core::EntityId;

    /// The tenant's entity list.
    pub const ENTITY_LIST: &str = "sw:entities";
    /// Terminal-stage result snapshots, keyed per entity.
    pub const REPORT_RESULTS: &str = "sw:report";
    /// Summary text blobs.
    pub const SUMMARY: &str = "sw:summary";
    /// Tenant metadata.
    pub const TENANT_META: &str = "sw:tenant";

    /// Key for one entity's terminal-stage results.
    #[must_use]
    pub fn report_results(entity: EntityId) -> String {
        format!("{REPORT_RESULTS}:{entity}")
    }
}

/// Raw string key/value storage backing the cache.
///
/// Implementations are expected to be durable-ish local stores; the
/// in-memory variant exists for tests and ephemeral sessions.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Reads the raw value for a key.
    async fn read(&self, key: &str) -> Option<String>;

    /// Writes the raw value for a key. Failures (e.g. quota) are reported
    /// but callers treat them as non-fatal.
    async fn write(&self, key: &str, value: String) -> Result<(), anyhow::Error>;

    /// Removes a key.
    async fn remove(&self, key: &str);

    /// Removes all keys.
    async fn clear(&self);
}

/// In-memory cache backend.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: DashMap<String, String>,
}

impl InMemoryCacheBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), anyhow::Error> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn clear(&self) {
        self.entries.clear();
    }
}

/// A stored value with its validity metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
    /// Unix seconds at write time.
    timestamp: f64,
    /// Tenant the entry belongs to.
    tenant_key: String,
}

/// The typed cache layer.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    /// Creates a cache over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Creates a cache over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCacheBackend::new()))
    }

    /// Reads a value, enforcing TTL and tenant scoping.
    ///
    /// Any invalid entry (unparseable, expired, or written under another
    /// tenant) is purged and reported as a miss.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        tenant_key: &str,
        ttl_seconds: f64,
    ) -> Option<T> {
        self.get_at(key, tenant_key, ttl_seconds, unix_now()).await
    }

    /// [`Cache::get`] with an explicit clock, for tests.
    pub async fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        tenant_key: &str,
        ttl_seconds: f64,
        now: f64,
    ) -> Option<T> {
        let raw = self.backend.read(key).await?;

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(key, error = %err, "purging unparseable cache entry");
                self.backend.remove(key).await;
                return None;
            }
        };

        if entry.tenant_key != tenant_key || now - entry.timestamp > ttl_seconds {
            self.backend.remove(key).await;
            return None;
        }

        Some(entry.data)
    }

    /// Writes a value under the given tenant. Best-effort: failures are
    /// logged and swallowed.
    pub async fn set<T: Serialize>(&self, key: &str, data: &T, tenant_key: &str) {
        self.set_at(key, data, tenant_key, unix_now()).await;
    }

    /// [`Cache::set`] with an explicit clock, for tests.
    pub async fn set_at<T: Serialize>(&self, key: &str, data: &T, tenant_key: &str, now: f64) {
        let entry = CacheEntry {
            data,
            timestamp: now,
            tenant_key: tenant_key.to_string(),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(key, error = %err, "cache serialization failed, skipping write");
                return;
            }
        };

        if let Err(err) = self.backend.write(key, raw).await {
            debug!(key, error = %err, "cache write failed, continuing without");
        }
    }

    /// Removes a key.
    pub async fn purge(&self, key: &str) {
        self.backend.remove(key).await;
    }
}
