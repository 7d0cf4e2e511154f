//! Result cache with TTL, invalidation and statistics

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::backend::{CacheBackend, CacheEntry};
use super::key::entity_prefix;
use super::memory::InMemoryCacheBackend;
use crate::query::api::ApiFilterResponse;

/// Default time-to-live of a cached response
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Configuration for a [`FilterCache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL used when `set` is called without one
    pub ttl: Duration,
    /// Collapse concurrent misses for one key into a single fetch
    pub collapse_concurrent_misses: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            collapse_concurrent_misses: false,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable miss collapsing.
    pub fn with_miss_collapsing(mut self, enabled: bool) -> Self {
        self.collapse_concurrent_misses = enabled;
        self
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently stored (expired ones included until evicted)
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Invalidation counters: one for the whole cache, one per entity prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation {
    all: u64,
    entity: u64,
}

#[derive(Debug, Default)]
struct Generations {
    all: u64,
    entities: HashMap<String, u64>,
}

/// Cache of filtered listing responses
///
/// Backend failures never reach the caller: a failed read is a miss, a failed
/// write or delete is skipped, and both are logged. Only successful fetches
/// are stored, and a fetch that overlapped an invalidation of its key is
/// returned but not stored.
pub struct FilterCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    generations: Mutex<Generations>,
}

impl std::fmt::Debug for FilterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCache")
            .field("config", &self.config)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish_non_exhaustive()
    }
}

impl FilterCache {
    /// Create an in-memory cache
    pub fn new(config: CacheConfig) -> Self {
        Self::with_backend(Arc::new(InMemoryCacheBackend::new()), config)
    }

    /// Create a cache over any backend
    pub fn with_backend(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            backend,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            in_flight: Mutex::new(HashMap::new()),
            generations: Mutex::new(Generations::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a live entry, counting a hit or a miss
    pub async fn get(&self, key: &str) -> Option<ApiFilterResponse> {
        let found = self.lookup(key).await;
        self.record(key, found.is_some());
        found
    }

    /// Get a live entry without touching the statistics; expired entries are evicted
    async fn lookup(&self, key: &str) -> Option<ApiFilterResponse> {
        match self.backend.get(key).await {
            Ok(Some(entry)) if !entry.is_expired() => Some(entry.data),
            Ok(Some(_)) => {
                tracing::debug!(key = %key, "Evicting expired cache entry");
                if let Err(e) = self.backend.delete(key).await {
                    tracing::warn!(key = %key, error = %e, "Failed to evict expired cache entry");
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    fn record(&self, key: &str, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Cache miss");
        }
    }

    /// Store a response, using the configured TTL when `ttl` is `None`
    pub async fn set(&self, key: &str, data: ApiFilterResponse, ttl: Option<Duration>) {
        let entry = CacheEntry::new(key, data, ttl.unwrap_or(self.config.ttl));
        if let Err(e) = self.backend.set(entry).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed, skipping");
        }
    }

    /// Remove one entry, returning whether it existed
    pub async fn invalidate(&self, key: &str) -> bool {
        self.bump_entity(entity_of(key));
        match self.backend.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Remove every entry whose key starts with `prefix`
    pub async fn invalidate_prefix(&self, prefix: &str) -> u64 {
        match prefix.strip_suffix(':').filter(|entity| !entity.contains(':')) {
            Some(entity) => self.bump_entity(entity),
            None => self.bump_all(),
        }
        match self.backend.delete_prefix(prefix).await {
            Ok(removed) => {
                tracing::info!(prefix = %prefix, removed, "Invalidated cache entries");
                removed
            }
            Err(e) => {
                tracing::warn!(prefix = %prefix, error = %e, "Cache prefix delete failed");
                0
            }
        }
    }

    /// Remove every entry of one entity
    pub async fn invalidate_entity(&self, entity: &str) -> u64 {
        self.invalidate_prefix(&entity_prefix(entity)).await
    }

    /// Remove every entry; statistics are kept
    pub async fn clear(&self) {
        self.bump_all();
        if let Err(e) = self.backend.clear().await {
            tracing::warn!(error = %e, "Cache clear failed");
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let size = self.backend.len().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Cache size unavailable");
            0
        });
        CacheStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Return the cached response for `key`, or run `fetch` and cache its result
    ///
    /// A failed fetch is returned as is and nothing is stored. With miss
    /// collapsing enabled, concurrent callers for the same key wait for the
    /// first fetch and then read its result from the cache.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<ApiFilterResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiFilterResponse, E>>,
    {
        if let Some(hit) = self.lookup(key).await {
            self.record(key, true);
            return Ok(hit);
        }

        if !self.config.collapse_concurrent_misses {
            self.record(key, false);
            return self.fetch_and_store(key, fetch).await;
        }

        let flight = InFlight::join(self, key);
        let _held = flight.lock.lock().await;
        match self.get(key).await {
            Some(hit) => Ok(hit),
            None => self.fetch_and_store(key, fetch).await,
        }
    }

    async fn fetch_and_store<F, Fut, E>(&self, key: &str, fetch: F) -> Result<ApiFilterResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiFilterResponse, E>>,
    {
        let before = self.generation(key);
        let data = fetch().await?;
        if self.generation(key) != before {
            tracing::debug!(key = %key, "Cache invalidated during fetch, not storing");
            return Ok(data);
        }

        self.set(key, data.clone(), None).await;

        // An invalidation may have run while the write was in progress
        if self.generation(key) != before {
            tracing::debug!(key = %key, "Cache invalidated during write, evicting");
            self.invalidate_quietly(key).await;
        }
        Ok(data)
    }

    async fn invalidate_quietly(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Cache delete failed");
        }
    }

    fn generation(&self, key: &str) -> Generation {
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        Generation {
            all: generations.all,
            entity: generations
                .entities
                .get(entity_of(key))
                .copied()
                .unwrap_or_default(),
        }
    }

    fn bump_entity(&self, entity: &str) {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        *generations.entities.entry(entity.to_string()).or_default() += 1;
    }

    fn bump_all(&self) {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        generations.all += 1;
    }
}

/// Entity part of an `"<entity>:<digest>"` key
fn entity_of(key: &str) -> &str {
    key.split_once(':').map_or(key, |(entity, _)| entity)
}

/// Membership of one caller in the miss-collapsing lock of a key
///
/// Dropping it, even when the owning future is cancelled, removes the lock
/// from the map once no other caller holds it.
struct InFlight<'a> {
    cache: &'a FilterCache,
    key: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn join(cache: &'a FilterCache, key: &'a str) -> Self {
        let mut in_flight = cache.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = in_flight.entry(key.to_string()).or_default().clone();
        Self { cache, key, lock }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .cache
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let ours = in_flight
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
        // The map's reference plus ours means nobody else is waiting
        if ours && Arc::strong_count(&self.lock) <= 2 {
            in_flight.remove(self.key);
        }
    }
}

/// Build the cache described by `config`, backed by process memory
pub fn create_filter_cache(config: CacheConfig) -> FilterCache {
    FilterCache::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::FilterState;
    use crate::query::api::PaginationMeta;

    fn response(total: u64) -> ApiFilterResponse {
        ApiFilterResponse {
            data: vec![],
            pagination: PaginationMeta::new(1, 20, total),
            filters: FilterState::new(),
        }
    }

    #[tokio::test]
    async fn test_set_then_get_counts_hits_and_misses() {
        let cache = create_filter_cache(CacheConfig::default());

        assert!(cache.get("tasks:a").await.is_none());
        cache.set("tasks:a", response(3), None).await;
        assert_eq!(cache.get("tasks:a").await, Some(response(3)));

        let stats = cache.stats().await;
        assert_eq!(stats, CacheStats { size: 1, hits: 1, misses: 1 });
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_and_evicted() {
        let cache = create_filter_cache(CacheConfig::default());
        cache.set("tasks:a", response(1), Some(Duration::ZERO)).await;

        assert!(cache.get("tasks:a").await.is_none());
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_default_ttl_comes_from_config() {
        let cache = create_filter_cache(CacheConfig::new().with_ttl(Duration::ZERO));
        cache.set("tasks:a", response(1), None).await;
        assert!(cache.get("tasks:a").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidation() {
        let cache = create_filter_cache(CacheConfig::default());
        cache.set("tasks:a", response(1), None).await;
        cache.set("tasks:b", response(2), None).await;
        cache.set("projects:a", response(3), None).await;

        assert!(cache.invalidate("tasks:a").await);
        assert!(!cache.invalidate("tasks:a").await);
        assert_eq!(cache.invalidate_entity("tasks").await, 1);
        assert_eq!(cache.stats().await.size, 1);

        cache.clear().await;
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_fetch_overlapping_invalidation_is_not_stored() {
        let cache = create_filter_cache(CacheConfig::default());

        let fetched = cache
            .get_or_fetch("tasks:a", || async {
                cache.invalidate_entity("tasks").await;
                Ok::<_, &str>(response(1))
            })
            .await;
        assert_eq!(fetched, Ok(response(1)));
        assert_eq!(cache.stats().await.size, 0);

        cache
            .get_or_fetch("tasks:a", || async {
                cache.invalidate_entity("projects").await;
                Ok::<_, &str>(response(2))
            })
            .await
            .unwrap();
        assert_eq!(cache.get("tasks:a").await, Some(response(2)));

        cache
            .get_or_fetch("tasks:b", || async {
                cache.clear().await;
                Ok::<_, &str>(response(3))
            })
            .await
            .unwrap();
        assert_eq!(cache.get("tasks:b").await, None);
    }

    #[tokio::test]
    async fn test_cancelled_collapsed_fetch_releases_its_lock() {
        let cache = create_filter_cache(CacheConfig::new().with_miss_collapsing(true));

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_fetch("tasks:a", || {
                std::future::pending::<Result<ApiFilterResponse, &str>>()
            }),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(cache.in_flight.lock().unwrap().is_empty());

        let fetched = cache
            .get_or_fetch("tasks:a", || async { Ok::<_, &str>(response(4)) })
            .await;
        assert_eq!(fetched, Ok(response(4)));
        assert!(cache.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success_only() {
        let cache = create_filter_cache(CacheConfig::default());

        let failed = cache
            .get_or_fetch("tasks:a", || async { Err::<ApiFilterResponse, &str>("boom") })
            .await;
        assert_eq!(failed, Err("boom"));
        assert_eq!(cache.stats().await.size, 0);

        let fetched = cache
            .get_or_fetch("tasks:a", || async { Ok::<_, &str>(response(7)) })
            .await;
        assert_eq!(fetched, Ok(response(7)));

        let cached = cache
            .get_or_fetch("tasks:a", || async {
                Err::<ApiFilterResponse, &str>("fetched although cached")
            })
            .await;
        assert_eq!(cached, Ok(response(7)));

        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses), (1, 2));
    }
}
