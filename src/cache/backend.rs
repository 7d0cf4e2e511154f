//! Cache backend trait and stored entry

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::error::CacheError;
use crate::query::api::ApiFilterResponse;

/// One cached response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub data: ApiFilterResponse,
    pub stored_at: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, data: ApiFilterResponse, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            data,
            stored_at: Utc::now(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the entry's time-to-live has elapsed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let age_ms = (now - self.stored_at).num_milliseconds();
        age_ms < 0 || age_ms as u64 >= self.ttl_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Key/value store behind a [`FilterCache`](super::FilterCache)
///
/// Backends only store and return entries; expiry, statistics and failure
/// handling live in `FilterCache`. Implementations must be safe to share
/// across tasks.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get the entry stored under `key`, expired or not
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry under its key, replacing any previous one
    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Remove one entry, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every entry whose key starts with `prefix`, returning how many
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Remove every entry
    async fn clear(&self) -> Result<(), CacheError>;

    /// Number of stored entries
    async fn len(&self) -> Result<usize, CacheError>;
}
