//! Response cache for filtered listings
//!
//! Keys are derived from the entity name and the sanitized filter state
//! ([`cache_key`]), so equal views share one entry and a write to an entity
//! can drop all of that entity's entries with [`FilterCache::invalidate_entity`].

pub mod backend;
pub mod filter_cache;
pub mod key;
pub mod memory;

pub use backend::{CacheBackend, CacheEntry};
pub use filter_cache::{CacheConfig, CacheStats, DEFAULT_TTL, FilterCache, create_filter_cache};
pub use key::{cache_key, entity_prefix};
pub use memory::InMemoryCacheBackend;
