//! Shared test harness for cache backend testing
//!
//! Provides response fixtures and the `cache_backend_tests!` macro, which
//! generates a conformance suite for any `CacheBackend` implementation.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod cache_harness;
//! use cache_harness::*;
//!
//! cache_backend_tests!(InMemoryCacheBackend::new());
//! ```

#![allow(dead_code)]

use filters::cache::CacheEntry;
use filters::core::{FilterState, Record};
use filters::query::{ApiFilterResponse, PaginationMeta};
use serde_json::json;
use std::time::Duration;

/// A one-record response whose total identifies it in assertions
pub fn response(total: u64) -> ApiFilterResponse {
    ApiFilterResponse {
        data: vec![Record::new(
            format!("rec{}", total),
            json!({ "Name": format!("Record {}", total) }),
        )],
        pagination: PaginationMeta::new(1, 20, total),
        filters: FilterState::new().with_pagination(1, 20),
    }
}

/// An entry that stays live for the duration of a test
pub fn live_entry(key: &str, total: u64) -> CacheEntry {
    CacheEntry::new(key, response(total), Duration::from_secs(300))
}

/// Generate a full `CacheBackend` conformance test suite.
///
/// `$factory` must evaluate to a fresh backend implementing `CacheBackend`
/// and `Clone + 'static` (clones share state). It is re-evaluated for each
/// test to ensure isolation.
#[macro_export]
macro_rules! cache_backend_tests {
    ($factory:expr) => {
        mod cache_backend_contract_tests {
            use super::*;
            use filters::cache::{CacheBackend, CacheEntry};

            #[tokio::test]
            async fn test_get_missing_is_none() {
                let backend = $factory;
                assert!(backend.get("tasks:missing").await.unwrap().is_none());
                assert_eq!(backend.len().await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_set_then_get() {
                let backend = $factory;
                backend.set(live_entry("tasks:a", 3)).await.unwrap();

                let entry = backend.get("tasks:a").await.unwrap().unwrap();
                assert_eq!(entry.key, "tasks:a");
                assert_eq!(entry.data, response(3));
                assert_eq!(backend.len().await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_set_replaces_existing() {
                let backend = $factory;
                backend.set(live_entry("tasks:a", 1)).await.unwrap();
                backend.set(live_entry("tasks:a", 2)).await.unwrap();

                let entry = backend.get("tasks:a").await.unwrap().unwrap();
                assert_eq!(entry.data.pagination.total, 2);
                assert_eq!(backend.len().await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_expired_entries_are_still_returned() {
                let backend = $factory;
                backend
                    .set(CacheEntry::new("tasks:a", response(1), std::time::Duration::ZERO))
                    .await
                    .unwrap();

                let entry = backend.get("tasks:a").await.unwrap().unwrap();
                assert!(entry.is_expired());
            }

            #[tokio::test]
            async fn test_delete() {
                let backend = $factory;
                backend.set(live_entry("tasks:a", 1)).await.unwrap();

                assert!(backend.delete("tasks:a").await.unwrap());
                assert!(!backend.delete("tasks:a").await.unwrap());
                assert!(backend.get("tasks:a").await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_delete_prefix_only_touches_matching_keys() {
                let backend = $factory;
                backend.set(live_entry("tasks:a", 1)).await.unwrap();
                backend.set(live_entry("tasks:b", 2)).await.unwrap();
                backend.set(live_entry("taskset:a", 3)).await.unwrap();
                backend.set(live_entry("keywords:a", 4)).await.unwrap();

                assert_eq!(backend.delete_prefix("tasks:").await.unwrap(), 2);
                assert_eq!(backend.len().await.unwrap(), 2);
                assert!(backend.get("taskset:a").await.unwrap().is_some());
                assert_eq!(backend.delete_prefix("projects:").await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_clear() {
                let backend = $factory;
                backend.set(live_entry("tasks:a", 1)).await.unwrap();
                backend.set(live_entry("keywords:a", 2)).await.unwrap();

                backend.clear().await.unwrap();
                assert_eq!(backend.len().await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_concurrent_access() {
                let backend = $factory;
                let mut handles = Vec::new();

                for i in 0..10u64 {
                    let backend = backend.clone();
                    handles.push(tokio::spawn(async move {
                        backend
                            .set(live_entry(&format!("tasks:{}", i), i))
                            .await
                            .unwrap();
                    }));
                }
                for handle in handles {
                    handle.await.unwrap();
                }

                assert_eq!(backend.len().await.unwrap(), 10);
            }
        }
    };
}
