//! # This-RS Filters
//!
//! A server-side filter pipeline for dashboards backed by a record store.
//!
//! ## Features
//!
//! - **One Filter State**: search, multi-select, date/numeric ranges, users, sorting and pagination
//! - **Entity-Specific Fields**: declared per entity in YAML, decoded through a field registry
//! - **Shareable URLs**: a stable query-string codec (`?status=active%2Cpending&page=2`)
//! - **Validation & Sanitization**: declarative rules with field-level messages
//! - **Multiple Dialects**: Airtable formulas, structured database queries and flat API params
//! - **State Management**: merge, diff, undo/redo history and saved presets
//! - **Result Cache**: TTL, per-entity invalidation, statistics and miss collapsing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filters::prelude::*;
//!
//! let config = FiltersConfig::from_yaml_file("config/filters.yaml")?;
//! let store = Arc::new(InMemoryRecordStore::new());
//! let service = FilterService::new(store, &config)?;
//!
//! let page = service
//!     .list_from_query("keywords", "search=shoes&volumeMin=100&page=1")
//!     .await?;
//!
//! let app: Router = build_filter_routes(AppState::new(service));
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod manager;
pub mod query;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Filter State ===
    pub use crate::core::{
        DateRange, FieldKind, FieldRegistry, FilterState, FilterValue, NumericRange, Pagination,
        SortDirection, Sorting, UserFilter,
    };

    // === Codec & Validation ===
    pub use crate::core::{
        FieldRule, FilterCodec, FilterValidation, UrlParams, decode_filters_from_url,
        encode_filters_to_url, sanitize_filter_state, validate_filter_state,
    };

    // === Errors ===
    pub use crate::core::{CacheError, ConfigError, FilterError, StoreError, ValidationError};

    // === Pipeline ===
    pub use crate::core::{FilterQuery, FilterService, Record, RecordPage, RecordStore, SelectQuery};

    // === Query Builders ===
    pub use crate::query::{
        AirtableFormulaBuilder, ApiFilterResponse, ColumnMapping, DatabaseQuery,
        DatabaseQueryBuilder, MatchMode, PaginationMeta, build_airtable_filter, build_api_params,
        build_database_query, build_url_with_filters,
    };

    // === State Management ===
    pub use crate::manager::{
        FilterStateManager, clear_all_filters, count_active_filters, has_active_filters,
        merge_filter_states,
    };

    // === Cache ===
    pub use crate::cache::{CacheBackend, CacheConfig, CacheStats, FilterCache, create_filter_cache};

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryRecordStore;

    // === Config ===
    pub use crate::config::{EntityFilterConfig, FiltersConfig};

    // === Server ===
    pub use crate::server::{AppState, build_filter_routes};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use axum::Router;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
