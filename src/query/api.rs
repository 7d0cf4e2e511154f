//! Flat REST parameters and paginated responses

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::codec::flatten_filters;
use crate::core::state::FilterState;
use crate::core::store::Record;

/// Flat key/value request parameters for a generic REST backend
///
/// Keys and values mirror the URL codec exactly (`search`, `status` as a
/// comma-joined string, `dateStart`, `dateEnd`, `page`, `limit`, `sortBy`,
/// `sortOrder`, ...). An empty state produces no keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiFilterParams(IndexMap<String, String>);

impl ApiFilterParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Build flat API parameters from a filter state
pub fn build_api_params(filters: &FilterState) -> ApiFilterParams {
    ApiFilterParams(flatten_filters(filters).collect())
}

/// A page of filtered records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFilterResponse {
    /// The records on this page
    pub data: Vec<Record>,

    /// Pagination metadata
    pub pagination: PaginationMeta,

    /// The sanitized filters that produced this page
    pub filters: FilterState,
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: u32,

    /// Number of items per page
    pub limit: u32,

    /// Total number of items (after filters)
    pub total: u64,

    /// Total number of pages
    pub total_pages: u64,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        // Ensure limit and page are at least 1 to avoid division by zero
        let page = page.max(1);
        let limit = limit.max(1);
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        let start = u64::from(page - 1) * u64::from(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start + u64::from(limit) < total,
            has_prev: page > 1,
        }
    }
}
