//! Query builders: one filter state, several backend dialects

pub mod airtable;
pub mod api;
pub mod database;
pub mod mapping;

pub use airtable::{AirtableFormulaBuilder, build_airtable_filter, escape_formula_string};
pub use api::{ApiFilterParams, ApiFilterResponse, PaginationMeta, build_api_params};
pub use database::{
    Condition, DatabaseQuery, DatabaseQueryBuilder, Operator, SearchClause, build_database_query,
};
pub use mapping::{Column, ColumnMapping, MatchMode};

use crate::core::codec::encode_filters_to_url;
use crate::core::state::FilterState;

/// Append the encoded filters to `base_url`
///
/// Uses `&` when `base_url` already carries a query string, `?` otherwise,
/// and returns `base_url` unchanged when there is nothing to append.
pub fn build_url_with_filters(base_url: &str, filters: &FilterState) -> String {
    let query = encode_filters_to_url(filters).to_query_string();
    if query.is_empty() {
        return base_url.to_string();
    }

    let separator = if !base_url.contains('?') {
        "?"
    } else if base_url.ends_with('?') || base_url.ends_with('&') {
        ""
    } else {
        "&"
    };
    format!("{}{}{}", base_url, separator, query)
}
