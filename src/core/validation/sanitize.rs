//! Removal of empty filter values
//!
//! These transforms run before validation, encoding and cache-key derivation
//! so that logically equal states look identical.

use std::collections::BTreeMap;

use crate::core::field::FilterValue;
use crate::core::state::{DateRange, FilterState, NumericRange, Pagination, Sorting, UserFilter};

/// Drop every empty value from `filters`
///
/// - empty strings and empty lists are dropped;
/// - empty-string list elements are removed, and the list is dropped if
///   nothing remains;
/// - range objects keep only their non-empty bounds and are dropped when no
///   bound survives;
/// - `pagination` keeps its positive parts and is dropped when none remain
///   (page and limit start at 1, so a zero has no URL form).
///
/// The result is a fixpoint: sanitizing it again changes nothing.
pub fn sanitize_filter_state(filters: &FilterState) -> FilterState {
    FilterState {
        search: sanitize_text(filters.search.as_deref()),
        status: filters.status.as_deref().and_then(sanitize_list),
        priority: filters.priority.as_deref().and_then(sanitize_list),
        date_range: filters.date_range.as_ref().and_then(sanitize_date_range),
        user_filter: filters.user_filter.as_ref().and_then(sanitize_users),
        sorting: filters.sorting.as_ref().and_then(sanitize_sorting),
        pagination: filters.pagination.as_ref().and_then(sanitize_pagination),
        fields: sanitize_fields(&filters.fields),
    }
}

/// Keep a string only if it is non-empty
pub fn sanitize_text(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

/// Remove empty elements, dropping the list if none remain
pub fn sanitize_list(values: &[String]) -> Option<Vec<String>> {
    let kept: Vec<String> = values.iter().filter(|v| !v.is_empty()).cloned().collect();
    (!kept.is_empty()).then_some(kept)
}

pub fn sanitize_date_range(range: &DateRange) -> Option<DateRange> {
    let cleaned = DateRange {
        start: sanitize_text(range.start.as_deref()),
        end: sanitize_text(range.end.as_deref()),
    };
    (cleaned.start.is_some() || cleaned.end.is_some()).then_some(cleaned)
}

/// Keep finite bounds only
pub fn sanitize_numeric_range(range: &NumericRange) -> Option<NumericRange> {
    let cleaned = NumericRange {
        min: range.min.filter(|v| v.is_finite()),
        max: range.max.filter(|v| v.is_finite()),
    };
    (cleaned.min.is_some() || cleaned.max.is_some()).then_some(cleaned)
}

pub fn sanitize_users(users: &UserFilter) -> Option<UserFilter> {
    sanitize_list(&users.user_ids).map(|user_ids| UserFilter { user_ids })
}

pub fn sanitize_pagination(pagination: &Pagination) -> Option<Pagination> {
    let cleaned = Pagination {
        page: pagination.page.filter(|&p| p >= 1),
        limit: pagination.limit.filter(|&l| l >= 1),
    };
    (cleaned.page.is_some() || cleaned.limit.is_some()).then_some(cleaned)
}

fn sanitize_sorting(sorting: &Sorting) -> Option<Sorting> {
    (!sorting.field.is_empty()).then(|| sorting.clone())
}

/// Sanitize one entity-specific value, `None` when nothing survives
pub fn sanitize_value(value: &FilterValue) -> Option<FilterValue> {
    match value {
        FilterValue::Text(s) => sanitize_text(Some(s.as_str())).map(FilterValue::Text),
        FilterValue::MultiSelect(values) => sanitize_list(values).map(FilterValue::MultiSelect),
        FilterValue::DateRange(range) => sanitize_date_range(range).map(FilterValue::DateRange),
        FilterValue::NumericRange(range) => {
            sanitize_numeric_range(range).map(FilterValue::NumericRange)
        }
        FilterValue::Users(users) => sanitize_users(users).map(FilterValue::Users),
    }
}

fn sanitize_fields(fields: &BTreeMap<String, FilterValue>) -> BTreeMap<String, FilterValue> {
    fields
        .iter()
        .filter_map(|(name, value)| sanitize_value(value).map(|v| (name.clone(), v)))
        .collect()
}
