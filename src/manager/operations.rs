//! Pure operations over filter states

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::field::FilterValue;
use crate::core::state::{
    DEFAULT_LIMIT, DEFAULT_PAGE, DateRange, FilterState, NumericRange, Pagination,
};
use crate::core::validation::sanitize::sanitize_filter_state;

/// Built-in keys in display order
const BUILTIN_KEYS: &[&str] = &[
    "search",
    "status",
    "priority",
    "dateRange",
    "userFilter",
    "sorting",
    "pagination",
];

/// Merge `overrides` onto `base`
///
/// A field set in `overrides` wins. `dateRange`, `pagination` and range-valued
/// extra fields merge bound by bound, so `{ pagination: { page: 2 } }` keeps
/// the base page size. Extra fields merge key by key.
///
/// `merge_filter_states(s, &FilterState::default()) == s` for every `s`.
pub fn merge_filter_states(base: &FilterState, overrides: &FilterState) -> FilterState {
    let mut fields = base.fields.clone();
    for (name, value) in &overrides.fields {
        let merged = match (fields.get(name), value) {
            (Some(FilterValue::DateRange(a)), FilterValue::DateRange(b)) => {
                FilterValue::DateRange(merge_date_range(a, b))
            }
            (Some(FilterValue::NumericRange(a)), FilterValue::NumericRange(b)) => {
                FilterValue::NumericRange(merge_numeric_range(a, b))
            }
            _ => value.clone(),
        };
        fields.insert(name.clone(), merged);
    }

    FilterState {
        search: overrides.search.clone().or_else(|| base.search.clone()),
        status: overrides.status.clone().or_else(|| base.status.clone()),
        priority: overrides.priority.clone().or_else(|| base.priority.clone()),
        date_range: merge_option(&base.date_range, &overrides.date_range, merge_date_range),
        user_filter: overrides
            .user_filter
            .clone()
            .or_else(|| base.user_filter.clone()),
        sorting: overrides.sorting.clone().or_else(|| base.sorting.clone()),
        pagination: merge_option(&base.pagination, &overrides.pagination, |a, b| Pagination {
            page: b.page.or(a.page),
            limit: b.limit.or(a.limit),
        }),
        fields,
    }
}

fn merge_option<T: Clone>(
    base: &Option<T>,
    overrides: &Option<T>,
    merge: impl Fn(&T, &T) -> T,
) -> Option<T> {
    match (base, overrides) {
        (Some(a), Some(b)) => Some(merge(a, b)),
        (None, Some(b)) => Some(b.clone()),
        (a, None) => a.clone(),
    }
}

fn merge_date_range(base: &DateRange, overrides: &DateRange) -> DateRange {
    DateRange {
        start: overrides.start.clone().or_else(|| base.start.clone()),
        end: overrides.end.clone().or_else(|| base.end.clone()),
    }
}

fn merge_numeric_range(base: &NumericRange, overrides: &NumericRange) -> NumericRange {
    NumericRange {
        min: overrides.min.or(base.min),
        max: overrides.max.or(base.max),
    }
}

/// A state with no filters and pagination reset to the first page
pub fn clear_all_filters() -> FilterState {
    FilterState {
        pagination: Some(Pagination::new(DEFAULT_PAGE, DEFAULT_LIMIT)),
        ..Default::default()
    }
}

/// Number of filters that would narrow the listing
///
/// A range counts once however many bounds are set. `pagination` and
/// `sorting` never count.
pub fn count_active_filters(filters: &FilterState) -> usize {
    let builtin = [
        filters.search.as_deref().is_some_and(|s| !s.is_empty()),
        filters.status.as_deref().is_some_and(has_values),
        filters.priority.as_deref().is_some_and(has_values),
        filters.date_range.as_ref().is_some_and(DateRange::is_active),
        filters
            .user_filter
            .as_ref()
            .is_some_and(|u| has_values(&u.user_ids)),
    ];

    builtin.iter().filter(|active| **active).count()
        + filters.fields.values().filter(|v| v.is_active()).count()
}

/// Whether any filter is active
pub fn has_active_filters(filters: &FilterState) -> bool {
    count_active_filters(filters) > 0
}

fn has_values(values: &[String]) -> bool {
    values.iter().any(|v| !v.is_empty())
}

/// How one key differs between two states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// One changed key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChange {
    pub key: String,
    pub kind: ChangeKind,
}

/// Keys whose values differ between `before` and `after`
///
/// Both states are sanitized first, so `status: []` and an absent status are
/// the same. Built-in keys come first, then extra fields by name.
pub fn diff_filter_states(before: &FilterState, after: &FilterState) -> Vec<FilterChange> {
    let before = sanitize_filter_state(before);
    let after = sanitize_filter_state(after);

    let extra: BTreeSet<&String> = before.fields.keys().chain(after.fields.keys()).collect();
    let mut keys: Vec<&str> = BUILTIN_KEYS.to_vec();
    keys.extend(extra.into_iter().map(String::as_str));

    keys.into_iter()
        .filter_map(|key| {
            let kind = match (before.field(key), after.field(key)) {
                (None, Some(_)) => ChangeKind::Added,
                (Some(_), None) => ChangeKind::Removed,
                (Some(a), Some(b)) if a != b => ChangeKind::Changed,
                _ => return None,
            };
            Some(FilterChange {
                key: key.to_string(),
                kind,
            })
        })
        .collect()
}

/// A removable "active filter" chip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChip {
    pub key: String,
    pub label: String,
}

/// One chip per active filter, in display order
pub fn summarize_filters(filters: &FilterState) -> Vec<FilterChip> {
    let filters = sanitize_filter_state(filters);
    let mut chips = Vec::new();
    let mut push = |key: &str, label: String| {
        chips.push(FilterChip {
            key: key.to_string(),
            label,
        })
    };

    if let Some(search) = &filters.search {
        push("search", format!("\"{}\"", search));
    }
    if let Some(status) = &filters.status {
        push("status", status.join(", "));
    }
    if let Some(priority) = &filters.priority {
        push("priority", priority.join(", "));
    }
    if let Some(range) = &filters.date_range {
        push("dateRange", bounds_label(range.start.as_deref(), range.end.as_deref()));
    }
    if let Some(users) = &filters.user_filter {
        push("userFilter", users.user_ids.join(", "));
    }
    for (name, value) in &filters.fields {
        let label = match value {
            FilterValue::Text(text) => text.clone(),
            FilterValue::MultiSelect(values) => values.join(", "),
            FilterValue::Users(users) => users.user_ids.join(", "),
            FilterValue::DateRange(range) => {
                bounds_label(range.start.as_deref(), range.end.as_deref())
            }
            FilterValue::NumericRange(range) => bounds_label(
                range.min.map(|v| v.to_string()).as_deref(),
                range.max.map(|v| v.to_string()).as_deref(),
            ),
        };
        push(name.as_str(), label);
    }

    chips
}

fn bounds_label(low: Option<&str>, high: Option<&str>) -> String {
    match (low, high) {
        (Some(low), Some(high)) => format!("{} to {}", low, high),
        (Some(low), None) => format!("from {}", low),
        (None, Some(high)) => format!("up to {}", high),
        (None, None) => String::new(),
    }
}
