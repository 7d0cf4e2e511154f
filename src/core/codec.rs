//! URL query-string codec for filter state
//!
//! Maps a `FilterState` to ordered query parameters and back:
//!
//! ```text
//! search=test+query&status=active%2Cpending&dateStart=2024-01-01&dateEnd=2024-12-31&page=2&limit=50
//! ```
//!
//! - lists are comma-joined under their own key; a literal `,` or `%` inside
//!   a list value is escaped as `%2C` / `%25` before joining
//! - `dateRange` maps to `dateStart` / `dateEnd`, `sorting` to `sortBy` /
//!   `sortOrder`, `pagination` to `page` / `limit`
//! - entity-specific ranges use `<name>Start` / `<name>End` and
//!   `<name>Min` / `<name>Max`
//!
//! Decoding is best effort: a malformed value is dropped and reported as a
//! [`DecodeError`], so an old or corrupted bookmark falls back to defaults.

use std::collections::BTreeMap;
use std::fmt;
use url::form_urlencoded;

use crate::core::error::DecodeError;
use crate::core::field::{FieldKind, FieldRegistry, FilterValue};
use crate::core::state::{
    DateRange, FilterState, NumericRange, Pagination, SortDirection, Sorting, UserFilter,
};

/// Ordered query parameters, the equivalent of a browser `URLSearchParams`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    pairs: Vec<(String, String)>,
}

impl UrlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query (a leading `?` is ignored)
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialize as `application/x-www-form-urlencoded`
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}

impl fmt::Display for UrlParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl FromIterator<(String, String)> for UrlParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Encode `filters` as URL parameters
///
/// Absent fields produce no parameter. Encoding does not need a registry:
/// every entity-specific value carries its own kind.
pub fn encode_filters_to_url(filters: &FilterState) -> UrlParams {
    flatten_filters(filters).collect()
}

/// Decode the built-in fields from URL parameters
///
/// Entity-specific parameters need a registry; see [`FilterCodec`].
pub fn decode_filters_from_url(params: &UrlParams) -> FilterState {
    FilterCodec::default().decode(params)
}

/// Flatten a state into `(param, value)` pairs in canonical order
///
/// Shared by the URL encoder and the flat API parameter builder.
pub(crate) fn flatten_filters(filters: &FilterState) -> impl Iterator<Item = (String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    if let Some(search) = &filters.search {
        push_pair(&mut pairs, "search", search.clone());
    }
    if let Some(status) = &filters.status {
        push_pair(&mut pairs, "status", join_list(status));
    }
    if let Some(priority) = &filters.priority {
        push_pair(&mut pairs, "priority", join_list(priority));
    }
    if let Some(range) = &filters.date_range {
        push_date_range(&mut pairs, "date", range);
    }
    if let Some(users) = &filters.user_filter {
        push_pair(&mut pairs, "userIds", join_list(&users.user_ids));
    }
    for (name, value) in &filters.fields {
        match value {
            FilterValue::Text(s) => push_pair(&mut pairs, name, s.clone()),
            FilterValue::MultiSelect(values) => push_pair(&mut pairs, name, join_list(values)),
            FilterValue::Users(users) => push_pair(&mut pairs, name, join_list(&users.user_ids)),
            FilterValue::DateRange(range) => push_date_range(&mut pairs, name, range),
            FilterValue::NumericRange(range) => {
                if let Some(min) = range.min {
                    push_pair(&mut pairs, format!("{}Min", name), min.to_string());
                }
                if let Some(max) = range.max {
                    push_pair(&mut pairs, format!("{}Max", name), max.to_string());
                }
            }
        }
    }
    if let Some(pagination) = &filters.pagination {
        if let Some(page) = pagination.page {
            push_pair(&mut pairs, "page", page.to_string());
        }
        if let Some(limit) = pagination.limit {
            push_pair(&mut pairs, "limit", limit.to_string());
        }
    }
    if let Some(sorting) = &filters.sorting {
        push_pair(&mut pairs, "sortBy", sorting.field.clone());
        push_pair(&mut pairs, "sortOrder", sorting.direction.to_string());
    }

    pairs.into_iter()
}

fn push_pair(pairs: &mut Vec<(String, String)>, key: impl Into<String>, value: String) {
    pairs.push((key.into(), value));
}

fn push_date_range(pairs: &mut Vec<(String, String)>, prefix: &str, range: &DateRange) {
    if let Some(start) = &range.start {
        push_pair(pairs, format!("{}Start", prefix), start.clone());
    }
    if let Some(end) = &range.end {
        push_pair(pairs, format!("{}End", prefix), end.clone());
    }
}

/// Decoder aware of one entity's field registry
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCodec<'a> {
    registry: Option<&'a FieldRegistry>,
}

impl<'a> FilterCodec<'a> {
    pub fn new(registry: &'a FieldRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn encode(&self, filters: &FilterState) -> UrlParams {
        encode_filters_to_url(filters)
    }

    /// Decode, silently dropping malformed values
    pub fn decode(&self, params: &UrlParams) -> FilterState {
        let (filters, issues) = self.decode_with_issues(params);
        for issue in &issues {
            tracing::debug!(
                param = %issue.param,
                value = %issue.value,
                reason = %issue.reason,
                "Ignoring malformed filter parameter"
            );
        }
        filters
    }

    /// Decode, returning the parameters that were dropped
    pub fn decode_with_issues(&self, params: &UrlParams) -> (FilterState, Vec<DecodeError>) {
        let mut issues = Vec::new();
        let mut filters = FilterState {
            search: params.get("search").map(str::to_string),
            status: params.get("status").map(split_list),
            priority: params.get("priority").map(split_list),
            date_range: decode_date_range(params, "date"),
            user_filter: params
                .get("userIds")
                .map(|v| UserFilter { user_ids: split_list(v) }),
            sorting: decode_sorting(params, &mut issues),
            pagination: decode_pagination(params, &mut issues),
            fields: BTreeMap::new(),
        };

        if let Some(registry) = self.registry {
            for def in registry.iter() {
                if let Some(value) = decode_field(params, &def.name, def.kind, &mut issues) {
                    filters.fields.insert(def.name.clone(), value);
                }
            }
        }

        (filters, issues)
    }
}

fn decode_date_range(params: &UrlParams, prefix: &str) -> Option<DateRange> {
    let start = params.get(&format!("{}Start", prefix)).map(str::to_string);
    let end = params.get(&format!("{}End", prefix)).map(str::to_string);
    (start.is_some() || end.is_some()).then_some(DateRange { start, end })
}

fn decode_sorting(params: &UrlParams, issues: &mut Vec<DecodeError>) -> Option<Sorting> {
    let direction = match params.get("sortOrder") {
        Some(raw) => SortDirection::parse(raw).or_else(|| {
            issues.push(issue("sortOrder", raw, "expected 'asc' or 'desc'"));
            None
        }),
        None => None,
    };

    let Some(field) = params.get("sortBy") else {
        if let Some(raw) = params.get("sortOrder") {
            issues.push(issue("sortOrder", raw, "sortOrder without sortBy"));
        }
        return None;
    };

    Some(Sorting {
        field: field.to_string(),
        direction: direction.unwrap_or_default(),
    })
}

fn decode_pagination(params: &UrlParams, issues: &mut Vec<DecodeError>) -> Option<Pagination> {
    let page = parse_positive(params, "page", issues);
    let limit = parse_positive(params, "limit", issues);
    (page.is_some() || limit.is_some()).then_some(Pagination { page, limit })
}

fn parse_positive(params: &UrlParams, key: &str, issues: &mut Vec<DecodeError>) -> Option<u32> {
    let raw = params.get(key)?;
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            issues.push(issue(key, raw, "expected a positive integer"));
            None
        }
    }
}

fn parse_number(params: &UrlParams, key: &str, issues: &mut Vec<DecodeError>) -> Option<f64> {
    let raw = params.get(key)?;
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            issues.push(issue(key, raw, "expected a finite number"));
            None
        }
    }
}

fn decode_field(
    params: &UrlParams,
    name: &str,
    kind: FieldKind,
    issues: &mut Vec<DecodeError>,
) -> Option<FilterValue> {
    match kind {
        FieldKind::Text => params.get(name).map(|v| FilterValue::Text(v.to_string())),
        FieldKind::MultiSelect => params.get(name).map(|v| FilterValue::MultiSelect(split_list(v))),
        FieldKind::Users => params.get(name).map(|v| {
            FilterValue::Users(UserFilter {
                user_ids: split_list(v),
            })
        }),
        FieldKind::DateRange => decode_date_range(params, name).map(FilterValue::DateRange),
        FieldKind::NumericRange => {
            let min = parse_number(params, &format!("{}Min", name), issues);
            let max = parse_number(params, &format!("{}Max", name), issues);
            (min.is_some() || max.is_some())
                .then_some(FilterValue::NumericRange(NumericRange { min, max }))
        }
    }
}

fn issue(param: &str, value: &str, reason: &str) -> DecodeError {
    DecodeError {
        param: param.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Comma-join list values, escaping `%` and `,` inside each value
pub fn join_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| escape_list_value(v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`join_list`]
pub fn split_list(joined: &str) -> Vec<String> {
    joined.split(',').map(unescape_list_value).collect()
}

fn escape_list_value(value: &str) -> String {
    value.replace('%', "%25").replace(',', "%2C")
}

fn unescape_list_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if tail.starts_with("%2C") || tail.starts_with("%2c") {
            out.push(',');
            rest = &tail[3..];
        } else if tail.starts_with("%25") {
            out.push('%');
            rest = &tail[3..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
