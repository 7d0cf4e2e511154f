//! Filter state model
//!
//! `FilterState` is the value passed between every stage of the pipeline:
//! the URL codec, validation, the query builders, the state manager and the
//! result cache. Every field is optional; an absent field means the view is
//! not filtered on that dimension.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::field::FilterValue;

/// Default page when pagination is absent or partial
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size when pagination is absent or partial
pub const DEFAULT_LIMIT: u32 = 20;

/// All filter, sort and pagination criteria for one listing view
///
/// # Example
/// ```rust,ignore
/// let filters = FilterState {
///     search: Some("seo audit".to_string()),
///     status: Some(vec!["active".to_string(), "pending".to_string()]),
///     pagination: Some(Pagination::new(2, 50)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    /// Free-text query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Multi-select status filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,

    /// Multi-select priority filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Vec<String>>,

    /// Date bounds (ISO-8601 strings)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    /// "Assigned to" style filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_filter: Option<UserFilter>,

    /// Sort field and direction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Sorting>,

    /// Page and page size (never counted as a filter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,

    /// Entity-specific fields, keyed by the entity's field registry
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FilterValue>,
}

impl FilterState {
    /// Create an empty filter state
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text search
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set the status filter
    pub fn with_status<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Set the priority filter
    pub fn with_priority<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Set the date range
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Set the sorting
    pub fn with_sorting(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sorting = Some(Sorting {
            field: field.into(),
            direction,
        });
        self
    }

    /// Set the pagination
    pub fn with_pagination(mut self, page: u32, limit: u32) -> Self {
        self.pagination = Some(Pagination::new(page, limit));
        self
    }

    /// Set an entity-specific field
    pub fn with_field(mut self, name: impl Into<String>, value: FilterValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Look up a field by its schema key
    ///
    /// Known keys are `search`, `status`, `priority`, `dateRange`,
    /// `userFilter`, `sorting` and `pagination`; anything else is looked up
    /// in the entity-specific fields.
    pub fn field(&self, key: &str) -> Option<FieldRef<'_>> {
        match key {
            "search" => self.search.as_deref().map(FieldRef::Text),
            "status" => self.status.as_deref().map(FieldRef::List),
            "priority" => self.priority.as_deref().map(FieldRef::List),
            "dateRange" => self.date_range.as_ref().map(FieldRef::DateRange),
            "userFilter" => self
                .user_filter
                .as_ref()
                .map(|u| FieldRef::List(&u.user_ids)),
            "sorting" => self.sorting.as_ref().map(FieldRef::Sorting),
            "pagination" => self.pagination.as_ref().map(FieldRef::Pagination),
            other => self.fields.get(other).map(FieldRef::from),
        }
    }

    /// Whether no field at all is set (pagination included)
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Borrowed view of one field of a `FilterState`, independent of where it lives
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Text(&'a str),
    List(&'a [String]),
    DateRange(&'a DateRange),
    NumericRange(&'a NumericRange),
    Sorting(&'a Sorting),
    Pagination(&'a Pagination),
}

impl<'a> From<&'a FilterValue> for FieldRef<'a> {
    fn from(value: &'a FilterValue) -> Self {
        match value {
            FilterValue::Text(s) => FieldRef::Text(s),
            FilterValue::MultiSelect(values) => FieldRef::List(values),
            FilterValue::DateRange(range) => FieldRef::DateRange(range),
            FilterValue::NumericRange(range) => FieldRef::NumericRange(range),
            FilterValue::Users(users) => FieldRef::List(&users.user_ids),
        }
    }
}

/// Exclusive date bounds, either of which may be absent
///
/// A record dated exactly on `start` or `end` is outside the range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl DateRange {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    /// Whether at least one bound holds a non-empty value
    pub fn is_active(&self) -> bool {
        [&self.start, &self.end]
            .iter()
            .any(|bound| bound.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

/// Numeric bounds for one numeric field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Whether at least one bound is set to a finite number
    pub fn is_active(&self) -> bool {
        self.min.is_some_and(f64::is_finite) || self.max.is_some_and(f64::is_finite)
    }
}

/// Users a record must be assigned to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserFilter {
    pub user_ids: Vec<String>,
}

impl UserFilter {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Parse `asc` / `desc`, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort field and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Sorting {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Page number (starts at 1) and page size
///
/// Both parts are optional so that a partial update such as "go to page 2"
/// can be merged over an existing page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Only the page, keeping whatever page size it is merged onto
    pub fn page_only(page: u32) -> Self {
        Self {
            page: Some(page),
            limit: None,
        }
    }

    /// Get page number, ensuring minimum of 1
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    /// Get page size, ensuring minimum of 1
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).max(1)
    }

    /// Zero-based offset of the first record on this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }
}
