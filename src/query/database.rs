//! Structured database query built from a filter state
//!
//! A [`DatabaseQuery`] is backend-neutral: a SQL store renders it with
//! [`DatabaseQuery::to_sql_where`], the in-memory store evaluates it with
//! [`DatabaseQuery::matches`] and [`DatabaseQuery::sort_records`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::core::field::FilterValue;
use crate::core::state::{DateRange, FilterState, NumericRange, SortDirection, Sorting};
use crate::core::store::Record;
use crate::core::validation::sanitize::sanitize_filter_state;
use crate::query::mapping::{ColumnMapping, MatchMode};

/// Comparison applied by one condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Column equals the value
    Eq,
    /// Column equals one of the values (array)
    In,
    /// Multi-valued column holds one of the values (array), element for element
    ///
    /// SQL renders the column as a comma-joined list bounded by commas, so
    /// `usr1` never matches `usr12`.
    Contains,
    Gt,
    Lt,
    Gte,
    Lte,
}

/// One predicate on one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluate the condition against a record
    ///
    /// A record without the column never matches. An `In` or `Contains`
    /// condition with no values constrains nothing, as in `to_sql_where`.
    pub fn matches(&self, record: &Record) -> bool {
        if matches!(self.operator, Operator::In | Operator::Contains)
            && as_slice(&self.value).is_empty()
        {
            return true;
        }
        let Some(actual) = record.get(&self.field) else {
            return false;
        };

        match self.operator {
            Operator::Eq => values_equal(actual, &self.value),
            Operator::In | Operator::Contains => {
                let wanted = as_slice(&self.value);
                as_slice(actual)
                    .iter()
                    .any(|a| wanted.iter().any(|w| values_equal(a, w)))
            }
            Operator::Gt => compare_values(actual, &self.value) == Some(Ordering::Greater),
            Operator::Lt => compare_values(actual, &self.value) == Some(Ordering::Less),
            Operator::Gte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// Case-insensitive substring search over several columns (ORed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchClause {
    pub columns: Vec<String>,
    pub term: String,
}

impl SearchClause {
    /// A clause without columns matches every record
    pub fn matches(&self, record: &Record) -> bool {
        if self.columns.is_empty() {
            return true;
        }
        let needle = self.term.to_lowercase();
        self.columns.iter().any(|column| {
            record.get(column).is_some_and(|value| {
                as_slice(value)
                    .iter()
                    .filter_map(value_text)
                    .any(|text| text.to_lowercase().contains(&needle))
            })
        })
    }
}

/// Predicates, sort and window for one listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchClause>,

    /// ANDed with each other and with `search`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Column-mapped sort
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sorting>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl DatabaseQuery {
    /// Whether the query filters anything
    pub fn has_predicates(&self) -> bool {
        self.search.is_some() || !self.conditions.is_empty()
    }

    /// Whether a record satisfies every predicate
    pub fn matches(&self, record: &Record) -> bool {
        self.search.as_ref().is_none_or(|s| s.matches(record))
            && self.conditions.iter().all(|c| c.matches(record))
    }

    /// Sort records in place; records missing the column sort last
    pub fn sort_records(&self, records: &mut [Record]) {
        let Some(sort) = &self.sort else {
            return;
        };

        records.sort_by(|a, b| {
            match (a.get(&sort.field), b.get(&sort.field)) {
                (Some(x), Some(y)) => {
                    let ordering = compare_values(x, y).unwrap_or(Ordering::Equal);
                    match sort.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }

    /// Render the predicates as a SQL `WHERE` body with `?` placeholders
    ///
    /// Returns an empty clause when there are no predicates, and never an
    /// empty group. Column names are double-quoted; values are only ever
    /// passed as binds.
    pub fn to_sql_where(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut binds = Vec::new();

        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(&search.term.to_lowercase()));
            let parts: Vec<String> = search
                .columns
                .iter()
                .map(|column| {
                    binds.push(Value::String(pattern.clone()));
                    format!("LOWER({}) LIKE ? ESCAPE '\\'", quote_ident(column))
                })
                .collect();
            clauses.extend(group_or(parts));
        }

        for condition in &self.conditions {
            let column = quote_ident(&condition.field);
            let clause = match condition.operator {
                Operator::Eq => simple(&column, "=", &condition.value, &mut binds),
                Operator::Gt => simple(&column, ">", &condition.value, &mut binds),
                Operator::Lt => simple(&column, "<", &condition.value, &mut binds),
                Operator::Gte => simple(&column, ">=", &condition.value, &mut binds),
                Operator::Lte => simple(&column, "<=", &condition.value, &mut binds),
                Operator::In => {
                    let values = as_slice(&condition.value);
                    if values.is_empty() {
                        continue;
                    }
                    let placeholders = vec!["?"; values.len()].join(", ");
                    binds.extend(values.iter().cloned());
                    format!("{} IN ({})", column, placeholders)
                }
                Operator::Contains => {
                    let parts = as_slice(&condition.value)
                        .iter()
                        .map(|value| {
                            let text = value_text(value).unwrap_or_default();
                            binds.push(Value::String(format!("%,{},%", escape_like(&text))));
                            format!("',' || {} || ',' LIKE ? ESCAPE '\\'", column)
                        })
                        .collect();
                    match group_or(parts) {
                        Some(clause) => clause,
                        None => continue,
                    }
                }
            };
            clauses.push(clause);
        }

        (clauses.join(" AND "), binds)
    }
}

/// Builds [`DatabaseQuery`] values for one entity's column mapping
#[derive(Debug, Clone, Copy)]
pub struct DatabaseQueryBuilder<'a> {
    mapping: &'a ColumnMapping,
}

impl<'a> DatabaseQueryBuilder<'a> {
    pub fn new(mapping: &'a ColumnMapping) -> Self {
        Self { mapping }
    }

    /// Translate a filter state into a structured query
    ///
    /// The state is sanitized first, so empty values never produce
    /// predicates. Date bounds are exclusive, numeric bounds inclusive.
    pub fn build(&self, filters: &FilterState) -> DatabaseQuery {
        let filters = sanitize_filter_state(filters);
        let mapping = self.mapping;
        let mut query = DatabaseQuery::default();

        // A mapping without search columns ignores the search term
        let search_columns = mapping.search_columns();
        if let Some(term) = filters.search.as_ref().filter(|_| !search_columns.is_empty()) {
            query.search = Some(SearchClause {
                columns: search_columns.to_vec(),
                term: term.clone(),
            });
        }

        if let Some(values) = &filters.status {
            query.conditions.push(list_condition(mapping, "status", values));
        }
        if let Some(values) = &filters.priority {
            query.conditions.push(list_condition(mapping, "priority", values));
        }
        if let Some(range) = &filters.date_range {
            push_date_range(&mut query.conditions, mapping.date_column(), range);
        }
        if let Some(users) = &filters.user_filter {
            query.conditions.push(Condition::new(
                mapping.user_column(),
                Operator::Contains,
                users.user_ids.clone(),
            ));
        }

        for (name, value) in &filters.fields {
            let column = mapping.column(name);
            match value {
                FilterValue::Text(text) => {
                    query
                        .conditions
                        .push(Condition::new(column, Operator::Eq, text.clone()));
                }
                FilterValue::MultiSelect(values) => {
                    query.conditions.push(list_condition(mapping, name, values));
                }
                FilterValue::DateRange(range) => {
                    push_date_range(&mut query.conditions, &column, range);
                }
                FilterValue::NumericRange(range) => {
                    push_numeric_range(&mut query.conditions, &column, range);
                }
                FilterValue::Users(users) => {
                    query.conditions.push(Condition::new(
                        column,
                        Operator::Contains,
                        users.user_ids.clone(),
                    ));
                }
            }
        }

        query.sort = filters.sorting.as_ref().map(|sorting| Sorting {
            field: mapping.column(&sorting.field),
            direction: sorting.direction,
        });

        if let Some(pagination) = &filters.pagination {
            query.limit = Some(pagination.limit());
            query.offset = Some(pagination.offset());
        }

        query
    }
}

/// Build a database query using the default column mapping
pub fn build_database_query(filters: &FilterState) -> DatabaseQuery {
    DatabaseQueryBuilder::new(&ColumnMapping::default()).build(filters)
}

fn list_condition(mapping: &ColumnMapping, key: &str, values: &[String]) -> Condition {
    let operator = match mapping.match_mode(key) {
        MatchMode::Equals => Operator::In,
        MatchMode::Contains => Operator::Contains,
    };
    Condition::new(mapping.column(key), operator, values.to_vec())
}

fn push_date_range(conditions: &mut Vec<Condition>, column: &str, range: &DateRange) {
    if let Some(start) = &range.start {
        conditions.push(Condition::new(column, Operator::Gt, start.clone()));
    }
    if let Some(end) = &range.end {
        conditions.push(Condition::new(column, Operator::Lt, end.clone()));
    }
}

fn push_numeric_range(conditions: &mut Vec<Condition>, column: &str, range: &NumericRange) {
    if let Some(min) = range.min {
        conditions.push(Condition::new(column, Operator::Gte, min));
    }
    if let Some(max) = range.max {
        conditions.push(Condition::new(column, Operator::Lte, max));
    }
}

fn simple(column: &str, op: &str, value: &Value, binds: &mut Vec<Value>) -> String {
    binds.push(value.clone());
    format!("{} {} ?", column, op)
}

/// `None` for no parts, the part itself for one, a parenthesized OR otherwise
fn group_or(mut parts: Vec<String>) -> Option<String> {
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(format!("({})", parts.join(" OR "))),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Arrays compare element-wise, scalars as a one-element slice
fn as_slice(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (value_number(a), value_number(b)) {
        (Some(x), Some(y)) if a.is_number() || b.is_number() => x == y,
        _ => value_text(a).is_some() && value_text(a) == value_text(b),
    }
}

/// Numbers compare numerically, everything else as text
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_number() || b.is_number() {
        if let (Some(x), Some(y)) = (value_number(a), value_number(b)) {
            return x.partial_cmp(&y);
        }
    }
    Some(value_text(a)?.cmp(&value_text(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::UserFilter;
    use serde_json::json;

    fn records() -> Vec<Record> {
        vec![
            Record::new(
                "rec1",
                json!({ "Name": "SEO Audit", "Status": "active", "Date": "2024-03-01", "Volume": 120, "Assignee": ["usr1"] }),
            ),
            Record::new(
                "rec2",
                json!({ "Name": "Backlink outreach", "Status": "pending", "Date": "2024-06-15", "Volume": 40, "Assignee": ["usr2"] }),
            ),
            Record::new(
                "rec3",
                json!({ "Name": "Site audit", "Status": "done", "Date": "2023-11-20", "Volume": 300 }),
            ),
        ]
    }

    #[test]
    fn test_empty_state_builds_empty_query() {
        let query = build_database_query(&FilterState::new());
        assert_eq!(query, DatabaseQuery::default());
        assert!(!query.has_predicates());
        assert_eq!(query.to_sql_where(), (String::new(), vec![]));
    }

    #[test]
    fn test_builds_conditions_in_field_order() {
        let filters = FilterState::new()
            .with_search("audit")
            .with_status(["active", "pending"])
            .with_date_range(DateRange::new(Some("2024-01-01"), None))
            .with_sorting("name", SortDirection::Desc)
            .with_pagination(2, 10);

        let query = build_database_query(&filters);
        assert_eq!(query.search.as_ref().map(|s| s.term.as_str()), Some("audit"));
        assert_eq!(
            query.conditions,
            vec![
                Condition::new("Status", Operator::In, json!(["active", "pending"])),
                Condition::new("Date", Operator::Gt, "2024-01-01"),
            ]
        );
        assert_eq!(query.sort, Some(Sorting::desc("Name")));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(10));
    }

    #[test]
    fn test_empty_values_produce_no_predicates() {
        let filters = FilterState::new()
            .with_search("")
            .with_status(Vec::<String>::new())
            .with_date_range(DateRange::new(Some(""), Some("")));

        assert!(!build_database_query(&filters).has_predicates());
    }

    #[test]
    fn test_mapping_controls_columns_and_operators() {
        let mapping = ColumnMapping::new()
            .with_column("status", "Stage", MatchMode::Contains)
            .with_column("volume", "Search Volume", MatchMode::Equals)
            .with_user_column("Owner");
        let filters = FilterState {
            user_filter: Some(UserFilter::new(["usr1"])),
            ..FilterState::new()
                .with_status(["won"])
                .with_field("volume", FilterValue::range(Some(10.0), Some(50.0)))
        };

        let query = DatabaseQueryBuilder::new(&mapping).build(&filters);
        assert_eq!(
            query.conditions,
            vec![
                Condition::new("Stage", Operator::Contains, json!(["won"])),
                Condition::new("Owner", Operator::Contains, json!(["usr1"])),
                Condition::new("Search Volume", Operator::Gte, 10.0),
                Condition::new("Search Volume", Operator::Lte, 50.0),
            ]
        );
    }

    #[test]
    fn test_matches_records() {
        let filters = FilterState::new()
            .with_search("AUDIT")
            .with_field("volume", FilterValue::range(Some(100.0), None));
        let query = build_database_query(&filters);

        let matched: Vec<String> = records()
            .into_iter()
            .filter(|r| query.matches(r))
            .map(|r| r.id)
            .collect();
        assert_eq!(matched, vec!["rec1".to_string(), "rec3".to_string()]);
    }

    #[test]
    fn test_date_bounds_are_exclusive() {
        let query = build_database_query(
            &FilterState::new().with_date_range(DateRange::new(Some("2024-03-01"), None)),
        );
        let matched: Vec<String> = records()
            .into_iter()
            .filter(|r| query.matches(r))
            .map(|r| r.id)
            .collect();
        assert_eq!(matched, vec!["rec2".to_string()]);
    }

    #[test]
    fn test_contains_matches_array_columns() {
        let condition = Condition::new("Assignee", Operator::Contains, json!(["usr2", "usr9"]));
        let matched: Vec<String> = records()
            .into_iter()
            .filter(|r| condition.matches(r))
            .map(|r| r.id)
            .collect();
        assert_eq!(matched, vec!["rec2".to_string()]);
    }

    #[test]
    fn test_contains_is_element_exact_in_both_dialects() {
        let mapping = ColumnMapping::new().with_user_column("Assignee");
        let filters = FilterState {
            user_filter: Some(UserFilter::new(["usr1"])),
            ..Default::default()
        };
        let query = DatabaseQueryBuilder::new(&mapping).build(&filters);

        let (clause, binds) = query.to_sql_where();
        assert_eq!(clause, "',' || \"Assignee\" || ',' LIKE ? ESCAPE '\\'");
        assert_eq!(binds, vec![json!("%,usr1,%")]);

        let collision = Record::new("rec9", json!({ "Assignee": ["usr12"] }));
        assert!(!query.matches(&collision));
        assert!(query.matches(&Record::new("rec8", json!({ "Assignee": ["usr12", "usr1"] }))));
    }

    #[test]
    fn test_no_search_columns_drops_the_search() {
        let mapping = ColumnMapping::new().with_search_columns(Vec::<String>::new());
        let query = DatabaseQueryBuilder::new(&mapping).build(&FilterState::new().with_search("hello"));

        assert_eq!(query.search, None);
        assert_eq!(query.to_sql_where(), (String::new(), vec![]));
        assert!(query.matches(&Record::new("rec1", json!({ "Name": "hello" }))));
    }

    #[test]
    fn test_empty_groups_are_never_rendered() {
        let query = DatabaseQuery {
            search: Some(SearchClause {
                columns: vec![],
                term: "hello".to_string(),
            }),
            conditions: vec![
                Condition::new("Tags", Operator::Contains, json!([])),
                Condition::new("Status", Operator::In, json!([])),
                Condition::new("Volume", Operator::Gte, 10),
            ],
            ..Default::default()
        };

        let (clause, binds) = query.to_sql_where();
        assert_eq!(clause, "\"Volume\" >= ?");
        assert_eq!(binds, vec![json!(10)]);
        assert!(query.matches(&Record::new("rec1", json!({ "Volume": 20 }))));
    }

    #[test]
    fn test_sort_records_missing_last() {
        let query = DatabaseQuery {
            sort: Some(Sorting::desc("Assignee")),
            ..Default::default()
        };
        let mut rows = records();
        query.sort_records(&mut rows);
        assert_eq!(rows.last().map(|r| r.id.as_str()), Some("rec3"));

        let query = DatabaseQuery {
            sort: Some(Sorting::asc("Volume")),
            ..Default::default()
        };
        query.sort_records(&mut rows);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rec2", "rec1", "rec3"]);
    }

    #[test]
    fn test_to_sql_where() {
        let mapping = ColumnMapping::new().with_search_columns(["Name", "Notes"]);
        let filters = FilterState::new()
            .with_search("50%")
            .with_priority(["high", "low"])
            .with_field("volume", FilterValue::range(None, Some(20.0)));

        let (clause, binds) = DatabaseQueryBuilder::new(&mapping)
            .build(&filters)
            .to_sql_where();

        assert_eq!(
            clause,
            "(LOWER(\"Name\") LIKE ? ESCAPE '\\' OR LOWER(\"Notes\") LIKE ? ESCAPE '\\') \
             AND \"Priority\" IN (?, ?) AND \"Volume\" <= ?"
        );
        assert_eq!(
            binds,
            vec![
                json!("%50\\%%"),
                json!("%50\\%%"),
                json!("high"),
                json!("low"),
                json!(20.0)
            ]
        );
    }
}
