//! Mapping from filter keys to backend column names

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a list filter is compared against a column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The column holds one value that must equal one of the filter values
    #[default]
    Equals,
    /// The column holds several values (linked records, multi-select,
    /// collaborators); one of them must match
    Contains,
}

/// A backend column and how list filters match it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
}

/// Column names for one entity's filters
///
/// Keys without an explicit column map to the key with its first letter
/// upper-cased (`status` -> `Status`), which matches the record store's
/// field naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    columns: BTreeMap<String, Column>,
    search_columns: Vec<String>,
    date_column: String,
    user_column: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            columns: BTreeMap::new(),
            search_columns: vec!["Name".to_string()],
            date_column: "Date".to_string(),
            user_column: "Assignee".to_string(),
        }
    }
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `key` to an explicit column
    pub fn with_column(mut self, key: &str, name: &str, match_mode: MatchMode) -> Self {
        self.columns.insert(
            key.to_string(),
            Column {
                name: name.to_string(),
                match_mode,
            },
        );
        self
    }

    /// Columns searched by the free-text filter
    pub fn with_search_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Column compared against `dateRange`
    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = column.into();
        self
    }

    /// Column compared against `userFilter`
    pub fn with_user_column(mut self, column: impl Into<String>) -> Self {
        self.user_column = column.into();
        self
    }

    /// Backend column for a filter key or sort field
    pub fn column(&self, key: &str) -> String {
        self.columns
            .get(key)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| default_column_name(key))
    }

    pub fn match_mode(&self, key: &str) -> MatchMode {
        self.columns
            .get(key)
            .map(|c| c.match_mode)
            .unwrap_or_default()
    }

    pub fn search_columns(&self) -> &[String] {
        &self.search_columns
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn user_column(&self) -> &str {
        &self.user_column
    }
}

fn default_column_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
