//! Airtable `filterByFormula` builder
//!
//! Predicates are ANDed at the top level:
//!
//! ```text
//! AND(SEARCH(LOWER('seo'),LOWER({Name})),OR({Status}='On Track',{Status}='At Risk'),IS_AFTER({Date},'2024-01-01'))
//! ```
//!
//! A single predicate is emitted bare and an empty state yields `""`.

use crate::core::field::FilterValue;
use crate::core::state::{DateRange, FilterState, NumericRange};
use crate::core::validation::sanitize::sanitize_filter_state;
use crate::query::mapping::{ColumnMapping, MatchMode};

/// Builds formulas for one entity's column mapping
#[derive(Debug, Clone, Copy)]
pub struct AirtableFormulaBuilder<'a> {
    mapping: &'a ColumnMapping,
}

impl<'a> AirtableFormulaBuilder<'a> {
    pub fn new(mapping: &'a ColumnMapping) -> Self {
        Self { mapping }
    }

    /// Translate a filter state into a formula string
    pub fn build(&self, filters: &FilterState) -> String {
        let filters = sanitize_filter_state(filters);
        let mapping = self.mapping;
        let mut predicates = Vec::new();

        if let Some(term) = &filters.search {
            let searches: Vec<String> = mapping
                .search_columns()
                .iter()
                .map(|column| {
                    format!(
                        "SEARCH(LOWER('{}'),LOWER({}))",
                        escape_formula_string(term),
                        field_ref(column)
                    )
                })
                .collect();
            predicates.extend(combine("OR", searches));
        }

        if let Some(values) = &filters.status {
            predicates.extend(self.list_predicate("status", values));
        }
        if let Some(values) = &filters.priority {
            predicates.extend(self.list_predicate("priority", values));
        }
        if let Some(range) = &filters.date_range {
            push_date_range(&mut predicates, mapping.date_column(), range);
        }
        if let Some(users) = &filters.user_filter {
            predicates.extend(contains_any(mapping.user_column(), &users.user_ids));
        }

        for (name, value) in &filters.fields {
            let column = mapping.column(name);
            match value {
                FilterValue::Text(text) => predicates.push(equals(&column, text)),
                FilterValue::MultiSelect(values) => {
                    predicates.extend(self.list_predicate(name, values));
                }
                FilterValue::DateRange(range) => push_date_range(&mut predicates, &column, range),
                FilterValue::NumericRange(range) => {
                    push_numeric_range(&mut predicates, &column, range);
                }
                FilterValue::Users(users) => {
                    predicates.extend(contains_any(&column, &users.user_ids));
                }
            }
        }

        combine("AND", predicates).unwrap_or_default()
    }

    fn list_predicate(&self, key: &str, values: &[String]) -> Option<String> {
        let column = self.mapping.column(key);
        match self.mapping.match_mode(key) {
            MatchMode::Equals => combine("OR", values.iter().map(|v| equals(&column, v)).collect()),
            MatchMode::Contains => contains_any(&column, values),
        }
    }
}

/// Build a formula using the default column mapping
pub fn build_airtable_filter(filters: &FilterState) -> String {
    AirtableFormulaBuilder::new(&ColumnMapping::default()).build(filters)
}

/// Escape a value for a single-quoted formula string literal
pub fn escape_formula_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn field_ref(column: &str) -> String {
    format!("{{{}}}", column)
}

fn equals(column: &str, value: &str) -> String {
    format!("{}='{}'", field_ref(column), escape_formula_string(value))
}

/// One element of a multi-valued column equals one of `values`
///
/// The joined list is bounded by commas on both sides, so `usr1` never
/// matches inside `usr12`.
fn contains_any(column: &str, values: &[String]) -> Option<String> {
    let checks = values
        .iter()
        .map(|v| {
            format!(
                "FIND(',{},',','&ARRAYJOIN({},',')&',')",
                escape_formula_string(v),
                field_ref(column)
            )
        })
        .collect();
    combine("OR", checks)
}

fn push_date_range(predicates: &mut Vec<String>, column: &str, range: &DateRange) {
    if let Some(start) = &range.start {
        predicates.push(format!(
            "IS_AFTER({},'{}')",
            field_ref(column),
            escape_formula_string(start)
        ));
    }
    if let Some(end) = &range.end {
        predicates.push(format!(
            "IS_BEFORE({},'{}')",
            field_ref(column),
            escape_formula_string(end)
        ));
    }
}

fn push_numeric_range(predicates: &mut Vec<String>, column: &str, range: &NumericRange) {
    if let Some(min) = range.min {
        predicates.push(format!("{}>={}", field_ref(column), min));
    }
    if let Some(max) = range.max {
        predicates.push(format!("{}<={}", field_ref(column), max));
    }
}

/// `None` for no parts, the part itself for one, `FUNC(a,b,...)` otherwise
fn combine(function: &str, mut parts: Vec<String>) -> Option<String> {
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(format!("{}({})", function, parts.join(","))),
    }
}
