//! Validation and sanitization of filter state
//!
//! Sanitization strips empty values so a state carries only meaningful
//! criteria. Validation checks a state against a declarative
//! [`FilterValidation`] schema and reports field-level messages; it never
//! aborts the pipeline on its own.

pub mod sanitize;
pub mod validators;

pub use sanitize::sanitize_filter_state;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{FieldValidationError, ValidationError};
use crate::core::state::FilterState;

/// Rules for one `FilterState` field
///
/// Rules are checked in declaration order and the first failing rule wins:
/// `required`, `max_length`, `allowed_values`, `date_format`, `ordered`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRule {
    /// The field must be present
    pub required: bool,

    /// Maximum length in characters for text values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Values a list (or text, or sort field) may take
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,

    /// chrono format every date bound must parse with (e.g. `%Y-%m-%d`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    /// Range bounds must not be inverted
    pub ordered: bool,
}

impl FieldRule {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    pub fn max_length(max: usize) -> Self {
        Self {
            max_length: Some(max),
            ..Default::default()
        }
    }

    pub fn allowed_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_values: Some(values.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn date_format(format: impl Into<String>) -> Self {
        Self {
            date_format: Some(format.into()),
            ..Default::default()
        }
    }

    pub fn and_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn and_ordered(mut self) -> Self {
        self.ordered = true;
        self
    }
}

/// Validation schema for one entity's filters, keyed by `FilterState` field
///
/// Constructed once per entity type and passed by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterValidation {
    rules: BTreeMap<String, FieldRule>,
}

impl FilterValidation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule for a field
    pub fn rule(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.rules.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldRule)> {
        self.rules.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Outcome of validating a `FilterState`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl ValidationResult {
    /// Convert into a `Result`, collecting field errors on failure
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_valid {
            return Ok(());
        }
        Err(ValidationError::FieldErrors(
            self.errors
                .into_iter()
                .map(|(field, message)| FieldValidationError { field, message })
                .collect(),
        ))
    }
}

/// Check `filters` against `validation`
///
/// Without a schema every state is valid. Each field reports at most one
/// error (its first failing rule); different fields accumulate independently.
pub fn validate_filter_state(
    filters: &FilterState,
    validation: Option<&FilterValidation>,
) -> ValidationResult {
    let Some(validation) = validation else {
        return ValidationResult {
            is_valid: true,
            errors: BTreeMap::new(),
        };
    };

    let errors: BTreeMap<String, String> = validation
        .iter()
        .filter_map(|(field, rule)| {
            validators::check_field(field, filters.field(field), rule)
                .err()
                .map(|message| (field.clone(), message))
        })
        .collect();

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}
