//! Entity-specific filter fields and their registry

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::core::error::ConfigError;
use crate::core::state::{DateRange, NumericRange, UserFilter};

/// URL parameter names owned by the built-in `FilterState` fields
pub const RESERVED_PARAMS: &[&str] = &[
    "search",
    "status",
    "priority",
    "dateStart",
    "dateEnd",
    "userIds",
    "page",
    "limit",
    "sortBy",
    "sortOrder",
];

/// The kinds of filter an entity-specific field can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    MultiSelect,
    DateRange,
    NumericRange,
    Users,
}

impl FieldKind {
    /// URL parameter names this kind occupies for a field called `name`
    pub fn param_names(&self, name: &str) -> Vec<String> {
        match self {
            FieldKind::Text | FieldKind::MultiSelect | FieldKind::Users => vec![name.to_string()],
            FieldKind::DateRange => vec![format!("{}Start", name), format!("{}End", name)],
            FieldKind::NumericRange => vec![format!("{}Min", name), format!("{}Max", name)],
        }
    }
}

/// Value of an entity-specific filter field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    Text(String),
    MultiSelect(Vec<String>),
    DateRange(DateRange),
    NumericRange(NumericRange),
    Users(UserFilter),
}

impl FilterValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FilterValue::Text(_) => FieldKind::Text,
            FilterValue::MultiSelect(_) => FieldKind::MultiSelect,
            FilterValue::DateRange(_) => FieldKind::DateRange,
            FilterValue::NumericRange(_) => FieldKind::NumericRange,
            FilterValue::Users(_) => FieldKind::Users,
        }
    }

    /// Shorthand for a multi-select value
    pub fn multi<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterValue::MultiSelect(values.into_iter().map(Into::into).collect())
    }

    /// Shorthand for a numeric range value
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        FilterValue::NumericRange(NumericRange::new(min, max))
    }

    /// Whether the value would filter anything
    pub fn is_active(&self) -> bool {
        match self {
            FilterValue::Text(s) => !s.is_empty(),
            FilterValue::MultiSelect(values) => values.iter().any(|v| !v.is_empty()),
            FilterValue::DateRange(range) => range.is_active(),
            FilterValue::NumericRange(range) => range.is_active(),
            FilterValue::Users(users) => users.user_ids.iter().any(|v| !v.is_empty()),
        }
    }
}

/// One registered entity-specific field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKind,
}

/// The finite set of extra filter fields an entity supports
///
/// The registry drives URL decoding of entity-specific parameters: a
/// parameter that is not reserved and not registered is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: Vec<FieldDefinition>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field, rejecting invalid or colliding names
    pub fn register(&mut self, name: &str, kind: FieldKind) -> Result<(), ConfigError> {
        if !is_valid_field_name(name) {
            return Err(ConfigError::InvalidValue {
                field: "fields.name".to_string(),
                value: name.to_string(),
                message: "field names must start with a letter and contain only letters, digits or '_'"
                    .to_string(),
            });
        }

        let taken = |param: &String| {
            RESERVED_PARAMS.contains(&param.as_str())
                || self
                    .fields
                    .iter()
                    .any(|f| f.kind.param_names(&f.name).contains(param))
        };
        if let Some(param) = kind.param_names(name).iter().find(|p| taken(p)) {
            return Err(ConfigError::InvalidValue {
                field: "fields.name".to_string(),
                value: name.to_string(),
                message: format!("URL parameter '{}' is already in use", param),
            });
        }

        self.fields.push(FieldDefinition {
            name: name.to_string(),
            kind,
        });
        Ok(())
    }

    /// Builder-style `register`
    pub fn with_field(mut self, name: &str, kind: FieldKind) -> Result<Self, ConfigError> {
        self.register(name, kind)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn is_valid_field_name(name: &str) -> bool {
    static FIELD_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = FIELD_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("field name pattern is valid")
    });
    regex.is_match(name)
}
