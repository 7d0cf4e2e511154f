//! Configuration loading and management

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::core::error::ConfigError;
use crate::core::field::{FieldKind, FieldRegistry};
use crate::core::state::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::core::validation::{FieldRule, FilterValidation};
use crate::query::mapping::{Column, ColumnMapping, MatchMode};

/// Pagination defaults applied by the filter service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationDefaults {
    /// Page used when a request has none
    pub page: u32,

    /// Page size used when a request has none
    pub limit: u32,

    /// Largest page size a request may ask for
    pub max_limit: u32,
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            max_limit: 100,
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Time-to-live of cached responses in seconds
    pub ttl_secs: u64,

    /// Collapse concurrent misses for one key into a single store call
    pub collapse_concurrent_misses: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            collapse_concurrent_misses: false,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_ttl(Duration::from_secs(self.ttl_secs))
            .with_miss_collapsing(self.collapse_concurrent_misses)
    }
}

/// An entity-specific filter field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Field name, also its URL parameter (or parameter prefix for ranges)
    pub name: String,

    pub kind: FieldKind,

    /// Backend column (defaults to the name with its first letter upper-cased)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// How list values match the column
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
}

/// Filter configuration of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFilterConfig {
    /// Entity name, used in routes and cache keys (e.g., "keywords")
    pub name: String,

    /// Record store table (e.g., "Keywords")
    pub table: String,

    /// Columns searched by the free-text filter
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<String>,

    /// Column compared against `dateRange`
    #[serde(default = "default_date_field")]
    pub date_field: String,

    /// Column compared against `userFilter`
    #[serde(default = "default_user_field")]
    pub user_field: String,

    /// Column overrides for built-in keys such as `status` or `priority`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, Column>,

    /// Entity-specific filter fields
    #[serde(default)]
    pub fields: Vec<FieldConfig>,

    /// Validation rules keyed by filter field
    #[serde(default)]
    pub validation: FilterValidation,
}

fn default_search_fields() -> Vec<String> {
    vec!["Name".to_string()]
}

fn default_date_field() -> String {
    "Date".to_string()
}

fn default_user_field() -> String {
    "Assignee".to_string()
}

impl EntityFilterConfig {
    /// Create an entity with default columns and no extra fields
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            search_fields: default_search_fields(),
            date_field: default_date_field(),
            user_field: default_user_field(),
            columns: BTreeMap::new(),
            fields: Vec::new(),
            validation: FilterValidation::default(),
        }
    }

    /// Registry of the entity-specific fields
    pub fn registry(&self) -> Result<FieldRegistry, ConfigError> {
        let mut registry = FieldRegistry::new();
        for field in &self.fields {
            registry.register(&field.name, field.kind)?;
        }
        Ok(registry)
    }

    /// Column mapping for the query builders
    pub fn column_mapping(&self) -> ColumnMapping {
        let mut mapping = ColumnMapping::new()
            .with_search_columns(self.search_fields.iter().cloned())
            .with_date_column(self.date_field.clone())
            .with_user_column(self.user_field.clone());

        for (key, column) in &self.columns {
            mapping = mapping.with_column(key, &column.name, column.match_mode);
        }
        for field in &self.fields {
            if let Some(column) = &field.column {
                mapping = mapping.with_column(&field.name, column, field.match_mode);
            } else if field.match_mode != MatchMode::default() {
                let column = mapping.column(&field.name);
                mapping = mapping.with_column(&field.name, &column, field.match_mode);
            }
        }
        mapping
    }

    pub fn validation(&self) -> &FilterValidation {
        &self.validation
    }
}

/// Complete configuration of the filter pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub defaults: PaginationDefaults,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub entities: Vec<EntityFilterConfig>,
}

impl FiltersConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, Some(path))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml, None)
    }

    fn parse(yaml: &str, file: Option<&str>) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: file.map(str::to_string),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<(), ConfigError> {
        let defaults = &self.defaults;
        if defaults.page == 0 {
            return Err(invalid("defaults.page", defaults.page, "must be at least 1"));
        }
        if defaults.max_limit == 0 {
            return Err(invalid("defaults.max_limit", defaults.max_limit, "must be at least 1"));
        }
        if defaults.limit == 0 || defaults.limit > defaults.max_limit {
            return Err(invalid(
                "defaults.limit",
                defaults.limit,
                "must be between 1 and defaults.max_limit",
            ));
        }

        let mut seen = Vec::new();
        for entity in &self.entities {
            if !is_valid_entity_name(&entity.name) {
                return Err(invalid(
                    "entities.name",
                    &entity.name,
                    "must be lowercase letters, digits, '-' or '_'",
                ));
            }
            if seen.contains(&entity.name.as_str()) {
                return Err(invalid("entities.name", &entity.name, "is defined twice"));
            }
            seen.push(entity.name.as_str());
            if entity.search_fields.iter().all(|f| f.trim().is_empty()) {
                return Err(invalid(
                    "entities.search_fields",
                    &entity.name,
                    "must name at least one column",
                ));
            }
            entity.registry()?;
        }
        Ok(())
    }

    /// Find an entity by name
    pub fn entity(&self, name: &str) -> Option<&EntityFilterConfig> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Merge several configurations
    ///
    /// Entities are combined by name, a later definition replacing an earlier
    /// one. `defaults` and `cache` come from the last configuration.
    pub fn merge(configs: Vec<FiltersConfig>) -> FiltersConfig {
        let mut merged = FiltersConfig::default();
        for config in configs {
            merged.defaults = config.defaults;
            merged.cache = config.cache;
            for entity in config.entities {
                match merged.entities.iter_mut().find(|e| e.name == entity.name) {
                    Some(existing) => *existing = entity,
                    None => merged.entities.push(entity),
                }
            }
        }
        merged
    }

    /// Create a default configuration for testing
    pub fn default_config() -> Self {
        let mut tasks = EntityFilterConfig::new("tasks", "Tasks");
        tasks.fields = vec![
            FieldConfig {
                name: "client".to_string(),
                kind: FieldKind::MultiSelect,
                column: None,
                match_mode: MatchMode::Contains,
            },
            FieldConfig {
                name: "estimate".to_string(),
                kind: FieldKind::NumericRange,
                column: Some("Estimate (h)".to_string()),
                match_mode: MatchMode::Equals,
            },
        ];
        tasks.validation = FilterValidation::new()
            .rule("search", FieldRule::max_length(100))
            .rule("status", FieldRule::allowed_values(["todo", "active", "done"]))
            .rule("dateRange", FieldRule::date_format("%Y-%m-%d").and_ordered());

        let mut keywords = EntityFilterConfig::new("keywords", "Keywords");
        keywords.search_fields = vec!["Keyword".to_string()];
        keywords.fields = vec![FieldConfig {
            name: "volume".to_string(),
            kind: FieldKind::NumericRange,
            column: Some("Search Volume".to_string()),
            match_mode: MatchMode::Equals,
        }];

        Self {
            defaults: PaginationDefaults::default(),
            cache: CacheSettings::default(),
            entities: vec![tasks, keywords],
        }
    }
}

fn invalid(field: &str, value: impl ToString, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

fn is_valid_entity_name(name: &str) -> bool {
    static ENTITY_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = ENTITY_NAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("entity name pattern is valid"));
    regex.is_match(name)
}
