//! Integration tests for configuration loading and merging

use filters::prelude::*;
use std::io::Write;

const BASE_YAML: &str = r#"
defaults:
  page: 1
  limit: 25
  max_limit: 200

cache:
  ttl_secs: 60
  collapse_concurrent_misses: true

entities:
  - name: keywords
    table: Keywords
    search_fields: [Keyword]
    fields:
      - name: volume
        kind: numeric_range
        column: Search Volume
      - name: intent
        kind: multi_select
    validation:
      search:
        max_length: 80
      intent:
        allowed_values: [informational, commercial, transactional]

  - name: projects
    table: Projects
    columns:
      status:
        name: Health
"#;

#[test]
fn test_load_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BASE_YAML.as_bytes()).unwrap();

    let config = FiltersConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.defaults.limit, 25);
    assert_eq!(config.defaults.max_limit, 200);
    assert_eq!(config.cache.ttl_secs, 60);
    assert!(config.cache.collapse_concurrent_misses);

    let keywords = config.entity("keywords").unwrap();
    let registry = keywords.registry().unwrap();
    assert_eq!(registry.get("volume"), Some(FieldKind::NumericRange));
    assert_eq!(registry.get("intent"), Some(FieldKind::MultiSelect));
    assert_eq!(keywords.column_mapping().column("volume"), "Search Volume");

    let projects = config.entity("projects").unwrap();
    assert_eq!(projects.column_mapping().column("status"), "Health");
    assert_eq!(projects.column_mapping().match_mode("status"), MatchMode::Equals);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.yaml");

    let err = FiltersConfig::from_yaml_file(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_parse_error_names_the_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"entities: [unclosed").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let err = FiltersConfig::from_yaml_file(&path).unwrap_err();
    assert!(matches!(&err, ConfigError::ParseError { file: Some(f), .. } if *f == path));
    assert!(err.to_string().contains(&path));
}

#[test]
fn test_validation_rules_from_yaml_apply_to_listing_filters() {
    let config = FiltersConfig::from_yaml_str(BASE_YAML).unwrap();
    let keywords = config.entity("keywords").unwrap();

    let filters = FilterState::new()
        .with_search("x".repeat(81))
        .with_field("intent", FilterValue::multi(["navigational"]));
    let result = validate_filter_state(&filters, Some(keywords.validation()));

    assert!(!result.is_valid);
    assert_eq!(result.errors["search"], "search exceeds maximum length");
    assert_eq!(result.errors["intent"], "intent contains invalid values");
}

#[test]
fn test_merge_empty_configs() {
    let merged = FiltersConfig::merge(vec![]);
    assert!(merged.entities.is_empty());
    assert_eq!(merged.defaults.limit, 20);
}

#[test]
fn test_merge_replaces_entities_by_name() {
    let base = FiltersConfig::from_yaml_str(BASE_YAML).unwrap();
    let overlay = FiltersConfig::from_yaml_str(
        r#"
entities:
  - name: projects
    table: Client Projects
  - name: tasks
    table: Tasks
"#,
    )
    .unwrap();

    let merged = FiltersConfig::merge(vec![base, overlay]);

    let names: Vec<&str> = merged.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["keywords", "projects", "tasks"]);
    assert_eq!(merged.entity("projects").unwrap().table, "Client Projects");
    // Defaults and cache settings come from the last configuration
    assert_eq!(merged.defaults.limit, 20);
    assert_eq!(merged.cache.ttl_secs, 300);
}

#[test]
fn test_service_rejects_invalid_config() {
    let mut config = FiltersConfig::default_config();
    config.defaults.limit = 0;

    let result = FilterService::new(Arc::new(InMemoryRecordStore::new()), &config);
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_service_rejects_entity_without_search_columns() {
    let mut config = FiltersConfig::default_config();
    let mut notes = EntityFilterConfig::new("notes", "Notes");
    notes.search_fields.clear();
    config.entities.push(notes);

    let result = FilterService::new(Arc::new(InMemoryRecordStore::new()), &config);
    assert!(matches!(
        result,
        Err(ConfigError::InvalidValue { field, .. }) if field == "entities.search_fields"
    ));
}
