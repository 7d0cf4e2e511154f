//! Filter service: the pipeline from request filters to a cached page of records

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{FilterCache, cache_key, create_filter_cache};
use crate::config::{EntityFilterConfig, FiltersConfig, PaginationDefaults};
use crate::core::codec::{FilterCodec, UrlParams};
use crate::core::error::{ConfigError, FilterError};
use crate::core::field::FieldRegistry;
use crate::core::state::{FilterState, Pagination};
use crate::core::store::{Record, RecordStore, SelectQuery};
use crate::core::validation::{sanitize_filter_state, validate_filter_state};
use crate::query::airtable::AirtableFormulaBuilder;
use crate::query::api::{ApiFilterResponse, PaginationMeta};
use crate::query::database::DatabaseQueryBuilder;
use crate::query::mapping::ColumnMapping;

/// Per-entity pieces derived once from configuration
#[derive(Debug, Clone)]
struct EntityPipeline {
    config: EntityFilterConfig,
    registry: FieldRegistry,
    mapping: ColumnMapping,
}

/// Runs filtered listings and writes for every configured entity
///
/// A listing is sanitized, validated, keyed, looked up in the cache and, on
/// a miss, fetched from the record store. A successful write drops every
/// cached listing of its entity.
pub struct FilterService<S: RecordStore> {
    store: Arc<S>,
    cache: Arc<FilterCache>,
    defaults: PaginationDefaults,
    entities: HashMap<String, EntityPipeline>,
}

impl<S: RecordStore> Clone for FilterService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            defaults: self.defaults,
            entities: self.entities.clone(),
        }
    }
}

impl<S: RecordStore> FilterService<S> {
    /// Build the service, with an in-memory cache configured from `config.cache`
    pub fn new(store: Arc<S>, config: &FiltersConfig) -> Result<Self, ConfigError> {
        let cache = Arc::new(create_filter_cache(config.cache.to_cache_config()));
        Self::with_cache(store, cache, config)
    }

    /// Build the service around an existing cache
    pub fn with_cache(
        store: Arc<S>,
        cache: Arc<FilterCache>,
        config: &FiltersConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let entities = config
            .entities
            .iter()
            .map(|entity| {
                let pipeline = EntityPipeline {
                    config: entity.clone(),
                    registry: entity.registry()?,
                    mapping: entity.column_mapping(),
                };
                Ok((entity.name.clone(), pipeline))
            })
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        Ok(Self {
            store,
            cache,
            defaults: config.defaults,
            entities,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &FilterCache {
        &self.cache
    }

    /// Names of the configured entities, sorted
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The field registry of an entity, for decoding its URL parameters
    pub fn registry(&self, entity: &str) -> Result<&FieldRegistry, FilterError> {
        Ok(&self.pipeline(entity)?.registry)
    }

    fn pipeline(&self, entity: &str) -> Result<&EntityPipeline, FilterError> {
        self.entities
            .get(entity)
            .ok_or_else(|| FilterError::UnknownEntity(entity.to_string()))
    }

    /// Sanitize and validate `filters`, then fill in and clamp pagination
    pub fn normalize(&self, entity: &str, filters: &FilterState) -> Result<FilterState, FilterError> {
        let pipeline = self.pipeline(entity)?;

        let mut filters = sanitize_filter_state(filters);
        validate_filter_state(&filters, Some(pipeline.config.validation())).into_result()?;

        let requested = filters.pagination.unwrap_or_default();
        let page = requested.page.unwrap_or(self.defaults.page).max(1);
        let limit = requested
            .limit
            .unwrap_or(self.defaults.limit)
            .clamp(1, self.defaults.max_limit.max(1));
        filters.pagination = Some(Pagination::new(page, limit));

        Ok(filters)
    }

    /// List one page of an entity's records matching `filters`
    pub async fn list(
        &self,
        entity: &str,
        filters: &FilterState,
    ) -> Result<ApiFilterResponse, FilterError> {
        let pipeline = self.pipeline(entity)?;
        let filters = self.normalize(entity, filters)?;
        let key = cache_key(entity, &filters);

        tracing::debug!(entity = %entity, key = %key, "Listing filtered records");

        self.cache
            .get_or_fetch(&key, || self.fetch(pipeline, filters))
            .await
    }

    async fn fetch(
        &self,
        pipeline: &EntityPipeline,
        filters: FilterState,
    ) -> Result<ApiFilterResponse, FilterError> {
        let pagination = filters.pagination.unwrap_or_default();
        let select = SelectQuery {
            filter_formula: AirtableFormulaBuilder::new(&pipeline.mapping).build(&filters),
            query: DatabaseQueryBuilder::new(&pipeline.mapping).build(&filters),
            page: pagination.page(),
            limit: pagination.limit(),
        };

        let page = self.store.select(&pipeline.config.table, &select).await?;
        tracing::debug!(
            table = %pipeline.config.table,
            total = page.total,
            "Fetched records from store"
        );

        Ok(ApiFilterResponse {
            data: page.records,
            pagination: PaginationMeta::new(select.page, select.limit, page.total),
            filters,
        })
    }

    /// Decode URL parameters with the entity's registry, then list
    pub async fn list_from_params(
        &self,
        entity: &str,
        params: &UrlParams,
    ) -> Result<ApiFilterResponse, FilterError> {
        let filters = FilterCodec::new(self.registry(entity)?).decode(params);
        self.list(entity, &filters).await
    }

    /// Decode a raw query string (`a=1&b=2`, with or without `?`), then list
    pub async fn list_from_query(
        &self,
        entity: &str,
        query: &str,
    ) -> Result<ApiFilterResponse, FilterError> {
        self.list_from_params(entity, &UrlParams::parse(query)).await
    }

    /// Update one record and drop the entity's cached listings
    ///
    /// The cache is left untouched when the store rejects the update.
    pub async fn update(
        &self,
        entity: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, FilterError> {
        let pipeline = self.pipeline(entity)?;
        let record = self
            .store
            .update(&pipeline.config.table, record_id, fields)
            .await?;

        let removed = self.cache.invalidate_entity(entity).await;
        tracing::info!(
            entity = %entity,
            record_id = %record_id,
            removed,
            "Invalidated cached listings after update"
        );

        Ok(record)
    }
}

#[cfg(all(test, feature = "in-memory"))]
mod tests {
    use super::*;
    use crate::core::error::{StoreError, ValidationError};
    use crate::storage::InMemoryRecordStore;
    use serde_json::json;

    fn service() -> FilterService<InMemoryRecordStore> {
        let store = InMemoryRecordStore::new();
        store
            .insert_all(
                "Tasks",
                vec![
                    Record::new("rec1", json!({ "Name": "Write brief", "Status": "active" })),
                    Record::new("rec2", json!({ "Name": "Review brief", "Status": "done" })),
                    Record::new("rec3", json!({ "Name": "Ship", "Status": "active" })),
                ],
            )
            .unwrap();
        FilterService::new(Arc::new(store), &FiltersConfig::default_config()).unwrap()
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let service = service();
        let filters = FilterState::new().with_status(["active"]).with_pagination(1, 1);

        let response = service.list("tasks", &filters).await.unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.pagination.total, 2);
        assert_eq!(response.pagination.total_pages, 2);
        assert!(response.pagination.has_next);
    }

    #[tokio::test]
    async fn test_list_sends_formula_to_store() {
        let service = service();
        service
            .list("tasks", &FilterState::new().with_status(["active", "done"]))
            .await
            .unwrap();

        let selects = service.store().selects();
        assert_eq!(selects[0].0, "Tasks");
        assert_eq!(
            selects[0].1.filter_formula,
            "OR({Status}='active',{Status}='done')"
        );
    }

    #[tokio::test]
    async fn test_limit_is_clamped_and_defaults_applied() {
        let service = service();

        let normalized = service
            .normalize("tasks", &FilterState::new().with_pagination(0, 10_000))
            .unwrap();
        assert_eq!(normalized.pagination, Some(Pagination::new(1, 100)));

        let normalized = service.normalize("tasks", &FilterState::new()).unwrap();
        assert_eq!(normalized.pagination, Some(Pagination::new(1, 20)));
    }

    #[tokio::test]
    async fn test_second_identical_list_is_cached() {
        let service = service();
        let filters = FilterState::new().with_search("brief");

        let first = service.list("tasks", &filters).await.unwrap();
        let second = service.list("tasks", &filters.clone().with_status(Vec::<String>::new())).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.store().select_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_filters_are_rejected_before_store() {
        let service = service();
        let err = service
            .list("tasks", &FilterState::new().with_status(["archived"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FilterError::Validation(ValidationError::FieldErrors(_))
        ));
        assert_eq!(service.store().select_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_entity() {
        let err = service().list("nope", &FilterState::new()).await.unwrap_err();
        assert!(matches!(err, FilterError::UnknownEntity(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_cached() {
        let service = service();
        service.store().fail_next(StoreError::Connection {
            backend: "in_memory".to_string(),
            message: "down".to_string(),
        });

        assert!(service.list("tasks", &FilterState::new()).await.is_err());
        assert_eq!(service.cache().stats().await.size, 0);
        assert!(service.list("tasks", &FilterState::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_invalidates_entity_listings() {
        let service = service();
        service.list("tasks", &FilterState::new()).await.unwrap();
        assert_eq!(service.cache().stats().await.size, 1);

        let mut fields = Map::new();
        fields.insert("Status".to_string(), json!("done"));
        service.update("tasks", "rec1", fields).await.unwrap();

        assert_eq!(service.cache().stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_cache() {
        let service = service();
        service.list("tasks", &FilterState::new()).await.unwrap();

        let err = service.update("tasks", "missing", Map::new()).await.unwrap_err();
        assert!(matches!(err, FilterError::Store(StoreError::NotFound { .. })));
        assert_eq!(service.cache().stats().await.size, 1);
    }

    #[tokio::test]
    async fn test_list_from_query_decodes_registry_fields() {
        let service = service();
        let response = service
            .list_from_query("tasks", "?estimateMin=2&page=1&limit=5")
            .await
            .unwrap();

        assert_eq!(
            response.filters.fields.get("estimate"),
            Some(&crate::core::field::FilterValue::range(Some(2.0), None))
        );
        assert_eq!(response.pagination.limit, 5);
    }
}
