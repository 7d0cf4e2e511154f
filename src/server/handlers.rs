//! HTTP handlers for filtered listings
//!
//! The handlers are entity-agnostic: the entity comes from the path and is
//! resolved against the service configuration.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::cache::CacheStats;
use crate::core::error::FilterError;
use crate::core::extractors::FilterQuery;
use crate::core::service::FilterService;
use crate::core::store::{Record, RecordStore};
use crate::query::api::ApiFilterResponse;

/// Application state shared across handlers
pub struct AppState<S: RecordStore> {
    pub service: Arc<FilterService<S>>,
}

impl<S: RecordStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<S: RecordStore> AppState<S> {
    pub fn new(service: FilterService<S>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Response for the entity introspection endpoint
#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    pub entities: Vec<String>,
    pub count: usize,
}

/// List one page of records
///
/// GET /{entity}?search=...&status=a,b&page=2&limit=50
pub async fn list_records<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    Path(entity): Path<String>,
    query: FilterQuery,
) -> Result<Json<ApiFilterResponse>, FilterError> {
    let filters = query.decode_with(state.service.registry(&entity)?);
    let response = state.service.list(&entity, &filters).await?;
    Ok(Json(response))
}

/// Update one record's fields and invalidate the entity's cached listings
///
/// PATCH /{entity}/{record_id}
pub async fn update_record<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    Path((entity, record_id)): Path<(String, String)>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Record>, FilterError> {
    let record = state.service.update(&entity, &record_id, fields).await?;
    Ok(Json(record))
}

/// GET /_entities
pub async fn list_entities<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<EntitiesResponse> {
    let entities: Vec<String> = state
        .service
        .entity_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    Json(EntitiesResponse {
        count: entities.len(),
        entities,
    })
}

/// GET /_cache/stats
pub async fn cache_stats<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<CacheStats> {
    Json(state.service.cache().stats().await)
}
