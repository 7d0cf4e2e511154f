//! Router builder for filtered listing routes

use axum::{
    Router,
    routing::{get, patch},
};

use super::handlers::{AppState, cache_stats, list_entities, list_records, update_record};
use crate::core::store::RecordStore;

/// Build the filter routes
///
/// These routes are generic and work for every configured entity:
/// - GET /_entities - List configured entity names
/// - GET /_cache/stats - Result cache statistics
/// - GET /{entity} - List one filtered page of records
/// - PATCH /{entity}/{record_id} - Update a record and invalidate cached listings
pub fn build_filter_routes<S: RecordStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/_entities", get(list_entities::<S>))
        .route("/_cache/stats", get(cache_stats::<S>))
        .route("/{entity}", get(list_records::<S>))
        .route("/{entity}/{record_id}", patch(update_record::<S>))
        .with_state(state)
}
