//! HTTP surface for the filter pipeline
//!
//! Generic routes that expose every configured entity:
//! - filtered listings decoded from the query string
//! - record updates that invalidate cached listings
//! - introspection of entities and cache statistics

pub mod handlers;
pub mod router;

pub use handlers::AppState;
pub use router::build_filter_routes;
