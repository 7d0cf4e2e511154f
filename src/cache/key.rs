//! Cache key derivation

use sha2::{Digest, Sha256};

use crate::core::state::FilterState;
use crate::core::validation::sanitize::sanitize_filter_state;

/// Prefix shared by every key of one entity
pub fn entity_prefix(entity: &str) -> String {
    format!("{}:", entity)
}

/// Deterministic key for one entity listing
///
/// The state is sanitized, serialized to JSON (fixed struct order, extra
/// fields sorted by name) and hashed, so logically equal states map to the
/// same key: `"<entity>:<sha256 hex>"`.
pub fn cache_key(entity: &str, filters: &FilterState) -> String {
    let canonical = serde_json::to_vec(&sanitize_filter_state(filters)).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    format!("{}{}", entity_prefix(entity), hex::encode(digest))
}
