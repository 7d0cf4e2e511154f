//! Axum extractor for filter query strings
//!
//! `FilterQuery` captures the raw query parameters of a request. The
//! built-in fields are decoded right away; entity-specific fields need the
//! entity's registry and are decoded with [`FilterQuery::decode_with`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

use crate::core::codec::{FilterCodec, UrlParams, decode_filters_from_url};
use crate::core::field::FieldRegistry;
use crate::core::state::FilterState;

/// Filter state carried by a request's query string
///
/// Extraction never fails: malformed parameters are dropped, so a stale
/// bookmark still yields a listing.
///
/// # Example
///
/// ```rust,ignore
/// async fn list(Path(entity): Path<String>, query: FilterQuery) -> impl IntoResponse {
///     let filters = query.decode_with(&registry);
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterQuery {
    pub params: UrlParams,
    /// Built-in fields only
    pub filters: FilterState,
}

impl FilterQuery {
    pub fn from_query(query: &str) -> Self {
        let params = UrlParams::parse(query);
        let filters = decode_filters_from_url(&params);
        Self { params, filters }
    }

    /// Decode again, including the fields registered for one entity
    pub fn decode_with(&self, registry: &FieldRegistry) -> FilterState {
        FilterCodec::new(registry).decode(&self.params)
    }
}

impl<S> FromRequestParts<S> for FilterQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_query(parts.uri.query().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::{FieldKind, FilterValue};
    use crate::core::state::Pagination;
    use axum::http::Request;

    async fn extract(uri: &str) -> FilterQuery {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        FilterQuery::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_extracts_builtin_fields() {
        let query = extract("/tasks?search=seo+audit&status=active%2Cpending&page=2&limit=50").await;

        assert_eq!(query.filters.search.as_deref(), Some("seo audit"));
        assert_eq!(
            query.filters.status,
            Some(vec!["active".to_string(), "pending".to_string()])
        );
        assert_eq!(query.filters.pagination, Some(Pagination::new(2, 50)));
        assert!(query.filters.fields.is_empty());
    }

    #[tokio::test]
    async fn test_no_query_string_is_empty() {
        let query = extract("/tasks").await;
        assert!(query.params.is_empty());
        assert!(query.filters.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_values_are_dropped() {
        let query = extract("/tasks?page=abc&limit=10&sortOrder=desc").await;
        assert_eq!(query.filters.pagination, Some(Pagination { page: None, limit: Some(10) }));
        assert!(query.filters.sorting.is_none());
    }

    #[test]
    fn test_decode_with_registry() {
        let registry = FieldRegistry::new()
            .with_field("volume", FieldKind::NumericRange)
            .unwrap();
        let query = FilterQuery::from_query("volumeMin=100&volumeMax=500&search=shoes");

        let filters = query.decode_with(&registry);
        assert_eq!(filters.search.as_deref(), Some("shoes"));
        assert_eq!(
            filters.fields.get("volume"),
            Some(&FilterValue::range(Some(100.0), Some(500.0)))
        );
    }
}
