//! Typed error handling for the filter pipeline
//!
//! # Error Categories
//!
//! - [`ValidationError`]: a `FilterState` failed its `FilterValidation` schema
//! - [`DecodeError`]: a malformed URL parameter (reported, never raised)
//! - [`StoreError`]: the backing record store failed
//! - [`CacheError`]: a cache backend failed (absorbed by the cache)
//! - [`ConfigError`]: configuration parsing and validation
//!
//! # Example
//!
//! ```rust,ignore
//! match service.list("keywords", &filters).await {
//!     Ok(page) => render(page),
//!     Err(FilterError::Validation(ValidationError::FieldErrors(errors))) => {
//!         show_inline_errors(errors)
//!     }
//!     Err(e) if e.is_retryable() => show_retry_banner(e),
//!     Err(e) => return Err(e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// The main error type of the filter pipeline
#[derive(Debug, Error)]
pub enum FilterError {
    /// Filter validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backing record store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cache backend errors (only surfaced by direct backend use)
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unknown entity name
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Whether the client may retry the same request
    pub retryable: bool,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl FilterError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            FilterError::Validation(_) => StatusCode::BAD_REQUEST,
            FilterError::Store(e) => e.status_code(),
            FilterError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FilterError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FilterError::UnknownEntity(_) => StatusCode::NOT_FOUND,
            FilterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            FilterError::Validation(_) => "VALIDATION_ERROR",
            FilterError::Store(e) => e.error_code(),
            FilterError::Cache(_) => "CACHE_ERROR",
            FilterError::Config(_) => "CONFIG_ERROR",
            FilterError::UnknownEntity(_) => "UNKNOWN_ENTITY",
            FilterError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether repeating the request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FilterError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            retryable: self.is_retryable(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            FilterError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            FilterError::Store(StoreError::RateLimited {
                retry_after: Some(after),
                ..
            }) => Some(serde_json::json!({ "retry_after_ms": after.as_millis() as u64 })),
            FilterError::Store(StoreError::NotFound { table, id }) => {
                Some(serde_json::json!({ "table": table, "id": id }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for FilterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to filter validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Field-level errors from a validation schema
    #[error("Validation errors: {}", format_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// Invalid JSON filter payload
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn format_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Decode Errors
// =============================================================================

/// A URL parameter that could not be decoded and was treated as absent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Ignored parameter '{param}' with value '{value}': {reason}")]
pub struct DecodeError {
    pub param: String,
    pub value: String,
    pub reason: String,
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by the backing record store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Connection error
    #[error("Failed to connect to {backend}: {message}")]
    Connection { backend: String, message: String },

    /// The request did not complete in time
    #[error("{backend} request timed out after {}ms", .after.as_millis())]
    Timeout { backend: String, after: Duration },

    /// The backend refused the request because of its rate limits
    #[error("{backend} rate limit exceeded")]
    RateLimited {
        backend: String,
        retry_after: Option<Duration>,
    },

    /// A record addressed by id does not exist
    #[error("Record '{id}' not found in table '{table}'")]
    NotFound { table: String, id: String },

    /// The backend rejected the query
    #[error("{backend} query error: {message}")]
    Query { backend: String, message: String },
}

impl StoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Connection { .. } => StatusCode::BAD_GATEWAY,
            StoreError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            StoreError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Query { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Connection { .. } => "STORE_CONNECTION_ERROR",
            StoreError::Timeout { .. } => "STORE_TIMEOUT",
            StoreError::RateLimited { .. } => "STORE_RATE_LIMITED",
            StoreError::NotFound { .. } => "RECORD_NOT_FOUND",
            StoreError::Query { .. } => "STORE_QUERY_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Connection { .. } | StoreError::Timeout { .. } | StoreError::RateLimited { .. }
        )
    }
}

// =============================================================================
// Cache Errors
// =============================================================================

/// Errors raised by a cache backend
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache backend '{backend}' unavailable: {message}")]
    Unavailable { backend: String, message: String },

    #[error("Failed to (de)serialize cache entry '{key}': {message}")]
    Serialization { key: String, message: String },

    #[error("Cache lock poisoned: {0}")]
    Poisoned(String),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error reading '{path}': {message}")]
    Io { path: String, message: String },
}
