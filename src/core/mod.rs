//! Core module containing the filter state, its codec and the pipeline service

pub mod codec;
pub mod error;
pub mod extractors;
pub mod field;
pub mod service;
pub mod state;
pub mod store;
pub mod validation;

pub use codec::{FilterCodec, UrlParams, decode_filters_from_url, encode_filters_to_url};
pub use error::{
    CacheError, ConfigError, DecodeError, FieldValidationError, FilterError, StoreError,
    ValidationError,
};
pub use extractors::FilterQuery;
pub use field::{FieldKind, FieldRegistry, FilterValue};
pub use service::FilterService;
pub use state::{
    DateRange, FieldRef, FilterState, NumericRange, Pagination, SortDirection, Sorting, UserFilter,
};
pub use store::{Record, RecordPage, RecordStore, SelectQuery};
pub use validation::{
    FieldRule, FilterValidation, ValidationResult, sanitize_filter_state, validate_filter_state,
};
