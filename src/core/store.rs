//! Backing record store interface
//!
//! The pipeline never talks to a concrete backend. An Airtable client, a SQL
//! table or the in-memory store implement [`RecordStore`]; each uses the part
//! of [`SelectQuery`] its query language understands (the formula string or
//! the structured query).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::StoreError;
use crate::query::database::DatabaseQuery;

/// A record as returned by the store: an id plus its field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Everything a store needs to answer one filtered listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectQuery {
    /// Formula in the record store's filter language (empty = no filter)
    pub filter_formula: String,

    /// The same filters as a structured query, including the mapped sort
    pub query: DatabaseQuery,

    /// Page number (starts at 1)
    pub page: u32,

    /// Page size
    pub limit: u32,
}

/// One page of records plus the total number of matches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub total: u64,
}

/// The external system that stores and serves records
///
/// Implementations perform their own retries, if any. A failure is returned
/// as a [`StoreError`] and is never cached by the pipeline.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Select one page of records matching the query
    async fn select(&self, table: &str, query: &SelectQuery) -> Result<RecordPage, StoreError>;

    /// Update fields of one record, returning the updated record
    async fn update(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, StoreError>;
}
