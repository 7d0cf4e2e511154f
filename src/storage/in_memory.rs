//! In-memory implementation of RecordStore for testing and development

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::core::error::StoreError;
use crate::core::store::{Record, RecordPage, RecordStore, SelectQuery};

const BACKEND: &str = "in_memory";

/// In-memory record store
///
/// Evaluates the structured part of each [`SelectQuery`] (the formula string
/// is recorded but not interpreted). Every received query is logged, and a
/// failure can be injected for the next call. Cloning shares all state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<HashMap<String, Vec<Record>>>>,
    selects: Arc<RwLock<Vec<(String, SelectQuery)>>>,
    next_failure: Arc<Mutex<Option<StoreError>>>,
    latency: Option<Duration>,
}

impl InMemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call, to exercise concurrent requests
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a record to a table
    pub fn insert(&self, table: &str, record: Record) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(lock_error)?;
        tables.entry(table.to_string()).or_default().push(record);
        Ok(())
    }

    /// Add several records to a table
    pub fn insert_all<I>(&self, table: &str, records: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut tables = self.tables.write().map_err(lock_error)?;
        tables.entry(table.to_string()).or_default().extend(records);
        Ok(())
    }

    /// Make the next `select` or `update` fail with `error`
    pub fn fail_next(&self, error: StoreError) {
        if let Ok(mut slot) = self.next_failure.lock() {
            *slot = Some(error);
        }
    }

    /// Every `(table, query)` received by `select`, oldest first
    pub fn selects(&self) -> Vec<(String, SelectQuery)> {
        self.selects
            .read()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Number of `select` calls received
    pub fn select_count(&self) -> usize {
        self.selects.read().map(|log| log.len()).unwrap_or_default()
    }

    async fn before_call(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self.next_failure.lock().map_err(lock_error)?.take();
        match injected {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Connection {
        backend: BACKEND.to_string(),
        message: format!("Failed to acquire lock: {}", e),
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn select(&self, table: &str, query: &SelectQuery) -> Result<RecordPage, StoreError> {
        self.selects
            .write()
            .map_err(lock_error)?
            .push((table.to_string(), query.clone()));

        self.before_call().await?;

        let mut matched: Vec<Record> = {
            let tables = self.tables.read().map_err(lock_error)?;
            tables
                .get(table)
                .map(|records| {
                    records
                        .iter()
                        .filter(|r| query.query.matches(r))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        query.query.sort_records(&mut matched);

        let total = matched.len() as u64;
        let limit = query.limit.max(1) as usize;
        let offset = (query.page.max(1) as usize - 1) * limit;
        let records = matched.into_iter().skip(offset).take(limit).collect();

        Ok(RecordPage { records, total })
    }

    async fn update(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        self.before_call().await?;

        let mut tables = self.tables.write().map_err(lock_error)?;
        let record = tables
            .get_mut(table)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: record_id.to_string(),
            })?;

        record.fields.extend(fields);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{FilterState, Sorting};
    use crate::query::database::build_database_query;
    use serde_json::json;

    fn store() -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new();
        store
            .insert_all(
                "Tasks",
                (1..=5).map(|i| {
                    let status = if i % 2 == 0 { "done" } else { "active" };
                    Record::new(format!("rec{}", i), json!({ "Name": format!("Task {}", i), "Status": status }))
                }),
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_select_filters_sorts_and_paginates() {
        let store = store();
        let mut query = build_database_query(&FilterState::new().with_status(["active"]));
        query.sort = Some(Sorting::desc("Name"));
        let select = SelectQuery {
            filter_formula: "{Status}='active'".to_string(),
            query,
            page: 1,
            limit: 2,
        };

        let page = store.select("Tasks", &select).await.unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rec5", "rec3"]);

        assert_eq!(store.select_count(), 1);
        assert_eq!(store.selects()[0].1.filter_formula, "{Status}='active'");
    }

    #[tokio::test]
    async fn test_select_unknown_table_is_empty() {
        let page = store()
            .select("Missing", &SelectQuery { page: 1, limit: 20, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page, RecordPage::default());
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let store = store();
        store.fail_next(StoreError::Timeout {
            backend: "airtable".to_string(),
            after: Duration::from_secs(10),
        });

        let query = SelectQuery { page: 1, limit: 20, ..Default::default() };
        assert!(matches!(
            store.select("Tasks", &query).await,
            Err(StoreError::Timeout { .. })
        ));
        assert!(store.select("Tasks", &query).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = store();
        let mut fields = Map::new();
        fields.insert("Status".to_string(), json!("done"));

        let updated = store.update("Tasks", "rec1", fields.clone()).await.unwrap();
        assert_eq!(updated.get("Status"), Some(&json!("done")));
        assert_eq!(updated.get("Name"), Some(&json!("Task 1")));

        assert!(matches!(
            store.update("Tasks", "missing", fields).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
