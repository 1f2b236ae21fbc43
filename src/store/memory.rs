//! In-memory store for tests and local runs.
//!
//! Mirrors the DynamoDB behaviors the service relies on: tables start in
//! CREATING, duplicate creates are rejected, puts replace by `id`, and
//! requests against a missing table fail. Failures and latency can be
//! injected through [`MemoryStoreConfig`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{ItemStore, TableDefinition, TableStatus, WriteAck};
use crate::error::StoreError;
use crate::item::Item;

/// Configuration for in-memory store behavior.
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreConfig {
    /// Number of describe calls a new table stays in CREATING.
    pub describes_until_active: u32,
    /// Whether to fail describe requests.
    pub fail_describe: bool,
    /// Whether to fail create requests.
    pub fail_create: bool,
    /// Whether to fail put requests.
    pub fail_put: bool,
    /// Whether to fail scan requests.
    pub fail_scan: bool,
    /// Simulated latency per request in milliseconds.
    pub latency_ms: u64,
}

#[derive(Debug)]
struct MemoryTable {
    status: TableStatus,
    describes_until_active: u32,
    items: BTreeMap<String, Item>,
}

/// Call counters, for asserting on store traffic.
#[derive(Debug, Default)]
pub struct CallCounts {
    describes: AtomicUsize,
    creates: AtomicUsize,
    tables_created: AtomicUsize,
    puts: AtomicUsize,
    scans: AtomicUsize,
}

impl CallCounts {
    /// Describe requests received.
    pub fn describes(&self) -> usize {
        self.describes.load(Ordering::SeqCst)
    }

    /// Create requests received.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Create requests that actually created a table.
    pub fn tables_created(&self) -> usize {
        self.tables_created.load(Ordering::SeqCst)
    }

    /// Put requests received.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Scan requests received.
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

/// In-memory [`ItemStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    config: MemoryStoreConfig,
    tables: Arc<DashMap<String, MemoryTable>>,
    calls: Arc<CallCounts>,
}

impl MemoryStore {
    /// Create an empty store with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom configuration.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Add an ACTIVE table directly, bypassing create.
    pub fn with_active_table(self, name: &str) -> Self {
        self.insert_table(name, TableStatus::Active);
        self
    }

    /// Add a table in an arbitrary state.
    ///
    /// A CREATING table follows `describes_until_active` like a created one.
    pub fn insert_table(&self, name: &str, status: TableStatus) {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                status,
                describes_until_active: self.config.describes_until_active,
                items: BTreeMap::new(),
            },
        );
    }

    /// Status of a table, without counting as a describe call.
    pub fn table_status(&self, name: &str) -> Option<TableStatus> {
        self.tables.get(name).map(|t| t.status.clone())
    }

    /// Number of items in a table, zero if it does not exist.
    pub fn item_count(&self, name: &str) -> usize {
        self.tables.get(name).map(|t| t.items.len()).unwrap_or(0)
    }

    /// Store traffic so far.
    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn injected(operation: &'static str) -> StoreError {
        StoreError::Service {
            operation,
            code: Some("InternalServerError".to_string()),
            message: format!("injected {} failure", operation),
        }
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn describe_table(&self, table: &str) -> Result<Option<TableStatus>, StoreError> {
        self.calls.describes.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.config.fail_describe {
            return Err(Self::injected("DescribeTable"));
        }

        let Some(mut entry) = self.tables.get_mut(table) else {
            return Ok(None);
        };

        if entry.status.is_pending() {
            if entry.describes_until_active == 0 {
                entry.status = TableStatus::Active;
            } else {
                entry.describes_until_active -= 1;
            }
        }

        Ok(Some(entry.status.clone()))
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<(), StoreError> {
        self.calls.creates.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.config.fail_create {
            return Err(Self::injected("CreateTable"));
        }

        match self.tables.entry(definition.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::TableAlreadyExists {
                table: definition.name.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(MemoryTable {
                    status: TableStatus::Creating,
                    describes_until_active: self.config.describes_until_active,
                    items: BTreeMap::new(),
                });
                self.calls.tables_created.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn put_item(&self, table: &str, item: &Item) -> Result<WriteAck, StoreError> {
        let request = self.calls.puts.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;

        if self.config.fail_put {
            return Err(Self::injected("PutItem"));
        }

        match self.tables.get_mut(table) {
            Some(mut t) if t.status.is_usable() => {
                t.items.insert(item.id().to_string(), item.clone());
                Ok(WriteAck {
                    request_id: Some(format!("memory-{}", request)),
                    consumed_capacity_units: Some(1.0),
                })
            }
            _ => Err(StoreError::TableNotFound {
                table: table.to_string(),
            }),
        }
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        self.calls.scans.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.config.fail_scan {
            return Err(Self::injected("Scan"));
        }

        match self.tables.get(table) {
            Some(t) if t.status.is_usable() => Ok(t.items.values().cloned().collect()),
            _ => Err(StoreError::TableNotFound {
                table: table.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Item {
        Item::try_from(value).unwrap()
    }

    #[tokio::test]
    async fn missing_table_describes_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.describe_table("t1").await.unwrap(), None);
        assert_eq!(store.calls().describes(), 1);
    }

    #[tokio::test]
    async fn created_table_becomes_active_after_describes() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            describes_until_active: 2,
            ..Default::default()
        });
        store.create_table(&TableDefinition::new("t1")).await.unwrap();

        assert_eq!(store.describe_table("t1").await.unwrap(), Some(TableStatus::Creating));
        assert_eq!(store.describe_table("t1").await.unwrap(), Some(TableStatus::Creating));
        assert_eq!(store.describe_table("t1").await.unwrap(), Some(TableStatus::Active));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryStore::new();
        store.create_table(&TableDefinition::new("t1")).await.unwrap();

        let err = store.create_table(&TableDefinition::new("t1")).await.unwrap_err();
        assert!(matches!(err, StoreError::TableAlreadyExists { .. }));
        assert_eq!(store.calls().creates(), 2);
        assert_eq!(store.calls().tables_created(), 1);
    }

    #[tokio::test]
    async fn put_replaces_by_id() {
        let store = MemoryStore::new().with_active_table("t1");
        store.put_item("t1", &item(json!({"id": "a", "v": 1}))).await.unwrap();
        store.put_item("t1", &item(json!({"id": "a", "v": 2}))).await.unwrap();

        let items = store.scan("t1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get("v"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn requests_against_creating_table_fail() {
        let store = MemoryStore::new();
        store.insert_table("t1", TableStatus::Creating);

        assert!(store.scan("t1").await.is_err());
        assert!(store.put_item("t1", &item(json!({"id": "a"}))).await.is_err());
    }

    #[tokio::test]
    async fn injected_failures_report_store_code() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            fail_scan: true,
            ..Default::default()
        })
        .with_active_table("t1");

        let err = store.scan("t1").await.unwrap_err();
        assert_eq!(err.code(), "InternalServerError");
    }
}
