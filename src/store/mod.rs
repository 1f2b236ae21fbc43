//! Key-value store access.
//!
//! This module handles:
//! - The [`ItemStore`] seam used by the guard and the HTTP handlers
//! - DynamoDB client ([`DynamoStore`])
//! - In-memory store with fault injection for tests ([`MemoryStore`])

pub mod convert;
pub mod dynamo;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::StoreError;
use crate::item::Item;

pub use dynamo::DynamoStore;
pub use memory::{MemoryStore, MemoryStoreConfig};

/// Lifecycle state of a table as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    /// Being created.
    Creating,
    /// Ready for reads and writes.
    Active,
    /// Settings change in progress; still serves requests.
    Updating,
    /// Being deleted.
    Deleting,
    /// Being archived.
    Archiving,
    /// Archived.
    Archived,
    /// Encryption key unavailable.
    InaccessibleEncryptionCredentials,
    /// A status this crate does not know about.
    #[strum(default)]
    Other(String),
}

impl TableStatus {
    /// Whether puts and scans can be served.
    pub fn is_usable(&self) -> bool {
        matches!(self, TableStatus::Active | TableStatus::Updating)
    }

    /// Whether the table is on its way to becoming usable.
    pub fn is_pending(&self) -> bool {
        matches!(self, TableStatus::Creating)
    }
}

/// Shape of the backing table.
///
/// The hash key is always the string attribute [`crate::item::PRIMARY_KEY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Provisioned read capacity units.
    pub read_capacity: i64,
    /// Provisioned write capacity units.
    pub write_capacity: i64,
}

impl TableDefinition {
    /// Definition with the default 5/5 throughput.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_capacity: 5,
            write_capacity: 5,
        }
    }
}

/// Store acknowledgment of a write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteAck {
    /// Request id assigned by the store.
    pub request_id: Option<String>,
    /// Capacity units consumed, when the store reports them.
    pub consumed_capacity_units: Option<f64>,
}

/// Operations the service needs from the key-value store.
#[async_trait]
pub trait ItemStore: Send + Sync + std::fmt::Debug {
    /// Current table status, or `None` if the table does not exist.
    async fn describe_table(&self, table: &str) -> Result<Option<TableStatus>, StoreError>;

    /// Start creating a table.
    ///
    /// Returns [`StoreError::TableAlreadyExists`] if the name is taken.
    async fn create_table(&self, definition: &TableDefinition) -> Result<(), StoreError>;

    /// Insert or replace an item.
    async fn put_item(&self, table: &str, item: &Item) -> Result<WriteAck, StoreError>;

    /// Every item in the table, in store order.
    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError>;
}
