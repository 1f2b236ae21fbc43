//! Sample item generation and seeding.
//!
//! Ids combine a wall-clock timestamp with a per-generator counter, the same
//! scheme the browser script uses.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Number, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::client::ItemsClient;
use crate::error::StoreError;
use crate::guard::TableGuard;
use crate::item::Item;
use crate::store::ItemStore;
use crate::utils::unix_millis;

/// Generator of sample items with unique, increasing ids.
#[derive(Debug, Clone)]
pub struct SampleItems {
    source: String,
    counter: u64,
}

impl SampleItems {
    /// Create a generator whose ids start with `item-<source>-`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            counter: 0,
        }
    }

    /// Number of items generated so far.
    pub fn generated(&self) -> u64 {
        self.counter
    }

    /// Price of the `n`th item: 100.00 plus 0.50 per item.
    pub fn price_for(n: u64) -> Decimal {
        Decimal::new(10_000, 2) + Decimal::new(50, 2) * Decimal::from(n)
    }

    /// Generate the next item.
    pub fn next_item(&mut self) -> Item {
        self.counter += 1;
        let n = self.counter;

        let id = format!("item-{}-{}-{}", self.source, unix_millis(), n);
        let price = Self::price_for(n)
            .to_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        let created_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();

        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(format!("Sample product {}", n)));
        fields.insert(
            "description".to_string(),
            json!(format!("Item number {} sent from the {} seeder.", n, self.source)),
        );
        fields.insert("price".to_string(), price);
        fields.insert("quantity".to_string(), json!(n * 7 % 100 + 1));
        fields.insert("createdAt".to_string(), json!(created_at));

        Item::from_generated(id, fields)
    }
}

/// Result of seeding one item.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedOutcome {
    /// Item id.
    pub id: String,
    /// Failure message, if the item was not stored.
    pub error: Option<String>,
}

impl SeedOutcome {
    /// Whether the item was stored.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Create `count` items through the HTTP API, continuing past failures.
pub async fn seed_via_api(
    client: &ItemsClient,
    generator: &mut SampleItems,
    count: usize,
) -> Vec<SeedOutcome> {
    let mut outcomes = Vec::with_capacity(count);

    for _ in 0..count {
        let item = generator.next_item();
        let id = item.id().to_string();
        match client.create_item(&item).await {
            Ok(_) => {
                info!(id = %id, "Item sent");
                outcomes.push(SeedOutcome { id, error: None });
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to send item");
                outcomes.push(SeedOutcome {
                    id,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    outcomes
}

/// Create `count` items directly in the store.
///
/// Fails before writing anything if the table cannot be provisioned;
/// individual write failures are recorded and seeding continues.
pub async fn seed_direct(
    store: &dyn ItemStore,
    guard: &TableGuard,
    generator: &mut SampleItems,
    count: usize,
) -> Result<Vec<SeedOutcome>, StoreError> {
    guard.ensure(store).await.inspect_err(|e| {
        error!(code = e.code(), error = %e, "Could not ensure table exists, no items sent");
    })?;

    let mut outcomes = Vec::with_capacity(count);
    for _ in 0..count {
        let item = generator.next_item();
        let id = item.id().to_string();
        match store.put_item(guard.table_name(), &item).await {
            Ok(ack) => {
                info!(id = %id, request_id = ?ack.request_id, "Item stored");
                outcomes.push(SeedOutcome { id, error: None });
            }
            Err(e) => {
                error!(id = %id, code = e.code(), error = %e, "Failed to store item");
                outcomes.push(SeedOutcome {
                    id,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::WaitPolicy;
    use crate::store::{MemoryStore, MemoryStoreConfig, TableDefinition};
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn prices_step_by_fifty_cents() {
        assert_eq!(SampleItems::price_for(1), dec!(100.50));
        assert_eq!(SampleItems::price_for(4), dec!(102.00));
    }

    #[test]
    fn ids_are_unique_and_counted() {
        let mut generator = SampleItems::new("cli");
        let ids: HashSet<String> = (0..20).map(|_| generator.next_item().id().to_string()).collect();

        assert_eq!(ids.len(), 20);
        assert_eq!(generator.generated(), 20);
        assert!(ids.iter().all(|id| id.starts_with("item-cli-")));
    }

    #[test]
    fn generated_item_has_sample_fields() {
        let item = SampleItems::new("cli").next_item();

        assert!(item.id().ends_with("-1"));
        assert_eq!(item.get("price"), Some(&json!(100.5)));
        assert_eq!(item.get("name"), Some(&json!("Sample product 1")));
        assert!(item.get("createdAt").and_then(Value::as_str).is_some());
    }

    #[tokio::test]
    async fn seed_direct_writes_every_item() {
        let store = MemoryStore::new();
        let guard = TableGuard::new(TableDefinition::new("seed-test"), WaitPolicy::default());
        let mut generator = SampleItems::new("cli");

        let outcomes = seed_direct(&store, &guard, &mut generator, 5).await.unwrap();

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(SeedOutcome::is_ok));
        assert_eq!(store.item_count("seed-test"), 5);
    }

    #[tokio::test]
    async fn seed_direct_stops_when_table_unavailable() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            fail_create: true,
            ..Default::default()
        });
        let guard = TableGuard::new(TableDefinition::new("seed-test"), WaitPolicy::default());
        let mut generator = SampleItems::new("cli");

        assert!(seed_direct(&store, &guard, &mut generator, 5).await.is_err());
        assert_eq!(store.calls().puts(), 0);
        assert_eq!(generator.generated(), 0);
    }

    #[tokio::test]
    async fn seed_direct_records_write_failures() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            fail_put: true,
            ..Default::default()
        })
        .with_active_table("seed-test");
        let guard = TableGuard::new(TableDefinition::new("seed-test"), WaitPolicy::default());
        let mut generator = SampleItems::new("cli");

        let outcomes = seed_direct(&store, &guard, &mut generator, 3).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| !o.is_ok()));
    }
}
