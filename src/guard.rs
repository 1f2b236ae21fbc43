//! Table-existence guard.
//!
//! Makes sure the backing table exists and is ACTIVE before the handlers
//! touch it. Provisioning runs once per process: after the first success a
//! readiness flag short-circuits every later call. Until then, callers are
//! serialized on a mutex so one process issues at most one create at a time;
//! a create that loses a race with another process is treated as success.
//! Callers that queue behind a failing attempt receive its error rather than
//! starting a fresh wait, so no caller blocks longer than one wait policy.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::metrics;
use crate::store::{ItemStore, TableDefinition, TableStatus};

/// How long to wait for a table to become ACTIVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between describe calls.
    pub poll_interval: Duration,
    /// Give up after this long.
    pub max_wait: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(180),
        }
    }
}

/// One-time provisioning guard for the backing table.
#[derive(Debug)]
pub struct TableGuard {
    definition: TableDefinition,
    wait: WaitPolicy,
    ready: AtomicBool,
    /// Completed provisioning attempts.
    attempts: AtomicU64,
    /// Held while an attempt runs; keeps the last attempt's error.
    provisioning: Mutex<Option<StoreError>>,
}

impl TableGuard {
    /// Create a guard that has not verified the table yet.
    pub fn new(definition: TableDefinition, wait: WaitPolicy) -> Self {
        Self {
            definition,
            wait,
            ready: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            provisioning: Mutex::new(None),
        }
    }

    /// Name of the guarded table.
    pub fn table_name(&self) -> &str {
        &self.definition.name
    }

    /// Whether the table has been verified.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Make sure the table is usable, provisioning it if needed.
    ///
    /// Returns immediately once a previous call has succeeded. A caller that
    /// waited on the mutex while another attempt ran gets that attempt's
    /// outcome instead of running its own.
    pub async fn ensure(&self, store: &dyn ItemStore) -> Result<(), StoreError> {
        if self.is_ready() {
            return Ok(());
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut last_error = self.provisioning.lock().await;
        if self.is_ready() {
            return Ok(());
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(err) = last_error.as_ref() {
                debug!(code = err.code(), "Sharing failure of concurrent provisioning attempt");
                return Err(err.clone());
            }
        }

        let result = ensure_table(store, &self.definition, self.wait).await;
        self.attempts.fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(()) => {
                *last_error = None;
                self.ready.store(true, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                *last_error = Some(e.clone());
                Err(e)
            }
        }
    }
}

/// Check that the table exists and create it if it does not, then wait for
/// it to become ACTIVE.
#[instrument(skip(store, definition, wait), fields(table = %definition.name))]
pub async fn ensure_table(
    store: &dyn ItemStore,
    definition: &TableDefinition,
    wait: WaitPolicy,
) -> Result<(), StoreError> {
    let table = definition.name.as_str();

    match store.describe_table(table).await? {
        Some(status) if status.is_usable() => {
            info!(%status, "Table already exists");
            return Ok(());
        }
        Some(status) if status.is_pending() => {
            info!(%status, "Table is being created elsewhere, waiting for it");
        }
        Some(status) => {
            return Err(StoreError::TableUnavailable {
                table: table.to_string(),
                status,
            });
        }
        None => {
            info!("Table not found, creating it");
            match store.create_table(definition).await {
                Ok(()) => {
                    metrics::inc_tables_created();
                    info!("Table creation started, waiting for it to become active");
                }
                Err(StoreError::TableAlreadyExists { .. }) => {
                    info!("Table was created concurrently, waiting for it");
                }
                Err(e) => {
                    warn!(code = e.code(), error = %e, "Table creation failed");
                    return Err(e);
                }
            }
        }
    }

    wait_until_active(store, table, wait).await?;
    info!("Table is now active");
    Ok(())
}

/// Poll the table until it is usable or the wait policy runs out.
pub async fn wait_until_active(
    store: &dyn ItemStore,
    table: &str,
    wait: WaitPolicy,
) -> Result<(), StoreError> {
    let started = Instant::now();
    let deadline = started + wait.max_wait;

    loop {
        match store.describe_table(table).await? {
            Some(status) if status.is_usable() => return Ok(()),
            Some(status) if !status.is_pending() => {
                return Err(StoreError::TableUnavailable {
                    table: table.to_string(),
                    status,
                });
            }
            status => {
                debug!(?status, "Table not active yet");
            }
        }

        if Instant::now() + wait.poll_interval > deadline {
            return Err(StoreError::ProvisionTimeout {
                table: table.to_string(),
                waited_secs: started.elapsed().as_secs(),
            });
        }
        tokio::time::sleep(wait.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use crate::store::{MemoryStore, MemoryStoreConfig, WriteAck};

    const TABLE: &str = "dynamo-test";

    fn guard() -> TableGuard {
        TableGuard::new(TableDefinition::new(TABLE), WaitPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn creates_missing_table_and_waits() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            describes_until_active: 3,
            ..Default::default()
        });
        let guard = guard();

        guard.ensure(&store).await.unwrap();

        assert!(guard.is_ready());
        assert_eq!(store.calls().tables_created(), 1);
        assert_eq!(store.table_status(TABLE), Some(TableStatus::Active));
    }

    #[tokio::test]
    async fn existing_active_table_is_not_recreated() {
        let store = MemoryStore::new().with_active_table(TABLE);
        let guard = guard();

        guard.ensure(&store).await.unwrap();

        assert_eq!(store.calls().creates(), 0);
        assert_eq!(store.calls().describes(), 1);
    }

    #[tokio::test]
    async fn ready_guard_skips_describe() {
        let store = MemoryStore::new().with_active_table(TABLE);
        let guard = guard();

        guard.ensure(&store).await.unwrap();
        guard.ensure(&store).await.unwrap();
        guard.ensure(&store).await.unwrap();

        assert_eq!(store.calls().describes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn creating_table_is_waited_on() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            describes_until_active: 2,
            ..Default::default()
        });
        store.insert_table(TABLE, TableStatus::Creating);

        guard().ensure(&store).await.unwrap();

        assert_eq!(store.calls().creates(), 0);
        assert_eq!(store.table_status(TABLE), Some(TableStatus::Active));
    }

    #[tokio::test]
    async fn already_exists_counts_as_success() {
        // Another process created the table between our describe and create.
        #[derive(Debug)]
        struct RacingStore {
            inner: MemoryStore,
            raced: AtomicBool,
        }

        #[async_trait::async_trait]
        impl ItemStore for RacingStore {
            async fn describe_table(&self, table: &str) -> Result<Option<TableStatus>, StoreError> {
                if !self.raced.swap(true, Ordering::SeqCst) {
                    self.inner.insert_table(table, TableStatus::Active);
                    return Ok(None);
                }
                self.inner.describe_table(table).await
            }
            async fn create_table(&self, definition: &TableDefinition) -> Result<(), StoreError> {
                self.inner.create_table(definition).await
            }
            async fn put_item(&self, table: &str, item: &Item) -> Result<WriteAck, StoreError> {
                self.inner.put_item(table, item).await
            }
            async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
                self.inner.scan(table).await
            }
        }

        let store = RacingStore {
            inner: MemoryStore::new(),
            raced: AtomicBool::new(false),
        };
        let guard = guard();

        guard.ensure(&store).await.unwrap();

        assert!(guard.is_ready());
        assert_eq!(store.inner.calls().creates(), 1);
        assert_eq!(store.inner.calls().tables_created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_guards_create_once() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            latency_ms: 50,
            describes_until_active: 1,
            ..Default::default()
        });
        // Separate guards model separate processes sharing one table.
        let first = guard();
        let second = guard();

        let (a, b) = tokio::join!(first.ensure(&store), second.ensure(&store));

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(store.calls().tables_created(), 1);
        assert_eq!(store.table_status(TABLE), Some(TableStatus::Active));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_of_one_guard_share_provisioning() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            latency_ms: 50,
            ..Default::default()
        });
        let guard = guard();

        let (a, b) = tokio::join!(guard.ensure(&store), guard.ensure(&store));

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(store.calls().creates(), 1);
    }

    #[tokio::test]
    async fn create_failure_propagates_and_stays_unready() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            fail_create: true,
            ..Default::default()
        });
        let guard = guard();

        let err = guard.ensure(&store).await.unwrap_err();

        assert_eq!(err.code(), "InternalServerError");
        assert!(!guard.is_ready());
        assert_eq!(store.table_status(TABLE), None);
    }

    #[tokio::test]
    async fn describe_failure_propagates_without_create() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            fail_describe: true,
            ..Default::default()
        });

        assert!(guard().ensure(&store).await.is_err());
        assert_eq!(store.calls().creates(), 0);
    }

    #[tokio::test]
    async fn deleting_table_is_unavailable() {
        let store = MemoryStore::new();
        store.insert_table(TABLE, TableStatus::Deleting);

        let err = guard().ensure(&store).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::TableUnavailable {
                status: TableStatus::Deleting,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            describes_until_active: u32::MAX,
            ..Default::default()
        });
        let guard = TableGuard::new(
            TableDefinition::new(TABLE),
            WaitPolicy {
                poll_interval: Duration::from_secs(5),
                max_wait: Duration::from_secs(20),
            },
        );

        let err = guard.ensure(&store).await.unwrap_err();

        assert!(matches!(err, StoreError::ProvisionTimeout { .. }));
        assert!(!guard.is_ready());
        // Initial describe plus polls at 0, 5, 10, 15 and 20 seconds.
        assert_eq!(store.calls().describes(), 1 + 5);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_callers_share_a_timed_out_attempt() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            describes_until_active: u32::MAX,
            ..Default::default()
        });
        let max_wait = Duration::from_secs(20);
        let guard = TableGuard::new(
            TableDefinition::new(TABLE),
            WaitPolicy {
                poll_interval: Duration::from_secs(5),
                max_wait,
            },
        );

        let (guard, store) = (&guard, &store);
        let timed = || async move {
            let started = Instant::now();
            let result = guard.ensure(store).await;
            (result, started.elapsed())
        };
        let (a, b, c) = tokio::join!(timed(), timed(), timed());

        for (result, elapsed) in [a, b, c] {
            assert!(matches!(result, Err(StoreError::ProvisionTimeout { .. })));
            assert!(elapsed <= max_wait, "waited {:?}", elapsed);
        }
        assert_eq!(store.calls().creates(), 1);
        assert_eq!(store.calls().describes(), 1 + 5);
    }

    #[tokio::test]
    async fn failed_attempt_can_be_retried() {
        let failing = MemoryStore::with_config(MemoryStoreConfig {
            fail_describe: true,
            ..Default::default()
        });
        let healthy = MemoryStore::new().with_active_table(TABLE);
        let guard = guard();

        assert!(guard.ensure(&failing).await.is_err());
        assert!(guard.ensure(&healthy).await.is_ok());
        assert!(guard.is_ready());
    }
}
