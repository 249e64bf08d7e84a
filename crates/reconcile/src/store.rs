//! Store seam: where raw readings and computed outputs live.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use hydrosync_core::config::{is_sql_identifier, PollerConfig};
use hydrosync_core::{ConfigError, WorkItem};

use crate::diff::missing_keys;
use crate::error::StoreError;

/// Read-only access to the raw-readings and outputs relations.
///
/// Implementations must not mutate either relation. Row order is not part
/// of the contract; the diff engine sorts.
#[async_trait]
pub trait Store: Send + Sync {
    /// Keys with raw readings but no output row.
    async fn find_missing(&self) -> Result<Vec<WorkItem>, StoreError>;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;
}

// ── PostgreSQL ───────────────────────────────────────────────────────

/// PostgreSQL-backed store. The anti-join runs server-side in one statement,
/// so both relations are read under the same snapshot.
pub struct PgStore {
    pool: PgPool,
    query: String,
}

impl PgStore {
    pub fn new(pool: PgPool, poller: &PollerConfig) -> Result<Self, ConfigError> {
        for (key, table) in [("RAW_TABLE", &poller.raw_table), ("OUTPUT_TABLE", &poller.output_table)] {
            if !is_sql_identifier(table) {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("'{}' is not a plain SQL identifier", table),
                });
            }
        }
        Ok(Self {
            pool,
            query: missing_keys_sql(&poller.raw_table, &poller.output_table),
        })
    }
}

fn missing_keys_sql(raw_table: &str, output_table: &str) -> String {
    format!(
        "SELECT DISTINCT r.machine_id::bigint AS machine_id, r.cycle_id::bigint AS cycle_id \
         FROM {raw} r \
         WHERE r.machine_id IS NOT NULL AND r.cycle_id IS NOT NULL \
           AND NOT EXISTS ( \
             SELECT 1 FROM {out} o \
             WHERE o.machine_id = r.machine_id AND o.cycle_id = r.cycle_id \
           ) \
         ORDER BY machine_id ASC, cycle_id ASC",
        raw = raw_table,
        out = output_table,
    )
}

#[async_trait]
impl Store for PgStore {
    async fn find_missing(&self) -> Result<Vec<WorkItem>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(&self.query)
            .fetch_all(&self.pool)
            .await?;
        debug!(rows = rows.len(), "missing-key query returned");
        Ok(rows.into_iter().map(WorkItem::from).collect())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

// ── In-memory ────────────────────────────────────────────────────────

/// In-memory store. Raw readings may repeat a key (one row per sample);
/// outputs hold at most one row per key.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryRelations>,
}

#[derive(Default)]
struct MemoryRelations {
    raw: Vec<WorkItem>,
    outputs: BTreeSet<WorkItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(
        raw: impl IntoIterator<Item = WorkItem>,
        outputs: impl IntoIterator<Item = WorkItem>,
    ) -> Self {
        Self {
            inner: Mutex::new(MemoryRelations {
                raw: raw.into_iter().collect(),
                outputs: outputs.into_iter().collect(),
            }),
        }
    }

    pub fn insert_raw(&self, item: WorkItem) {
        self.inner.lock().expect("memory store lock poisoned").raw.push(item);
    }

    pub fn insert_output(&self, item: WorkItem) {
        self.inner.lock().expect("memory store lock poisoned").outputs.insert(item);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_missing(&self) -> Result<Vec<WorkItem>, StoreError> {
        let relations = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(missing_keys(&relations.raw, &relations.outputs))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
