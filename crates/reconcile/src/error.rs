//! Reconciliation error types.

use std::path::PathBuf;

use hydrosync_core::WorkItem;
use thiserror::Error;

/// The missing-key query could not be answered. Aborts the whole pass.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The external computation for one key could not be started.
/// Never aborts a pass; the key stays missing and is retried next pass.
#[derive(Debug, Error)]
#[error("failed to spawn {} for {item}: {source}", .program.display())]
pub struct DispatchSpawnError {
    pub item: WorkItem,
    pub program: PathBuf,
    #[source]
    pub source: std::io::Error,
}
