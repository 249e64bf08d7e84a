//! Server startup: reconciler wiring, shared state, and the poller task.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

use hydrosync_core::Config;
use hydrosync_reconcile::{NotificationBus, PgStore, Poller, ProcessLauncher, Reconciler};

use crate::state::AppState;

/// Wire the PostgreSQL store and the process launcher into a reconciler.
pub fn build_reconciler(config: &Config, pool: PgPool, bus: NotificationBus) -> anyhow::Result<Reconciler> {
    let store = PgStore::new(pool, &config.poller).context("invalid poller table configuration")?;
    let launcher = ProcessLauncher::from_config(&config.pipeline);
    info!(
        program = %config.pipeline.program,
        raw_table = %config.poller.raw_table,
        output_table = %config.poller.output_table,
        "reconciler ready"
    );
    Ok(Reconciler::new(Arc::new(store), Arc::new(launcher), bus))
}

/// Handles needed after startup to stop the poller cleanly.
pub struct PollerTask {
    pub shutdown: Arc<Notify>,
    pub handle: JoinHandle<()>,
}

impl PollerTask {
    pub async fn stop(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            tracing::error!("Poller task ended abnormally: {}", e);
        }
    }
}

/// Build `AppState` and spawn the poller that serves it.
pub fn start(config: &Config, pool: PgPool) -> anyhow::Result<(Arc<AppState>, PollerTask)> {
    let bus = NotificationBus::new();
    let reconciler = build_reconciler(config, pool.clone(), bus.clone())?;
    let poller = Poller::from_config(reconciler, &config.poller);

    let state = Arc::new(AppState {
        pg_pool: pool,
        bus,
        trigger: poller.trigger_handle(),
        config: config.clone(),
    });

    let shutdown = Arc::new(Notify::new());
    let handle = tokio::spawn(poller.run(shutdown.clone()));

    Ok((state, PollerTask { shutdown, handle }))
}
