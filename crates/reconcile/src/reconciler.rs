//! One reconciliation pass: diff, then dispatch and notify per missing key.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::bus::NotificationBus;
use crate::diff::DiffEngine;
use crate::dispatcher::{JobDispatcher, JobLauncher};
use crate::error::StoreError;
use crate::store::Store;

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassTrigger {
    Scheduled,
    Manual,
}

impl fmt::Display for PassTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Summary of a pass that got past the diff.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub trigger: PassTrigger,
    /// Missing keys found by the diff.
    pub found: usize,
    /// Keys whose computation was started (one notification each).
    pub dispatched: usize,
    /// Keys whose process could not be spawned.
    pub failed: usize,
    pub elapsed: Duration,
}

/// Runs the pipeline for one pass. Holds no guard; single-flight is the
/// poller's job.
#[derive(Clone)]
pub struct Reconciler {
    diff: DiffEngine,
    dispatcher: JobDispatcher,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, launcher: Arc<dyn JobLauncher>, bus: NotificationBus) -> Self {
        Self {
            diff: DiffEngine::new(store),
            dispatcher: JobDispatcher::new(launcher, bus),
        }
    }

    pub fn bus(&self) -> &NotificationBus {
        self.dispatcher.bus()
    }

    pub fn diff(&self) -> &DiffEngine {
        &self.diff
    }

    /// Diff the store, then for each missing key in ascending order start its
    /// computation and notify. A store failure aborts before any dispatch; a
    /// spawn failure only skips that key.
    pub async fn run_pass(&self, trigger: PassTrigger) -> Result<PassReport, StoreError> {
        let started = Instant::now();
        info!(%trigger, store = self.diff.store_name(), "checking for new data");

        let missing = match self.diff.missing().await {
            Ok(items) => items,
            Err(e) => {
                warn!(%trigger, error = %e, "missing-key query failed, pass aborted");
                return Err(e);
            }
        };

        if missing.is_empty() {
            info!("no missing combinations");
        } else {
            info!(count = missing.len(), "found new combinations to process");
        }

        let mut report = PassReport {
            trigger,
            found: missing.len(),
            dispatched: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        };

        for item in missing {
            match self.dispatcher.dispatch(item) {
                Ok(()) => report.dispatched += 1,
                Err(e) => {
                    warn!(
                        machine_id = item.machine_id,
                        cycle_id = item.cycle_id,
                        error = %e,
                        "pipeline spawn failed, continuing with next key"
                    );
                    report.failed += 1;
                }
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }
}
