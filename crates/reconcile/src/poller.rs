//! Poller actor: reconciliation timer, heartbeat timer, manual trigger.
//!
//! A single task owns the [`DispatchGuard`]. Passes run on their own task so
//! the actor keeps serving ticks and triggers while a pass is in flight;
//! those attempts hit the guard and are dropped. When the pass task ends,
//! whether with a report, a store error, or a panic, the actor releases the
//! guard.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use hydrosync_core::config::PollerConfig;

use crate::error::StoreError;
use crate::guard::DispatchGuard;
use crate::reconciler::{PassReport, PassTrigger, Reconciler};

type PassHandle = JoinHandle<Result<PassReport, StoreError>>;

/// Outcome of a manual trigger request. Never reflects the pass result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAck {
    /// Handed to the poller; it will attempt a pass subject to the guard.
    Requested,
    /// A request is already waiting for the poller; this one was dropped.
    AlreadyPending,
    /// The poller is no longer running.
    PollerStopped,
}

/// Cheap handle for requesting an immediate pass.
#[derive(Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<PassTrigger>,
}

impl TriggerHandle {
    /// Ask for a pass now. Returns immediately without waiting for the pass.
    pub fn request(&self) -> TriggerAck {
        match self.tx.try_send(PassTrigger::Manual) {
            Ok(()) => TriggerAck::Requested,
            Err(mpsc::error::TrySendError::Full(_)) => TriggerAck::AlreadyPending,
            Err(mpsc::error::TrySendError::Closed(_)) => TriggerAck::PollerStopped,
        }
    }
}

pub struct Poller {
    reconciler: Reconciler,
    reconcile_interval: Duration,
    heartbeat_interval: Duration,
    trigger_tx: mpsc::Sender<PassTrigger>,
    trigger_rx: mpsc::Receiver<PassTrigger>,
}

impl Poller {
    pub fn new(reconciler: Reconciler, reconcile_interval: Duration, heartbeat_interval: Duration) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        Self {
            reconciler,
            reconcile_interval,
            heartbeat_interval,
            trigger_tx,
            trigger_rx,
        }
    }

    pub fn from_config(reconciler: Reconciler, config: &PollerConfig) -> Self {
        Self::new(reconciler, config.reconcile_interval(), config.heartbeat_interval())
    }

    pub fn trigger_handle(&self) -> TriggerHandle {
        TriggerHandle {
            tx: self.trigger_tx.clone(),
        }
    }

    /// Run until `shutdown` is notified. The first reconciliation tick fires
    /// immediately; the first heartbeat fires one period after start. A pass
    /// still running at shutdown is left to finish on its own.
    pub async fn run(self, shutdown: Arc<Notify>) {
        let Poller {
            reconciler,
            reconcile_interval,
            heartbeat_interval,
            trigger_tx,
            mut trigger_rx,
        } = self;
        // The actor keeps one sender so the channel never reports closed
        // while it is running.
        let _trigger_tx = trigger_tx;

        let mut guard = DispatchGuard::new();
        let mut in_flight: Option<PassHandle> = None;

        let mut reconcile_ticker = time::interval(reconcile_interval);
        reconcile_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut heartbeat_ticker =
            time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown_signal = shutdown.notified();
        tokio::pin!(shutdown_signal);

        info!(
            reconcile_secs = reconcile_interval.as_secs_f64(),
            heartbeat_secs = heartbeat_interval.as_secs_f64(),
            "poller started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown_signal => {
                    info!(pass_in_flight = in_flight.is_some(), "poller stopping");
                    break;
                }
                _ = reconcile_ticker.tick() => {
                    attempt_pass(&reconciler, PassTrigger::Scheduled, &mut guard, &mut in_flight);
                }
                Some(trigger) = trigger_rx.recv() => {
                    attempt_pass(&reconciler, trigger, &mut guard, &mut in_flight);
                }
                _ = heartbeat_ticker.tick() => {
                    let reached = reconciler.bus().broadcast();
                    debug!(subscribers = reached, "heartbeat sent");
                }
                joined = join_pass(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    guard.exit();
                    log_pass_outcome(joined);
                }
            }
        }
    }
}

/// Admit or drop one pass attempt.
fn attempt_pass(
    reconciler: &Reconciler,
    trigger: PassTrigger,
    guard: &mut DispatchGuard,
    in_flight: &mut Option<PassHandle>,
) {
    if !guard.try_enter() {
        debug!(%trigger, "previous pass still processing, skipping this check");
        return;
    }
    let reconciler = reconciler.clone();
    *in_flight = Some(tokio::spawn(async move { reconciler.run_pass(trigger).await }));
}

async fn join_pass(in_flight: &mut Option<PassHandle>) -> Result<Result<PassReport, StoreError>, JoinError> {
    match in_flight.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn log_pass_outcome(joined: Result<Result<PassReport, StoreError>, JoinError>) {
    match joined {
        Ok(Ok(report)) => info!(
            trigger = %report.trigger,
            found = report.found,
            dispatched = report.dispatched,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "pass complete"
        ),
        // Already logged by the reconciler; the next tick retries from scratch.
        Ok(Err(_)) => debug!("pass ended with store error"),
        Err(e) => error!(error = %e, "pass task panicked"),
    }
}
