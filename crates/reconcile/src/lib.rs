//! Reconciliation poller and dispatch.
//!
//! This crate provides:
//! - `Store` seam over the raw-readings and outputs relations (PostgreSQL and in-memory)
//! - `DiffEngine` computing the ordered set of missing (machine, cycle) keys
//! - `DispatchGuard` single-flight gate
//! - `JobDispatcher` fire-and-forget launch of the external computation
//! - `NotificationBus` stateless change-notification fan-out
//! - `Poller` actor driving passes, heartbeats, and manual triggers

pub mod bus;
pub mod diff;
pub mod dispatcher;
pub mod error;
pub mod guard;
pub mod poller;
pub mod reconciler;
pub mod store;

pub use bus::{ChangeNotification, NotificationBus, Subscription};
pub use diff::{missing_keys, DiffEngine};
pub use dispatcher::{JobDispatcher, JobLauncher, ProcessLauncher};
pub use error::{DispatchSpawnError, StoreError};
pub use guard::DispatchGuard;
pub use poller::{Poller, TriggerAck, TriggerHandle};
pub use reconciler::{PassReport, PassTrigger, Reconciler};
pub use store::{MemoryStore, PgStore, Store};
