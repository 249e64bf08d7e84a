use hydrosync_core::Config;
use hydrosync_reconcile::{NotificationBus, TriggerHandle};
use sqlx::PgPool;

pub struct AppState {
    /// Read-only listing queries. Reconciliation holds its own clone.
    pub pg_pool: PgPool,
    pub bus: NotificationBus,
    pub trigger: TriggerHandle,
    pub config: Config,
}
