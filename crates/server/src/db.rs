use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Create a lazily-connecting PostgreSQL pool.
///
/// Nothing is dialled here: an unreachable database surfaces as a store
/// error on each pass (and a 500 on listing endpoints) until it comes back,
/// instead of keeping the server from starting.
pub fn init_pg_pool(config: &hydrosync_core::config::PostgresConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.database_url())?;
    info!("PostgreSQL pool ready (lazy): host={}, db={}", config.host, config.database);
    Ok(pool)
}
