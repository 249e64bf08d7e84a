mod api;
mod cli;
mod db;
mod live;
mod router;
mod startup;
mod state;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use hydrosync_core::Config;
use hydrosync_reconcile::{NotificationBus, PassTrigger};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // .env must be loaded before clap reads `env = ...` defaults.
    hydrosync_core::config::load_dotenv();
    let cli = Cli::parse();

    let config = Config::for_profile(&cli.profile);
    config.validate().context("invalid configuration")?;
    config.log_summary();

    match cli.resolved_command() {
        Command::Serve => serve(config).await,
        Command::Scan => scan(&config).await,
        Command::ReconcileOnce => reconcile_once(&config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::init_pg_pool(&config.postgres).context("failed to create PostgreSQL pool")?;
    let (state, poller) = startup::start(&config, pool)?;
    let app = router::build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        "Polling server listening on http://{} (checking every {}s)",
        addr, config.poller.reconcile_interval_secs
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Shutting down poller...");
    poller.stop().await;
    served.context("HTTP server failed")
}

async fn scan(config: &Config) -> anyhow::Result<()> {
    let pool = db::init_pg_pool(&config.postgres).context("failed to create PostgreSQL pool")?;
    let reconciler = startup::build_reconciler(config, pool, NotificationBus::new())?;

    let missing = reconciler.diff().missing().await.context("missing-key query failed")?;
    info!(count = missing.len(), "missing combinations");
    for item in &missing {
        println!("{}\t{}", item.machine_id, item.cycle_id);
    }
    Ok(())
}

async fn reconcile_once(config: &Config) -> anyhow::Result<()> {
    let pool = db::init_pg_pool(&config.postgres).context("failed to create PostgreSQL pool")?;
    let reconciler = startup::build_reconciler(config, pool, NotificationBus::new())?;

    let report = reconciler
        .run_pass(PassTrigger::Manual)
        .await
        .context("reconciliation pass failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
