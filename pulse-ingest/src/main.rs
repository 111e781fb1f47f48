//! pulse-ingest - Campaign event ingestion and analytics service
//!
//! Single HTTP service accepting campaign events from a signed webhook, a
//! file-batch upload, and a generic automation callback; serves aggregate
//! analytics and rule-based insights over the ingested records.

use anyhow::Result;
use clap::Parser;
use pulse_common::config::ServiceConfig;
use pulse_common::db::init_database;
use pulse_ingest::scheduler::spawn_daily_insight_job;
use pulse_ingest::{build_router, AppState, Store};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pulse-ingest", version, about = "Campaign event ingestion service")]
struct Args {
    /// Path to pulse.toml (default: platform config dir, then working dir)
    #[arg(short, long)]
    config: Option<String>,

    /// Listen port (overrides config file and PULSE_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database path (overrides config file and PULSE_DATABASE)
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately, before database delays
    info!(
        "Starting pulse-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = ServiceConfig::resolve(
        args.config.as_deref(),
        args.port,
        args.database.as_deref(),
    )?;

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path).await?;
    info!("✓ Database ready");

    let store = Store::new(pool, config.store_timeout_ms);
    let addr = format!("{}:{}", config.host, config.port);
    let insight_interval = config.insight_interval_secs;

    let state = AppState::new(store.clone(), config);
    spawn_daily_insight_job(store, state.insight_running.clone(), insight_interval);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("pulse-ingest listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
