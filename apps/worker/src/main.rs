use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reprise_worker::config::Config;
use reprise_worker::scheduler;
use reprise_worker::store::PostgresStore;
use reprise_spotify_client::SpotifyClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reprise_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    tracing::info!("Starting Reprise worker");

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database().max_connections)
        .min_connections(config.database().min_connections)
        .acquire_timeout(Duration::from_secs(config.database().connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database().idle_timeout_secs))
        .connect(config.database_url())
        .await?;

    let store = Arc::new(PostgresStore::new(pool));
    store.ensure_schema().await?;

    let client = SpotifyClient::new(config.spotify())?;

    let handle = scheduler::start(client, store, config.scheduler_config());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, draining in-flight runs");
    handle.stop();
    handle.join().await;

    tracing::info!("Reprise worker stopped");

    Ok(())
}
