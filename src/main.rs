use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use chainwatch_walletsync::chains::registry::ChainRegistry;
use chainwatch_walletsync::config::Config;
use chainwatch_walletsync::db::PgWalletStore;
use chainwatch_walletsync::price::{CachedPriceOracle, CoinGeckoOracle, NoPriceOracle, PriceOracle};
use chainwatch_walletsync::rpc::connect_all;
use chainwatch_walletsync::rpc::retry::RetryPolicy;
use chainwatch_walletsync::sync::SyncEngine;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for per-call detail)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("ChainWatch wallet sync starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        chains = config.chains.len(),
        "Configuration loaded from {}",
        config_path
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    tracing::info!("Database migrations complete");

    let registry = ChainRegistry::from_config(&config.chains);
    let clients = connect_all(&registry, RetryPolicy::from_config(&config.rpc))?;

    let prices: Arc<dyn PriceOracle> = if config.price.enabled {
        let remote = Arc::new(CoinGeckoOracle::from_config(&config.price)?);
        Arc::new(CachedPriceOracle::new(
            remote,
            Duration::from_secs(config.price.cache_ttl_secs),
            config.price.cache_capacity,
        ))
    } else {
        tracing::info!("Price lookups disabled, fiat values will be empty");
        Arc::new(NoPriceOracle)
    };

    let engine = Arc::new(SyncEngine::new(
        registry,
        clients,
        Arc::new(PgWalletStore::new(pool)),
        prices,
        config.sync.clone(),
    ));

    if !config.api.enabled {
        tracing::warn!("API disabled, nothing to serve");
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let server = {
        let shutdown = shutdown.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = chainwatch_walletsync::api::serve(engine, &host, port, shutdown).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    tracing::info!("Wallet sync service ready. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, draining API server...");
    shutdown.cancel();
    let _ = server.await;

    tracing::info!("ChainWatch wallet sync stopped gracefully");
    Ok(())
}
