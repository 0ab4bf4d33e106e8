pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::sync::SyncEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
}

pub fn router(engine: Arc<SyncEngine>) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/chains", get(handlers::list_chains))
        .route("/api/v1/wallets", post(handlers::add_wallet))
        .route(
            "/api/v1/wallets/{id}/chains",
            get(handlers::list_wallet_chains),
        )
        .route(
            "/api/v1/wallets/{id}/resync",
            post(handlers::resync_wallet),
        )
        .route("/api/v1/wallets/{id}/sync", post(handlers::sync_wallet))
        .route(
            "/api/v1/wallets/{id}/transfers",
            get(handlers::list_transfers),
        )
        .route(
            "/api/v1/wallets/{id}/balances/{chain_id}",
            get(handlers::token_balances),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    engine: Arc<SyncEngine>,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(engine);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
