use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use super::types::*;
use super::AppState;
use crate::db::models::{TransferFilter, WalletChainRecord};
use crate::error::ScanError;
use crate::sync::AddWalletOutcome;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

pub(crate) fn status_for(err: &ScanError) -> StatusCode {
    match err {
        ScanError::InvalidAddress(_)
        | ScanError::ResolutionUnsupported(_)
        | ScanError::ResolutionFailed { .. } => StatusCode::BAD_REQUEST,
        ScanError::WalletNotFound(_) | ScanError::UnknownChain(_) => StatusCode::NOT_FOUND,
        ScanError::DuplicateWallet { .. } | ScanError::PersistenceConflict(_) => {
            StatusCode::CONFLICT
        }
        ScanError::ChainUnreachable { .. } => StatusCode::BAD_GATEWAY,
        ScanError::PartialSyncFailure { .. } | ScanError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn scan_error(err: ScanError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    api_error(status, err.to_string())
}

// ============================================================
// Service
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        chains: state.engine.registry().list_chains().len(),
    })
}

pub async fn list_chains(State(state): State<Arc<AppState>>) -> Json<ChainsResponse> {
    Json(ChainsResponse {
        chains: state.engine.registry().list_chains().to_vec(),
    })
}

// ============================================================
// Wallets
// ============================================================

pub async fn add_wallet(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddWalletRequest>,
) -> Result<(StatusCode, Json<AddWalletOutcome>), ApiError> {
    if body.scope.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "scope must not be empty"));
    }
    state
        .engine
        .add_wallet(body.scope.trim(), &body.address, body.label)
        .await
        .map(|outcome| (StatusCode::CREATED, Json(outcome)))
        .map_err(scan_error)
}

pub async fn resync_wallet(
    State(state): State<Arc<AppState>>,
    Path(wallet_id): Path<i64>,
) -> ApiResult<WalletResponse> {
    state
        .engine
        .resync_wallet(wallet_id)
        .await
        .map(|(wallet, chains)| Json(WalletResponse { wallet, chains }))
        .map_err(scan_error)
}

pub async fn list_wallet_chains(
    State(state): State<Arc<AppState>>,
    Path(wallet_id): Path<i64>,
) -> ApiResult<Vec<WalletChainRecord>> {
    state
        .engine
        .list_chains(wallet_id)
        .await
        .map(Json)
        .map_err(scan_error)
}

/// Starts a transfer sync in the background and returns immediately.
pub async fn sync_wallet(
    State(state): State<Arc<AppState>>,
    Path(wallet_id): Path<i64>,
    body: Bytes,
) -> Result<(StatusCode, Json<SyncAccepted>), ApiError> {
    // the body is optional; an empty one syncs every active chain
    let request: SyncRequest = if body.is_empty() {
        SyncRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid body: {}", e)))?
    };
    let chain_ids = request.chain_ids;

    // unknown wallets are reported now, not from inside the task
    state
        .engine
        .list_chains(wallet_id)
        .await
        .map_err(scan_error)?;

    let engine = state.engine.clone();
    let requested = chain_ids.clone();
    tokio::spawn(async move {
        match engine.sync_transactions(wallet_id, requested).await {
            Ok(summary) => tracing::info!(
                wallet_id,
                persisted = summary.persisted(),
                failed = summary.failed(),
                "Background sync finished"
            ),
            Err(e) => tracing::error!(wallet_id, error = %e, "Background sync failed"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncAccepted {
            wallet_id,
            status: "accepted".to_string(),
            chain_ids,
        }),
    ))
}

// ============================================================
// Transfers & balances
// ============================================================

pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Path(wallet_id): Path<i64>,
    Query(params): Query<TransferParams>,
) -> ApiResult<TransfersResponse> {
    let filter = TransferFilter {
        chain_id: params.chain_id,
        limit: params.limit,
        offset: params.offset,
    };
    let (limit, offset) = (filter.limit(), filter.offset());

    let transfers = state
        .engine
        .list_transfers(wallet_id, filter)
        .await
        .map_err(scan_error)?;

    Ok(Json(TransfersResponse {
        wallet_id,
        count: transfers.len(),
        limit,
        offset,
        transfers,
    }))
}

pub async fn token_balances(
    State(state): State<Arc<AppState>>,
    Path((wallet_id, chain_id)): Path<(i64, i64)>,
) -> ApiResult<BalancesResponse> {
    state
        .engine
        .token_balances(wallet_id, chain_id)
        .await
        .map(|balances| {
            Json(BalancesResponse {
                wallet_id,
                chain_id,
                balances,
            })
        })
        .map_err(scan_error)
}
