use serde::{Deserialize, Serialize};

use crate::chains::registry::ChainDescriptor;
use crate::db::models::{TransferRecord, WalletChainRecord, WalletRecord};
use crate::scanner::types::TokenBalance;

// ============================================================
// Request bodies & query params
// ============================================================

#[derive(Debug, Deserialize)]
pub struct AddWalletRequest {
    pub scope: String,
    /// Hex address or name-service alias.
    pub address: String,
    pub label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    pub chain_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct TransferParams {
    pub chain_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub chains: usize,
}

#[derive(Debug, Serialize)]
pub struct ChainsResponse {
    pub chains: Vec<ChainDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub wallet: WalletRecord,
    pub chains: Vec<WalletChainRecord>,
}

#[derive(Debug, Serialize)]
pub struct SyncAccepted {
    pub wallet_id: i64,
    pub status: String,
    pub chain_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct TransfersResponse {
    pub wallet_id: i64,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
    pub transfers: Vec<TransferRecord>,
}

#[derive(Debug, Serialize)]
pub struct BalancesResponse {
    pub wallet_id: i64,
    pub chain_id: i64,
    pub balances: Vec<TokenBalance>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
