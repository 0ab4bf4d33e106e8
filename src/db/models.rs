use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

use crate::scanner::types::{Direction, ScanResult, TransferCategory};

/// Per wallet-chain sync lifecycle: `pending -> syncing -> synced | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Synced,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl TryFrom<String> for SyncStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        match s.as_str() {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown sync status '{}'", other)),
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        Direction::parse(&s).ok_or_else(|| format!("unknown direction '{}'", s))
    }
}

impl TryFrom<String> for TransferCategory {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        TransferCategory::parse(&s).ok_or_else(|| format!("unknown transfer category '{}'", s))
    }
}

// ============================================================
// Wallets
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct WalletRecord {
    pub id: i64,
    pub scope: String,
    pub address: String,
    pub label: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWallet {
    pub scope: String,
    pub address: String,
    pub label: Option<String>,
}

// ============================================================
// Wallet chains
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct WalletChainRecord {
    pub id: i64,
    pub wallet_id: i64,
    pub chain_id: i64,
    pub chain_name: String,
    pub has_activity: bool,
    pub transaction_count: i64,
    pub native_balance: BigDecimal,
    pub native_balance_usd: Option<BigDecimal>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub last_activity_description: Option<String>,
    #[sqlx(try_from = "String")]
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWalletChain {
    pub chain_id: i64,
    pub chain_name: String,
    pub has_activity: bool,
    pub transaction_count: i64,
    pub native_balance: BigDecimal,
    pub native_balance_usd: Option<BigDecimal>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub last_activity_description: Option<String>,
}

impl NewWalletChain {
    pub fn from_scan(scan: &ScanResult) -> Self {
        Self {
            chain_id: scan.chain_id,
            chain_name: scan.chain_name.clone(),
            has_activity: scan.has_activity,
            transaction_count: scan.transaction_count as i64,
            native_balance: BigDecimal::from_str(&scan.native_balance)
                .unwrap_or_else(|_| BigDecimal::from(0)),
            native_balance_usd: scan.native_balance_usd.clone(),
            last_activity_at: scan.last_activity.as_ref().and_then(|a| a.timestamp),
            last_activity_description: scan.last_activity.as_ref().map(|a| a.description.clone()),
        }
    }
}

// ============================================================
// Transfers
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TransferRecord {
    pub id: i64,
    pub wallet_id: i64,
    pub chain_id: i64,
    pub tx_hash: String,
    pub asset: String,
    #[sqlx(try_from = "String")]
    pub category: TransferCategory,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
    pub from_address: String,
    pub to_address: Option<String>,
    pub value: Option<BigDecimal>,
    pub value_usd: Option<BigDecimal>,
    #[sqlx(try_from = "String")]
    pub direction: Direction,
    pub contract_address: Option<String>,
    pub contract_decimals: Option<i16>,
    pub raw_value: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row payload for the idempotent transfer upsert. The identity is
/// (wallet_id, tx_hash, chain_id, asset, category); everything else is
/// overwritten on conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferUpsert {
    pub wallet_id: i64,
    pub chain_id: i64,
    pub tx_hash: String,
    pub asset: String,
    pub category: TransferCategory,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
    pub from_address: String,
    pub to_address: Option<String>,
    pub value: Option<BigDecimal>,
    pub value_usd: Option<BigDecimal>,
    pub direction: Direction,
    pub contract_address: Option<String>,
    pub contract_decimals: Option<i16>,
    pub raw_value: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub chain_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransferFilter {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
