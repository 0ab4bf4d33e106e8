use alloy::primitives::utils::format_units;
use alloy::primitives::U256;
use bigdecimal::{BigDecimal, FromPrimitive};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

use crate::chains::address::same_address;
use crate::rpc::types::{parse_hex_u64, RawAssetTransfer};

// ============================================================
// Probe results
// ============================================================

/// Human-readable hint about the most recent transfer on a chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastActivity {
    pub timestamp: Option<DateTime<Utc>>,
    pub description: String,
}

/// Activity snapshot for one (address, chain) pair. Never stored directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub chain_id: i64,
    pub chain_name: String,
    pub has_activity: bool,
    pub transaction_count: u64,
    pub native_balance: String,
    /// `None` means no price data, which is not the same as zero.
    pub native_balance_usd: Option<BigDecimal>,
    pub last_activity: Option<LastActivity>,
}

impl ScanResult {
    pub fn inactive(chain_id: i64, chain_name: &str) -> Self {
        Self {
            chain_id,
            chain_name: chain_name.to_string(),
            has_activity: false,
            transaction_count: 0,
            native_balance: "0".to_string(),
            native_balance_usd: None,
            last_activity: None,
        }
    }
}

/// Result of probing one chain.
///
/// `Degraded` records that the chain could not be reached; persistence treats
/// it like a chain with no activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Scanned(ScanResult),
    Degraded {
        chain_id: i64,
        chain_name: String,
        reason: String,
    },
}

impl ProbeOutcome {
    pub fn chain_id(&self) -> i64 {
        match self {
            Self::Scanned(r) => r.chain_id,
            Self::Degraded { chain_id, .. } => *chain_id,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn has_activity(&self) -> bool {
        matches!(self, Self::Scanned(r) if r.has_activity)
    }

    /// The zero-activity view of a degraded probe, or the scan itself.
    pub fn scan_result(&self) -> ScanResult {
        match self {
            Self::Scanned(r) => r.clone(),
            Self::Degraded {
                chain_id,
                chain_name,
                ..
            } => ScanResult::inactive(*chain_id, chain_name),
        }
    }
}

// ============================================================
// Transfers
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferCategory {
    External,
    Internal,
    Erc20,
    Erc721,
    Erc1155,
}

impl TransferCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
            Self::Erc20 => "erc20",
            Self::Erc721 => "erc721",
            Self::Erc1155 => "erc1155",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "external" => Some(Self::External),
            "internal" => Some(Self::Internal),
            "erc20" => Some(Self::Erc20),
            "erc721" => Some(Self::Erc721),
            "erc1155" => Some(Self::Erc1155),
            _ => None,
        }
    }

    pub fn is_nft(&self) -> bool {
        matches!(self, Self::Erc721 | Self::Erc1155)
    }
}

/// Direction of a transfer relative to the wallet. Also names the address
/// role used when querying: `Out` filters on sender, `In` on receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }

    /// `Out` when the wallet is the sender, compared case-insensitively.
    pub fn relative_to(from: &str, wallet: &str) -> Self {
        if same_address(from, wallet) {
            Self::Out
        } else {
            Self::In
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContractInfo {
    pub address: Option<String>,
    pub decimals: Option<u8>,
    pub raw_value: Option<String>,
}

/// One value movement as reported by the enhanced transfer API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub chain_id: i64,
    pub tx_hash: String,
    pub block_number: u64,
    pub block_timestamp: Option<DateTime<Utc>>,
    pub from: String,
    pub to: Option<String>,
    pub value: Option<BigDecimal>,
    pub asset: Option<String>,
    pub category: TransferCategory,
    pub contract: ContractInfo,
    pub metadata: serde_json::Value,
}

/// Identity of a transfer within one wallet and chain: hash, asset, category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferKey {
    pub tx_hash: String,
    pub asset: String,
    pub category: TransferCategory,
}

impl Transfer {
    /// Asset symbol, or the empty string for unnamed assets.
    pub fn asset_key(&self) -> &str {
        self.asset.as_deref().unwrap_or("")
    }

    pub fn key(&self) -> TransferKey {
        TransferKey {
            tx_hash: self.tx_hash.to_ascii_lowercase(),
            asset: self.asset_key().to_string(),
            category: self.category,
        }
    }

    /// Convert a provider row. Rows with an unknown category or an
    /// unparseable block number are dropped.
    pub fn from_raw(chain_id: i64, raw: RawAssetTransfer) -> Option<Self> {
        let Some(category) = TransferCategory::parse(&raw.category) else {
            tracing::debug!(chain_id, category = %raw.category, hash = %raw.hash, "Skipping unsupported transfer category");
            return None;
        };
        let block_number = parse_hex_u64(&raw.block_num)?;

        let decimals = raw
            .raw_contract
            .decimal
            .as_deref()
            .and_then(parse_hex_u64)
            .and_then(|d| u8::try_from(d).ok());

        let value = exact_value(raw.raw_contract.value.as_deref(), decimals, category)
            .or_else(|| raw.value.and_then(BigDecimal::from_f64));

        let block_timestamp = raw
            .metadata
            .as_ref()
            .and_then(|m| m.block_timestamp.as_deref())
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc));

        let metadata = serde_json::json!({
            "unique_id": raw.unique_id,
            "token_id": raw.token_id,
            "erc721_token_id": raw.erc721_token_id,
            "erc1155_metadata": raw.erc1155_metadata,
            "provider_value": raw.value,
        });

        Some(Self {
            chain_id,
            tx_hash: raw.hash.to_ascii_lowercase(),
            block_number,
            block_timestamp,
            from: raw.from,
            to: raw.to,
            value,
            asset: raw.asset,
            category,
            contract: ContractInfo {
                address: raw.raw_contract.address,
                decimals,
                raw_value: raw.raw_contract.value,
            },
            metadata,
        })
    }
}

/// Decimal value from the raw integer amount, when the provider gave both
/// the amount and its decimals. NFTs carry token ids, not amounts.
fn exact_value(
    raw_value: Option<&str>,
    decimals: Option<u8>,
    category: TransferCategory,
) -> Option<BigDecimal> {
    if category.is_nft() {
        return None;
    }
    let raw = U256::from_str(raw_value?).ok()?;
    let formatted = format_units(raw, decimals?).ok()?;
    BigDecimal::from_str(&formatted).ok()
}

/// Drop trailing fractional zeros: "1.500" -> "1.5", "2.000" -> "2".
pub fn trim_decimal(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Block range and paging for a transfer query.
#[derive(Debug, Clone, Default)]
pub struct TransferQuery {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    pub max_count: u32,
    pub page_key: Option<String>,
}

/// One page of transfers for one direction.
#[derive(Debug, Clone, Default)]
pub struct TransferPage {
    pub transfers: Vec<Transfer>,
    pub next_page_key: Option<String>,
}

// ============================================================
// Token balances
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenBalance {
    pub chain_id: i64,
    pub contract_address: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: u8,
    pub raw_balance: String,
    pub balance: String,
    pub balance_usd: Option<BigDecimal>,
}
