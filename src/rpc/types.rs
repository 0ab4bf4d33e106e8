//! Wire shapes for the enhanced (Alchemy-compatible) JSON-RPC methods.

use serde::{Deserialize, Serialize};

/// Params object for `alchemy_getAssetTransfers`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransferParams {
    pub from_block: String,
    pub to_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    pub category: Vec<String>,
    pub order: String,
    pub with_metadata: bool,
    pub exclude_zero_value: bool,
    pub max_count: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransferResponse {
    #[serde(default)]
    pub transfers: Vec<RawAssetTransfer>,
    pub page_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawAssetTransfer {
    pub block_num: String,
    pub unique_id: Option<String>,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: Option<f64>,
    #[serde(rename = "erc721TokenId")]
    pub erc721_token_id: Option<String>,
    #[serde(rename = "erc1155Metadata")]
    pub erc1155_metadata: Option<serde_json::Value>,
    pub token_id: Option<String>,
    pub asset: Option<String>,
    pub category: String,
    #[serde(default)]
    pub raw_contract: RawContract,
    pub metadata: Option<RawTransferMetadata>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RawContract {
    pub value: Option<String>,
    pub address: Option<String>,
    pub decimal: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawTransferMetadata {
    pub block_timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalancesResponse {
    pub address: Option<String>,
    #[serde(default)]
    pub token_balances: Vec<RawTokenBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTokenBalance {
    pub contract_address: String,
    pub token_balance: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub logo: Option<String>,
}

/// Parse a `0x`-prefixed hex quantity such as `blockNum`.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}
