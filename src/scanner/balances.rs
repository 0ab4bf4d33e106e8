use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use bigdecimal::BigDecimal;
use std::str::FromStr;

use super::types::{trim_decimal, TokenBalance};
use crate::chains::registry::ChainDescriptor;
use crate::price::{token_usd_value, PriceOracle};
use crate::rpc::ChainClient;

/// Non-zero ERC-20 holdings of `address`, with symbol/decimals attached.
///
/// Only chains with the enhanced API are supported; others yield an empty
/// list. A token whose metadata cannot be fetched, or whose decimals are
/// missing or out of range, is skipped. USD values come from the contract
/// address, never from the self-reported symbol.
pub async fn fetch_token_balances(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    address: Address,
    prices: &dyn PriceOracle,
) -> eyre::Result<Vec<TokenBalance>> {
    if !chain.capabilities.enhanced_transfers {
        return Ok(Vec::new());
    }

    let raw_balances = client.token_balances(address).await?;
    let mut balances = Vec::new();

    for raw in raw_balances {
        if let Some(error) = &raw.error {
            tracing::debug!(chain = %chain.name, contract = %raw.contract_address, error = %error, "Skipping errored token balance");
            continue;
        }
        let Some(amount) = raw.token_balance.as_deref().and_then(|b| U256::from_str(b).ok()) else {
            continue;
        };
        if amount.is_zero() {
            continue;
        }
        let Ok(contract) = Address::from_str(&raw.contract_address) else {
            continue;
        };

        let metadata = match client.token_metadata(contract).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(chain = %chain.name, %contract, error = %e, "Token metadata lookup failed, skipping token");
                continue;
            }
        };

        // without decimals the raw amount cannot be scaled
        let Some(decimals) = metadata.decimals else {
            tracing::debug!(chain = %chain.name, %contract, "Token reports no decimals, skipping token");
            continue;
        };
        let balance = match format_units(amount, decimals) {
            Ok(units) => trim_decimal(&units),
            Err(e) => {
                tracing::warn!(chain = %chain.name, %contract, decimals, error = %e, "Token decimals out of range, skipping token");
                continue;
            }
        };

        let contract_address = contract.to_string();
        let balance_usd = match (&metadata.symbol, BigDecimal::from_str(&balance)) {
            (Some(symbol), Ok(value)) => {
                let contract = Some(contract_address.as_str());
                token_usd_value(prices, chain.chain_id, contract, symbol, &value).await
            }
            _ => None,
        };

        balances.push(TokenBalance {
            chain_id: chain.chain_id,
            contract_address,
            symbol: metadata.symbol,
            name: metadata.name,
            decimals,
            raw_balance: amount.to_string(),
            balance,
            balance_usd,
        });
    }

    tracing::debug!(chain = %chain.name, %address, tokens = balances.len(), "Token balances fetched");
    Ok(balances)
}
