use alloy::primitives::utils::format_units;
use alloy::primitives::Address;
use bigdecimal::BigDecimal;
use futures::future::join_all;
use std::str::FromStr;

use super::fetcher::fetch_both;
use super::types::{
    trim_decimal, Direction, LastActivity, ProbeOutcome, ScanResult, Transfer, TransferQuery,
};
use crate::chains::registry::{ChainDescriptor, ChainRegistry, NATIVE_DECIMALS};
use crate::error::ScanError;
use crate::price::{usd_value, PriceOracle};
use crate::rpc::{ChainClient, ChainClients};

/// Probe one chain for activity. Remote failures never escape: they come back
/// as `ProbeOutcome::Degraded` so sibling chains are unaffected.
pub async fn probe(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    address: Address,
    prices: &dyn PriceOracle,
) -> ProbeOutcome {
    match scan(client, chain, address, prices).await {
        Ok(result) => {
            tracing::debug!(
                chain = %chain.name,
                %address,
                has_activity = result.has_activity,
                tx_count = result.transaction_count,
                "Chain probed"
            );
            ProbeOutcome::Scanned(result)
        }
        Err(e) => {
            let err = ScanError::chain_unreachable(&chain.name, &e);
            tracing::warn!(
                chain = %chain.name,
                chain_id = chain.chain_id,
                %address,
                error = %err,
                "Chain probe degraded to no activity"
            );
            ProbeOutcome::Degraded {
                chain_id: chain.chain_id,
                chain_name: chain.name.clone(),
                reason: e.to_string(),
            }
        }
    }
}

async fn scan(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    address: Address,
    prices: &dyn PriceOracle,
) -> eyre::Result<ScanResult> {
    let transaction_count = client.transaction_count(address).await?;
    if transaction_count == 0 {
        return Ok(ScanResult::inactive(chain.chain_id, &chain.name));
    }

    let (balance, last_activity) = tokio::join!(
        client.native_balance(address),
        last_activity(client, chain, address),
    );
    let native_balance = trim_decimal(&format_units(balance?, NATIVE_DECIMALS)?);

    let amount = BigDecimal::from_str(&native_balance)?;
    let native_balance_usd = usd_value(prices, &chain.native_symbol, &amount).await;

    Ok(ScanResult {
        chain_id: chain.chain_id,
        chain_name: chain.name.clone(),
        has_activity: true,
        transaction_count,
        native_balance,
        native_balance_usd,
        last_activity,
    })
}

/// Most recent transfer in either direction, as a display hint. Lookup
/// failures only drop the hint.
async fn last_activity(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    address: Address,
) -> Option<LastActivity> {
    if !chain.capabilities.enhanced_transfers {
        return None;
    }

    let query = TransferQuery {
        max_count: 1,
        ..Default::default()
    };
    let (outgoing, incoming) = fetch_both(client, chain, address, &query, &query).await;

    let latest = [outgoing, incoming]
        .into_iter()
        .filter_map(|page| match page {
            Ok(page) => page.transfers.into_iter().next(),
            Err(e) => {
                tracing::debug!(chain = %chain.name, error = %e, "Last-activity lookup failed");
                None
            }
        })
        .max_by_key(|t| t.block_number)?;

    Some(LastActivity {
        timestamp: latest.block_timestamp,
        description: describe(&latest, &address.to_string()),
    })
}

/// "Sent 0.5 ETH", "Received 120 USDC", "Received BAYC NFT".
pub fn describe(transfer: &Transfer, wallet: &str) -> String {
    let verb = match Direction::relative_to(&transfer.from, wallet) {
        Direction::Out => "Sent",
        Direction::In => "Received",
    };
    let asset = transfer.asset.as_deref().unwrap_or("tokens");

    if transfer.category.is_nft() {
        return format!("{} {} NFT", verb, asset);
    }
    match &transfer.value {
        Some(value) => format!("{} {} {}", verb, trim_decimal(&value.to_string()), asset),
        None => format!("{} {}", verb, asset),
    }
}

/// Probe every registered chain concurrently. Always yields one outcome per
/// chain, in registry order.
pub async fn probe_all(
    registry: &ChainRegistry,
    clients: &ChainClients,
    address: Address,
    prices: &dyn PriceOracle,
) -> Vec<ProbeOutcome> {
    let probes = registry.list_chains().iter().map(|chain| async move {
        match clients.get(&chain.chain_id) {
            Some(client) => probe(client.as_ref(), chain, address, prices).await,
            None => ProbeOutcome::Degraded {
                chain_id: chain.chain_id,
                chain_name: chain.name.clone(),
                reason: "no client configured".to_string(),
            },
        }
    });

    let outcomes = join_all(probes).await;

    let active = outcomes.iter().filter(|o| o.has_activity()).count();
    let degraded = outcomes.iter().filter(|o| o.is_degraded()).count();
    tracing::info!(
        %address,
        chains = outcomes.len(),
        active,
        degraded,
        "Multi-chain probe complete"
    );

    outcomes
}
