use alloy::primitives::Address;

use super::types::{Direction, Transfer, TransferCategory, TransferPage, TransferQuery};
use crate::chains::registry::ChainDescriptor;
use crate::rpc::types::AssetTransferParams;
use crate::rpc::ChainClient;

/// Provider ceiling for `maxCount` on a single page.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Consecutive pages yielding no usable transfers before paging gives up.
const MAX_EMPTY_PAGES: usize = 10;

/// Categories requested from a chain, depending on what its endpoint indexes.
pub fn categories_for(chain: &ChainDescriptor) -> Vec<TransferCategory> {
    let mut categories = vec![
        TransferCategory::External,
        TransferCategory::Erc20,
        TransferCategory::Erc721,
        TransferCategory::Erc1155,
    ];
    if chain.capabilities.internal_transfers {
        categories.push(TransferCategory::Internal);
    }
    categories
}

/// Build the provider params for one direction. The API filters on a single
/// address role per call, so `Out` sets the sender and `In` the receiver.
pub fn build_params(
    chain: &ChainDescriptor,
    address: Address,
    direction: Direction,
    query: &TransferQuery,
) -> AssetTransferParams {
    let wallet = address.to_string();
    let (from_address, to_address) = match direction {
        Direction::Out => (Some(wallet), None),
        Direction::In => (None, Some(wallet)),
    };
    let max_count = query.max_count.clamp(1, MAX_PAGE_SIZE);

    AssetTransferParams {
        from_block: format!("0x{:x}", query.from_block.unwrap_or(0)),
        to_block: query
            .to_block
            .map(|b| format!("0x{:x}", b))
            .unwrap_or_else(|| "latest".to_string()),
        from_address,
        to_address,
        category: categories_for(chain)
            .iter()
            .map(|c| c.as_str().to_string())
            .collect(),
        order: "desc".to_string(),
        with_metadata: true,
        exclude_zero_value: true,
        max_count: format!("0x{:x}", max_count),
        page_key: query.page_key.clone(),
    }
}

/// Fetch one page of transfers for one direction.
///
/// Chains without the enhanced transfer API return an empty page; there is
/// no event-log scanning fallback.
pub async fn fetch_transfers(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    address: Address,
    direction: Direction,
    query: &TransferQuery,
) -> eyre::Result<TransferPage> {
    if !chain.capabilities.enhanced_transfers {
        return Ok(TransferPage::default());
    }

    let params = build_params(chain, address, direction, query);
    let response = client.asset_transfers(&params).await?;

    let transfers = response
        .transfers
        .into_iter()
        .filter_map(|raw| Transfer::from_raw(chain.chain_id, raw))
        .collect();

    Ok(TransferPage {
        transfers,
        next_page_key: response.page_key,
    })
}

/// Outgoing and incoming pages for the same query, fetched concurrently.
pub async fn fetch_both(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    address: Address,
    outgoing: &TransferQuery,
    incoming: &TransferQuery,
) -> (eyre::Result<TransferPage>, eyre::Result<TransferPage>) {
    tokio::join!(
        fetch_transfers(client, chain, address, Direction::Out, outgoing),
        fetch_transfers(client, chain, address, Direction::In, incoming),
    )
}

/// Page through one direction until the provider runs out or `cap` is hit.
///
/// A page whose rows all fail to parse still carries a continuation key and
/// is followed; only a repeated key or a long run of empty pages ends early.
pub async fn fetch_direction_capped(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    address: Address,
    direction: Direction,
    page_size: u32,
    cap: usize,
) -> eyre::Result<Vec<Transfer>> {
    let mut collected = Vec::new();
    let mut page_key: Option<String> = None;
    let mut empty_pages = 0;

    loop {
        let remaining = cap.saturating_sub(collected.len());
        if remaining == 0 {
            break;
        }
        let query = TransferQuery {
            from_block: None,
            to_block: None,
            max_count: page_size.min(remaining.min(MAX_PAGE_SIZE as usize) as u32),
            page_key: page_key.clone(),
        };

        let page = fetch_transfers(client, chain, address, direction, &query).await?;
        let fetched = page.transfers.len();
        collected.extend(page.transfers);

        tracing::debug!(
            chain = %chain.name,
            direction = direction.as_str(),
            fetched,
            total = collected.len(),
            "Fetched transfer page"
        );

        empty_pages = if fetched == 0 { empty_pages + 1 } else { 0 };
        match page.next_page_key {
            Some(key) if page_key.as_ref() == Some(&key) => {
                tracing::warn!(chain = %chain.name, direction = direction.as_str(), "Provider repeated a page key, stopping");
                break;
            }
            Some(_) if empty_pages >= MAX_EMPTY_PAGES => {
                tracing::warn!(chain = %chain.name, direction = direction.as_str(), empty_pages, "Too many empty transfer pages, stopping");
                break;
            }
            Some(key) => page_key = Some(key),
            None => break,
        }
    }

    collected.truncate(cap);
    Ok(collected)
}

/// Capped outgoing and incoming transfer sets for a sync run.
pub async fn fetch_all_capped(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    address: Address,
    page_size: u32,
    cap: usize,
) -> eyre::Result<(Vec<Transfer>, Vec<Transfer>)> {
    let (outgoing, incoming) = tokio::join!(
        fetch_direction_capped(client, chain, address, Direction::Out, page_size, cap),
        fetch_direction_capped(client, chain, address, Direction::In, page_size, cap),
    );
    Ok((outgoing?, incoming?))
}
