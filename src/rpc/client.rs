use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{AssetTransferParams, AssetTransferResponse, RawTokenBalance, TokenMetadata};

/// Remote endpoint for one chain.
///
/// Every method is a network round trip; implementations apply their own
/// timeout and retry policy and report failures as `eyre` errors. Callers in
/// the scanner decide whether a failure degrades or propagates.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Nonce-based transaction count at the latest block.
    async fn transaction_count(&self, address: Address) -> eyre::Result<u64>;

    /// Native balance in wei at the latest block.
    async fn native_balance(&self, address: Address) -> eyre::Result<U256>;

    /// Timestamp of a block, `None` if the endpoint does not know the block.
    async fn block_timestamp(&self, block_number: u64) -> eyre::Result<Option<DateTime<Utc>>>;

    /// One page of `alchemy_getAssetTransfers`.
    async fn asset_transfers(&self, params: &AssetTransferParams)
        -> eyre::Result<AssetTransferResponse>;

    /// ERC-20 balances held by `address` (zero balances may be included).
    async fn token_balances(&self, address: Address) -> eyre::Result<Vec<RawTokenBalance>>;

    async fn token_metadata(&self, contract: Address) -> eyre::Result<TokenMetadata>;

    /// Resolve a name-service alias. `Ok(None)` means the name has no address.
    async fn resolve_name(&self, name: &str) -> eyre::Result<Option<Address>>;
}
