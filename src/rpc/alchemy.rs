use alloy::primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, TransactionInput, TransactionRequest};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::client::ChainClient;
use super::retry::{retry_rpc, RetryPolicy};
use super::types::{
    AssetTransferParams, AssetTransferResponse, RawTokenBalance, TokenBalancesResponse,
    TokenMetadata,
};
use crate::chains::registry::ChainDescriptor;

/// ENS registry, same address on every network that hosts it.
pub const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

sol! {
    interface IEnsRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    interface IEnsResolver {
        function addr(bytes32 node) external view returns (address);
    }
}

/// `ChainClient` over an Alchemy-compatible HTTP endpoint.
///
/// Standard JSON-RPC goes through alloy's typed provider; the enhanced
/// `alchemy_*` methods are sent as raw requests on the same transport.
pub struct AlchemyClient {
    chain: String,
    provider: DynProvider,
    policy: RetryPolicy,
}

impl AlchemyClient {
    pub fn connect(chain: &ChainDescriptor, policy: RetryPolicy) -> eyre::Result<Self> {
        let provider = ProviderBuilder::new()
            .connect_http(chain.rpc_url.parse().map_err(|e| {
                eyre::eyre!("Invalid RPC URL for chain '{}': {}", chain.name, e)
            })?)
            .erased();

        Ok(Self {
            chain: chain.name.clone(),
            provider,
            policy,
        })
    }

    async fn call_for_address(&self, to: Address, calldata: Vec<u8>) -> eyre::Result<Option<Address>> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(Bytes::from(calldata)));

        let output = retry_rpc(&self.policy, "eth_call", || {
            let tx = tx.clone();
            async move { self.provider.call(tx).await }
        })
        .await?;

        Ok(decode_address_word(&output))
    }
}

#[async_trait]
impl ChainClient for AlchemyClient {
    async fn transaction_count(&self, address: Address) -> eyre::Result<u64> {
        retry_rpc(&self.policy, "eth_getTransactionCount", || async move {
            self.provider.get_transaction_count(address).latest().await
        })
        .await
    }

    async fn native_balance(&self, address: Address) -> eyre::Result<U256> {
        retry_rpc(&self.policy, "eth_getBalance", || async move {
            self.provider.get_balance(address).latest().await
        })
        .await
    }

    async fn block_timestamp(&self, block_number: u64) -> eyre::Result<Option<DateTime<Utc>>> {
        let block = retry_rpc(&self.policy, "eth_getBlockByNumber", || async move {
            self.provider
                .get_block_by_number(BlockNumberOrTag::Number(block_number))
                .await
        })
        .await?;

        Ok(block.and_then(|b| DateTime::from_timestamp(b.header.timestamp as i64, 0)))
    }

    async fn asset_transfers(
        &self,
        params: &AssetTransferParams,
    ) -> eyre::Result<AssetTransferResponse> {
        tracing::debug!(
            chain = %self.chain,
            from = ?params.from_address,
            to = ?params.to_address,
            page_key = ?params.page_key,
            "Requesting asset transfers"
        );

        retry_rpc(&self.policy, "alchemy_getAssetTransfers", || {
            let params = params.clone();
            async move {
                self.provider
                    .raw_request::<_, AssetTransferResponse>(
                        "alchemy_getAssetTransfers".into(),
                        (params,),
                    )
                    .await
            }
        })
        .await
    }

    async fn token_balances(&self, address: Address) -> eyre::Result<Vec<RawTokenBalance>> {
        let response = retry_rpc(&self.policy, "alchemy_getTokenBalances", || async move {
            self.provider
                .raw_request::<_, TokenBalancesResponse>(
                    "alchemy_getTokenBalances".into(),
                    (address.to_string(), "erc20".to_string()),
                )
                .await
        })
        .await?;

        Ok(response.token_balances)
    }

    async fn token_metadata(&self, contract: Address) -> eyre::Result<TokenMetadata> {
        retry_rpc(&self.policy, "alchemy_getTokenMetadata", || async move {
            self.provider
                .raw_request::<_, TokenMetadata>(
                    "alchemy_getTokenMetadata".into(),
                    (contract.to_string(),),
                )
                .await
        })
        .await
    }

    async fn resolve_name(&self, name: &str) -> eyre::Result<Option<Address>> {
        let node = namehash(name);

        let registry_call = IEnsRegistry::resolverCall { node }.abi_encode();
        let Some(resolver) = self.call_for_address(ENS_REGISTRY, registry_call).await? else {
            tracing::debug!(chain = %self.chain, name, "No resolver set for name");
            return Ok(None);
        };

        let addr_call = IEnsResolver::addrCall { node }.abi_encode();
        self.call_for_address(resolver, addr_call).await
    }
}

/// EIP-137 namehash over lowercased labels.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    let lower = name.to_ascii_lowercase();
    for label in lower.rsplit('.').filter(|l| !l.is_empty()) {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

/// First ABI word of a call result as an address; the zero address means unset.
fn decode_address_word(output: &[u8]) -> Option<Address> {
    if output.len() < 32 {
        return None;
    }
    let address = Address::from_word(B256::from_slice(&output[..32]));
    (!address.is_zero()).then_some(address)
}
