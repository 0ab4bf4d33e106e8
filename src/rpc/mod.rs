pub mod alchemy;
pub mod client;
pub mod retry;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

pub use client::ChainClient;

use crate::chains::registry::ChainRegistry;
use alchemy::AlchemyClient;
use retry::RetryPolicy;

/// One remote client per registered chain id.
pub type ChainClients = HashMap<i64, Arc<dyn ChainClient>>;

/// Build an Alchemy-compatible client for every registered chain.
pub fn connect_all(registry: &ChainRegistry, policy: RetryPolicy) -> eyre::Result<ChainClients> {
    let mut clients: ChainClients = HashMap::new();
    for chain in registry.list_chains() {
        let client = AlchemyClient::connect(chain, policy)?;
        clients.insert(chain.chain_id, Arc::new(client));
    }
    Ok(clients)
}
