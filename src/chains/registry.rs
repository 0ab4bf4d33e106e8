use serde::Serialize;

use crate::config::ChainConfig;

/// Every chain in scope uses 18 decimals for its native currency.
pub const NATIVE_DECIMALS: u8 = 18;

/// Capability flags advertised by a chain's endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChainCapabilities {
    pub enhanced_transfers: bool,
    pub internal_transfers: bool,
    pub name_resolution: bool,
}

/// Immutable description of a supported chain, built once from config.
#[derive(Debug, Clone, Serialize)]
pub struct ChainDescriptor {
    pub name: String,
    pub chain_id: i64,
    #[serde(skip)]
    pub rpc_url: String,
    pub native_symbol: String,
    pub capabilities: ChainCapabilities,
}

impl ChainDescriptor {
    pub fn from_config(config: &ChainConfig) -> Self {
        Self {
            name: config.name.clone(),
            chain_id: config.chain_id as i64,
            rpc_url: config.rpc_http.clone(),
            native_symbol: config.native_symbol.clone(),
            capabilities: ChainCapabilities {
                enhanced_transfers: config.enhanced_transfers,
                internal_transfers: config.internal_transfers,
                name_resolution: config.name_resolution,
            },
        }
    }
}

/// Static table of supported chains, in configuration order.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainDescriptor>) -> Self {
        Self { chains }
    }

    pub fn from_config(chains: &[ChainConfig]) -> Self {
        let chains = chains.iter().map(ChainDescriptor::from_config).collect::<Vec<_>>();
        for chain in &chains {
            tracing::debug!(
                chain = %chain.name,
                chain_id = chain.chain_id,
                capabilities = ?chain.capabilities,
                "Registered chain"
            );
        }
        Self { chains }
    }

    pub fn list_chains(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    pub fn get(&self, chain_id: i64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    /// The single chain designated for alias resolution, if any.
    pub fn name_resolver(&self) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.capabilities.name_resolution)
    }
}
