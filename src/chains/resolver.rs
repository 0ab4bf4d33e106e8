use alloy::primitives::Address;
use std::sync::Arc;

use super::address::{is_alias_name, is_valid_address, parse_address};
use super::registry::ChainRegistry;
use crate::error::ScanError;
use crate::rpc::{ChainClient, ChainClients};

/// Resolves name-service aliases through the one chain designated for it.
pub struct AliasResolver {
    target: Option<(String, Arc<dyn ChainClient>)>,
}

impl AliasResolver {
    pub fn new(registry: &ChainRegistry, clients: &ChainClients) -> Self {
        let target = registry.name_resolver().and_then(|chain| {
            clients
                .get(&chain.chain_id)
                .map(|client| (chain.name.clone(), client.clone()))
        });
        Self { target }
    }

    pub fn is_supported(&self) -> bool {
        self.target.is_some()
    }

    /// Resolve `name` to an address. Strings that are not aliases are
    /// rejected before any remote call.
    pub async fn resolve(&self, name: &str) -> Result<Address, ScanError> {
        if !is_alias_name(name) {
            return Err(ScanError::InvalidAddress(name.to_string()));
        }
        let Some((chain, client)) = &self.target else {
            return Err(ScanError::ResolutionUnsupported(name.to_string()));
        };

        let normalized = name.to_ascii_lowercase();
        match client.resolve_name(&normalized).await {
            Ok(Some(address)) => {
                tracing::info!(chain = %chain, name = %normalized, %address, "Resolved alias");
                Ok(address)
            }
            Ok(None) => Err(ScanError::ResolutionFailed {
                name: name.to_string(),
                reason: "name has no address record".to_string(),
            }),
            Err(e) => {
                tracing::warn!(chain = %chain, name = %normalized, error = %e, "Alias resolution failed");
                Err(ScanError::ResolutionFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Accept either a hex address or an alias from a caller.
    pub async fn resolve_wallet_input(&self, input: &str) -> Result<Address, ScanError> {
        let input = input.trim();
        if is_valid_address(input) {
            return parse_address(input);
        }
        if is_alias_name(input) {
            return self.resolve(input).await;
        }
        Err(ScanError::InvalidAddress(input.to_string()))
    }
}
