pub mod cache;
pub mod coingecko;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, FromPrimitive};

pub use cache::CachedPriceOracle;
pub use coingecko::CoinGeckoOracle;

/// USD price source keyed by asset symbol or by token contract.
///
/// `Ok(None)` means the oracle has no price for the asset. Callers must keep
/// that distinct from a zero value.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, asset: &str) -> eyre::Result<Option<f64>>;

    /// Price of the token deployed at `contract` on `chain_id`. Oracles
    /// without a contract index price no tokens.
    async fn get_token_price(
        &self,
        _chain_id: i64,
        _contract: &str,
    ) -> eyre::Result<Option<f64>> {
        Ok(None)
    }
}

/// Oracle used when pricing is disabled.
pub struct NoPriceOracle;

#[async_trait]
impl PriceOracle for NoPriceOracle {
    async fn get_price(&self, _asset: &str) -> eyre::Result<Option<f64>> {
        Ok(None)
    }
}

/// Best-effort USD value of `amount` units of `asset`, rounded to cents.
pub async fn usd_value(
    oracle: &dyn PriceOracle,
    asset: &str,
    amount: &BigDecimal,
) -> Option<BigDecimal> {
    priced(oracle.get_price(asset).await, asset, amount)
}

/// Best-effort USD value of a token amount.
///
/// Anything with a contract address is priced by that address alone; a
/// contract calling itself `ETH` gets no price. The symbol is only used for
/// native assets.
pub async fn token_usd_value(
    oracle: &dyn PriceOracle,
    chain_id: i64,
    contract: Option<&str>,
    symbol: &str,
    amount: &BigDecimal,
) -> Option<BigDecimal> {
    match contract {
        Some(contract) => priced(
            oracle.get_token_price(chain_id, contract).await,
            contract,
            amount,
        ),
        None => usd_value(oracle, symbol, amount).await,
    }
}

fn priced(
    lookup: eyre::Result<Option<f64>>,
    asset: &str,
    amount: &BigDecimal,
) -> Option<BigDecimal> {
    let price = match lookup {
        Ok(Some(price)) => price,
        Ok(None) => return None,
        Err(e) => {
            tracing::debug!(asset, error = %e, "Price lookup failed");
            return None;
        }
    };
    let price = BigDecimal::from_f64(price)?;
    Some((amount * &price).round(2))
}
