use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::PriceOracle;

/// Time-boxed price cache in front of another oracle.
///
/// Successful lookups are cached, including "no price" answers; errors are
/// not. Entries may be up to `ttl` stale.
pub struct CachedPriceOracle {
    inner: Arc<dyn PriceOracle>,
    cache: Cache<String, Option<f64>>,
}

impl CachedPriceOracle {
    pub fn new(inner: Arc<dyn PriceOracle>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl PriceOracle for CachedPriceOracle {
    async fn get_price(&self, asset: &str) -> eyre::Result<Option<f64>> {
        let key = asset.to_ascii_uppercase();
        if let Some(price) = self.cache.get(&key).await {
            return Ok(price);
        }

        let price = self.inner.get_price(&key).await?;
        self.cache.insert(key, price).await;
        Ok(price)
    }

    async fn get_token_price(&self, chain_id: i64, contract: &str) -> eyre::Result<Option<f64>> {
        // symbols never contain ':', so token keys cannot collide with them
        let key = format!("{}:{}", chain_id, contract.to_ascii_lowercase());
        if let Some(price) = self.cache.get(&key).await {
            return Ok(price);
        }

        let price = self.inner.get_token_price(chain_id, contract).await?;
        self.cache.insert(key, price).await;
        Ok(price)
    }
}
