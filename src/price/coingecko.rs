use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use super::PriceOracle;
use crate::config::PriceConfig;

/// Built-in symbol -> CoinGecko id table. Config entries override these.
const DEFAULT_IDS: &[(&str, &str)] = &[
    ("ETH", "ethereum"),
    ("WETH", "weth"),
    ("POL", "polygon-ecosystem-token"),
    ("MATIC", "matic-network"),
    ("BNB", "binancecoin"),
    ("AVAX", "avalanche-2"),
    ("ARB", "arbitrum"),
    ("OP", "optimism"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
    ("DAI", "dai"),
    ("WBTC", "wrapped-bitcoin"),
];

/// Chain id -> CoinGecko asset platform, for pricing tokens by contract.
const PLATFORMS: &[(i64, &str)] = &[
    (1, "ethereum"),
    (10, "optimistic-ethereum"),
    (56, "binance-smart-chain"),
    (137, "polygon-pos"),
    (8453, "base"),
    (42161, "arbitrum-one"),
    (43114, "avalanche"),
];

pub fn platform(chain_id: i64) -> Option<&'static str> {
    PLATFORMS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, platform)| *platform)
}

/// `simple/price` and `simple/token_price` client for the CoinGecko public API.
pub struct CoinGeckoOracle {
    http: reqwest::Client,
    base_url: String,
    ids: HashMap<String, String>,
}

impl CoinGeckoOracle {
    pub fn from_config(config: &PriceConfig) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| eyre::eyre!("Failed to build price HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ids: id_table(&config.ids),
        })
    }

    pub fn coin_id(&self, asset: &str) -> Option<&str> {
        self.ids.get(&asset.to_ascii_uppercase()).map(String::as_str)
    }
}

fn id_table(overrides: &HashMap<String, String>) -> HashMap<String, String> {
    let mut ids: HashMap<String, String> = DEFAULT_IDS
        .iter()
        .map(|(symbol, id)| (symbol.to_string(), id.to_string()))
        .collect();
    for (symbol, id) in overrides {
        ids.insert(symbol.to_ascii_uppercase(), id.clone());
    }
    ids
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn get_price(&self, asset: &str) -> eyre::Result<Option<f64>> {
        let Some(coin_id) = self.coin_id(asset) else {
            return Ok(None);
        };

        let url = format!("{}/simple/price", self.base_url);
        let body: HashMap<String, HashMap<String, f64>> = self
            .http
            .get(&url)
            .query(&[("ids", coin_id), ("vs_currencies", "usd")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let price = body.get(coin_id).and_then(|quotes| quotes.get("usd")).copied();
        tracing::debug!(asset, coin_id, ?price, "Fetched price");
        Ok(price)
    }

    async fn get_token_price(&self, chain_id: i64, contract: &str) -> eyre::Result<Option<f64>> {
        let Some(platform) = platform(chain_id) else {
            return Ok(None);
        };
        let contract = contract.to_ascii_lowercase();

        let url = format!("{}/simple/token_price/{}", self.base_url, platform);
        // keyed by lowercased contract address
        let body: HashMap<String, HashMap<String, f64>> = self
            .http
            .get(&url)
            .query(&[("contract_addresses", contract.as_str()), ("vs_currencies", "usd")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let price = body.get(&contract).and_then(|quotes| quotes.get("usd")).copied();
        tracing::debug!(chain_id, platform, %contract, ?price, "Fetched token price");
        Ok(price)
    }
}
