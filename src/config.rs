use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub price: PriceConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_http: String,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    /// Endpoint serves `alchemy_getAssetTransfers` and friends.
    #[serde(default = "default_true")]
    pub enhanced_transfers: bool,
    /// Endpoint indexes the `internal` transfer category.
    #[serde(default)]
    pub internal_transfers: bool,
    /// Chain hosts the name-service registry used for alias resolution.
    #[serde(default)]
    pub name_resolution: bool,
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================
// Remote call policy
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_rpc_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_rpc_timeout_ms(),
            max_retries: default_rpc_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

fn default_rpc_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    250
}

// ============================================================
// Transfer sync
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_max_transfers_per_chain")]
    pub max_transfers_per_chain: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_transfers_per_chain: default_max_transfers_per_chain(),
            page_size: default_page_size(),
        }
    }
}

fn default_max_transfers_per_chain() -> usize {
    1000
}

fn default_page_size() -> u32 {
    1000
}

// ============================================================
// Price oracle
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct PriceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_price_base_url")]
    pub base_url: String,
    #[serde(default = "default_price_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_price_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default = "default_price_timeout_ms")]
    pub timeout_ms: u64,
    /// Asset symbol -> CoinGecko id. Merged over the built-in table.
    #[serde(default)]
    pub ids: HashMap<String, String>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_price_base_url(),
            cache_ttl_secs: default_price_cache_ttl_secs(),
            cache_capacity: default_price_cache_capacity(),
            timeout_ms: default_price_timeout_ms(),
            ids: HashMap::new(),
        }
    }
}

fn default_price_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_price_cache_ttl_secs() -> u64 {
    300
}

fn default_price_cache_capacity() -> u64 {
    1000
}

fn default_price_timeout_ms() -> u64 {
    5000
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.chains.is_empty() {
            return Err(eyre::eyre!("At least one chain must be configured"));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(eyre::eyre!(
                    "Chain id {} is configured more than once",
                    chain.chain_id
                ));
            }
            chain.rpc_http.parse::<reqwest::Url>().map_err(|e| {
                eyre::eyre!("Invalid RPC URL for chain '{}': {}", chain.name, e)
            })?;
        }

        let resolvers = self.chains.iter().filter(|c| c.name_resolution).count();
        if resolvers > 1 {
            return Err(eyre::eyre!(
                "Only one chain may have name_resolution enabled, found {}",
                resolvers
            ));
        }

        if self.sync.page_size == 0 || self.sync.page_size > 1000 {
            return Err(eyre::eyre!(
                "sync.page_size must be between 1 and 1000, got {}",
                self.sync.page_size
            ));
        }
        Ok(())
    }
}
