//! In-memory doubles for the crate's remote and storage traits.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::chains::registry::{ChainCapabilities, ChainDescriptor};
use crate::db::models::{
    NewWallet, NewWalletChain, SyncStatus, TransferFilter, TransferRecord, TransferUpsert,
    WalletChainRecord, WalletRecord,
};
use crate::db::store::WalletStore;
use crate::error::{Result, ScanError};
use crate::price::PriceOracle;
use crate::rpc::types::{
    parse_hex_u64, AssetTransferParams, AssetTransferResponse, RawAssetTransfer, RawContract,
    RawTokenBalance, TokenMetadata,
};
use crate::rpc::{ChainClient, ChainClients};

/// Enhanced-API chain without internal transfers or name resolution.
pub fn chain(chain_id: i64, name: &str) -> ChainDescriptor {
    ChainDescriptor {
        name: name.to_string(),
        chain_id,
        rpc_url: format!("http://localhost:8545/{}", chain_id),
        native_symbol: "ETH".to_string(),
        capabilities: ChainCapabilities {
            enhanced_transfers: true,
            internal_transfers: false,
            name_resolution: false,
        },
    }
}

pub fn clients(entries: Vec<(i64, Arc<MockChainClient>)>) -> ChainClients {
    entries
        .into_iter()
        .map(|(id, client)| (id, client as Arc<dyn ChainClient>))
        .collect()
}

/// A provider row moving one whole unit (18 decimals) of `asset`.
pub fn raw_transfer(
    hash: &str,
    asset: &str,
    category: &str,
    block: u64,
    from: &str,
    to: &str,
) -> RawAssetTransfer {
    let is_nft = matches!(category, "erc721" | "erc1155");
    RawAssetTransfer {
        block_num: format!("0x{:x}", block),
        unique_id: Some(format!("{}:{}", hash, category)),
        hash: hash.to_string(),
        from: from.to_string(),
        to: Some(to.to_string()),
        value: if is_nft { None } else { Some(1.0) },
        erc721_token_id: if category == "erc721" { Some("0x01".to_string()) } else { None },
        asset: Some(asset.to_string()),
        category: category.to_string(),
        raw_contract: RawContract {
            value: if is_nft { None } else { Some("0xde0b6b3a7640000".to_string()) },
            address: None,
            decimal: if is_nft { None } else { Some("0x12".to_string()) },
        },
        ..Default::default()
    }
}

// ============================================================
// Chain client
// ============================================================

#[derive(Default)]
pub struct MockChainClient {
    unreachable: bool,
    transfers_fail: bool,
    tx_count: u64,
    balance: U256,
    outgoing: Vec<Vec<RawAssetTransfer>>,
    incoming: Vec<Vec<RawAssetTransfer>>,
    token_balances: Vec<RawTokenBalance>,
    token_metadata: HashMap<String, TokenMetadata>,
    names: HashMap<String, Address>,
    block_times: HashMap<u64, DateTime<Utc>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_tx_count(mut self, count: u64) -> Self {
        self.tx_count = count;
        self
    }

    pub fn with_balance(mut self, wei: U256) -> Self {
        self.balance = wei;
        self
    }

    /// Pages served for sender-filtered queries; page keys are page indexes.
    pub fn with_outgoing_pages(mut self, pages: Vec<Vec<RawAssetTransfer>>) -> Self {
        self.outgoing = pages;
        self
    }

    pub fn with_incoming_pages(mut self, pages: Vec<Vec<RawAssetTransfer>>) -> Self {
        self.incoming = pages;
        self
    }

    /// Only the transfer API fails; counts and balances still answer.
    pub fn failing_transfers(mut self) -> Self {
        self.transfers_fail = true;
        self
    }

    pub fn with_token_balances(mut self, balances: Vec<RawTokenBalance>) -> Self {
        self.token_balances = balances;
        self
    }

    pub fn with_token_metadata(mut self, contract: &str, metadata: TokenMetadata) -> Self {
        self.token_metadata.insert(contract.to_lowercase(), metadata);
        self
    }

    pub fn with_name(mut self, name: &str, address: Address) -> Self {
        self.names.insert(name.to_string(), address);
        self
    }

    pub fn with_block_time(mut self, block: u64, at: DateTime<Utc>) -> Self {
        self.block_times.insert(block, at);
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn record(&self, method: &'static str) -> eyre::Result<()> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
        if self.unreachable {
            return Err(eyre::eyre!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn transaction_count(&self, _address: Address) -> eyre::Result<u64> {
        self.record("transaction_count")?;
        Ok(self.tx_count)
    }

    async fn native_balance(&self, _address: Address) -> eyre::Result<U256> {
        self.record("native_balance")?;
        Ok(self.balance)
    }

    async fn block_timestamp(&self, block_number: u64) -> eyre::Result<Option<DateTime<Utc>>> {
        self.record("block_timestamp")?;
        Ok(self.block_times.get(&block_number).copied())
    }

    async fn asset_transfers(
        &self,
        params: &AssetTransferParams,
    ) -> eyre::Result<AssetTransferResponse> {
        self.record("asset_transfers")?;
        if self.transfers_fail {
            return Err(eyre::eyre!("alchemy_getAssetTransfers failed after 3 attempts"));
        }

        let pages = if params.from_address.is_some() {
            &self.outgoing
        } else {
            &self.incoming
        };
        let index = params
            .page_key
            .as_deref()
            .and_then(|k| k.parse::<usize>().ok())
            .unwrap_or(0);
        let max_count = parse_hex_u64(&params.max_count).unwrap_or(1000) as usize;

        let mut transfers = pages.get(index).cloned().unwrap_or_default();
        transfers.truncate(max_count);
        let page_key = (index + 1 < pages.len()).then(|| (index + 1).to_string());

        Ok(AssetTransferResponse {
            transfers,
            page_key,
        })
    }

    async fn token_balances(&self, _address: Address) -> eyre::Result<Vec<RawTokenBalance>> {
        self.record("token_balances")?;
        Ok(self.token_balances.clone())
    }

    async fn token_metadata(&self, contract: Address) -> eyre::Result<TokenMetadata> {
        self.record("token_metadata")?;
        self.token_metadata
            .get(&contract.to_string().to_lowercase())
            .cloned()
            .ok_or_else(|| eyre::eyre!("no metadata for {}", contract))
    }

    async fn resolve_name(&self, name: &str) -> eyre::Result<Option<Address>> {
        self.record("resolve_name")?;
        Ok(self.names.get(name).copied())
    }
}

// ============================================================
// Price oracle
// ============================================================

#[derive(Default)]
pub struct MockPriceOracle {
    prices: HashMap<String, f64>,
    token_prices: HashMap<(i64, String), f64>,
    failing: bool,
    lookups: AtomicUsize,
}

impl MockPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, asset: &str, usd: f64) -> Self {
        self.prices.insert(asset.to_ascii_uppercase(), usd);
        self
    }

    pub fn with_token_price(mut self, chain_id: i64, contract: &str, usd: f64) -> Self {
        self.token_prices.insert((chain_id, contract.to_ascii_lowercase()), usd);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn get_price(&self, asset: &str) -> eyre::Result<Option<f64>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(eyre::eyre!("price service unavailable"));
        }
        Ok(self.prices.get(&asset.to_ascii_uppercase()).copied())
    }

    async fn get_token_price(&self, chain_id: i64, contract: &str) -> eyre::Result<Option<f64>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(eyre::eyre!("price service unavailable"));
        }
        Ok(self
            .token_prices
            .get(&(chain_id, contract.to_ascii_lowercase()))
            .copied())
    }
}

// ============================================================
// Wallet store
// ============================================================

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    wallets: Vec<WalletRecord>,
    chains: Vec<WalletChainRecord>,
    transfers: Vec<TransferRecord>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_chains(
        &mut self,
        wallet_id: i64,
        records: &[NewWalletChain],
    ) -> Vec<WalletChainRecord> {
        let mut inserted = Vec::with_capacity(records.len());
        for r in records {
            let row = WalletChainRecord {
                id: self.next_id(),
                wallet_id,
                chain_id: r.chain_id,
                chain_name: r.chain_name.clone(),
                has_activity: r.has_activity,
                transaction_count: r.transaction_count,
                native_balance: r.native_balance.clone(),
                native_balance_usd: r.native_balance_usd.clone(),
                last_activity_at: r.last_activity_at,
                last_activity_description: r.last_activity_description.clone(),
                sync_status: SyncStatus::Pending,
                last_synced_at: None,
            };
            self.chains.push(row.clone());
            inserted.push(row);
        }
        inserted
    }
}

/// `WalletStore` over plain vectors, with the same key semantics as the
/// Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing_hashes: HashSet<String>,
    failing_statuses: Vec<(i64, SyncStatus)>,
    failing_chain_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts of transfers with this hash fail.
    pub fn failing_upsert_for(mut self, tx_hash: &str) -> Self {
        self.failing_hashes.insert(tx_hash.to_ascii_lowercase());
        self
    }

    /// Setting `status` on `chain_id` fails.
    pub fn failing_status_for(mut self, chain_id: i64, status: SyncStatus) -> Self {
        self.failing_statuses.push((chain_id, status));
        self
    }

    /// Chain record inserts fail, rolling back whatever write they belong to.
    pub fn failing_chain_writes(self) -> Self {
        self.set_chain_writes_failing(true);
        self
    }

    pub fn set_chain_writes_failing(&self, failing: bool) {
        self.failing_chain_writes.store(failing, Ordering::SeqCst);
    }

    pub fn wallets(&self) -> Vec<WalletRecord> {
        self.state.lock().unwrap().wallets.clone()
    }

    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.state.lock().unwrap().transfers.clone()
    }

    pub fn chain_records(&self) -> Vec<WalletChainRecord> {
        self.state.lock().unwrap().chains.clone()
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn find_wallet_by_address(
        &self,
        scope: &str,
        address: &str,
    ) -> Result<Option<WalletRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .wallets
            .iter()
            .find(|w| w.is_active && w.scope == scope && w.address.eq_ignore_ascii_case(address))
            .cloned())
    }

    async fn get_wallet(&self, wallet_id: i64) -> Result<Option<WalletRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.wallets.iter().find(|w| w.id == wallet_id).cloned())
    }

    async fn insert_wallet_with_chains(
        &self,
        wallet: &NewWallet,
        records: &[NewWalletChain],
    ) -> Result<(WalletRecord, Vec<WalletChainRecord>)> {
        let mut state = self.state.lock().unwrap();
        let taken = state.wallets.iter().any(|w| {
            w.is_active && w.scope == wallet.scope && w.address.eq_ignore_ascii_case(&wallet.address)
        });
        if taken {
            return Err(ScanError::DuplicateWallet {
                scope: wallet.scope.clone(),
                address: wallet.address.clone(),
            });
        }
        if self.failing_chain_writes.load(Ordering::SeqCst) {
            return Err(ScanError::PersistenceConflict(
                "injected chain record failure".to_string(),
            ));
        }

        let record = WalletRecord {
            id: state.next_id(),
            scope: wallet.scope.clone(),
            address: wallet.address.clone(),
            label: wallet.label.clone(),
            is_active: true,
            last_synced_at: None,
            created_at: Utc::now(),
        };
        state.wallets.push(record.clone());
        let chains = state.push_chains(record.id, records);
        Ok((record, chains))
    }

    async fn replace_chain_records(
        &self,
        wallet_id: i64,
        records: &[NewWalletChain],
    ) -> Result<Vec<WalletChainRecord>> {
        if self.failing_chain_writes.load(Ordering::SeqCst) {
            return Err(ScanError::PersistenceConflict(
                "injected chain record failure".to_string(),
            ));
        }
        let mut state = self.state.lock().unwrap();
        state.chains.retain(|c| c.wallet_id != wallet_id);
        Ok(state.push_chains(wallet_id, records))
    }

    async fn list_chain_records(&self, wallet_id: i64) -> Result<Vec<WalletChainRecord>> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<_> = state
            .chains
            .iter()
            .filter(|c| c.wallet_id == wallet_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.chain_id);
        Ok(rows)
    }

    async fn set_chain_sync_status(
        &self,
        wallet_id: i64,
        chain_id: i64,
        status: SyncStatus,
    ) -> Result<()> {
        if self.failing_statuses.contains(&(chain_id, status)) {
            return Err(ScanError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().unwrap();
        for c in state
            .chains
            .iter_mut()
            .filter(|c| c.wallet_id == wallet_id && c.chain_id == chain_id)
        {
            c.sync_status = status;
            if status == SyncStatus::Synced {
                c.last_synced_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn mark_wallet_synced(&self, wallet_id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(w) = state.wallets.iter_mut().find(|w| w.id == wallet_id) {
            w.last_synced_at = Some(at);
        }
        Ok(())
    }

    async fn upsert_transfer(&self, t: &TransferUpsert) -> Result<()> {
        if self.failing_hashes.contains(&t.tx_hash.to_ascii_lowercase()) {
            return Err(ScanError::PersistenceConflict(format!(
                "injected failure for {}",
                t.tx_hash
            )));
        }

        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let existing = state.transfers.iter_mut().find(|r| {
            r.wallet_id == t.wallet_id
                && r.tx_hash == t.tx_hash
                && r.chain_id == t.chain_id
                && r.asset == t.asset
                && r.category == t.category
        });

        match existing {
            Some(r) => {
                r.block_number = t.block_number;
                r.block_timestamp = t.block_timestamp;
                r.from_address = t.from_address.clone();
                r.to_address = t.to_address.clone();
                r.value = t.value.clone();
                r.value_usd = t.value_usd.clone();
                r.direction = t.direction;
                r.contract_address = t.contract_address.clone();
                r.contract_decimals = t.contract_decimals;
                r.raw_value = t.raw_value.clone();
                r.metadata = t.metadata.clone();
                r.updated_at = now;
            }
            None => {
                let id = state.next_id();
                state.transfers.push(TransferRecord {
                    id,
                    wallet_id: t.wallet_id,
                    chain_id: t.chain_id,
                    tx_hash: t.tx_hash.clone(),
                    asset: t.asset.clone(),
                    category: t.category,
                    block_number: t.block_number,
                    block_timestamp: t.block_timestamp,
                    from_address: t.from_address.clone(),
                    to_address: t.to_address.clone(),
                    value: t.value.clone(),
                    value_usd: t.value_usd.clone(),
                    direction: t.direction,
                    contract_address: t.contract_address.clone(),
                    contract_decimals: t.contract_decimals,
                    raw_value: t.raw_value.clone(),
                    metadata: t.metadata.clone(),
                    created_at: now,
                    updated_at: now,
                });
            }
        }
        Ok(())
    }

    async fn list_transfers(
        &self,
        wallet_id: i64,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferRecord>> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<_> = state
            .transfers
            .iter()
            .filter(|r| r.wallet_id == wallet_id)
            .filter(|r| filter.chain_id.map_or(true, |id| r.chain_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.block_number.cmp(&a.block_number).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }

    async fn count_transfers(&self, wallet_id: i64) -> Result<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .transfers
            .iter()
            .filter(|r| r.wallet_id == wallet_id)
            .count() as i64)
    }
}
