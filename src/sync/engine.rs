use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::chains::address::{canonical, parse_address};
use crate::chains::registry::{ChainDescriptor, ChainRegistry};
use crate::chains::resolver::AliasResolver;
use crate::config::SyncConfig;
use crate::db::models::{
    NewWallet, NewWalletChain, SyncStatus, TransferFilter, TransferRecord, TransferUpsert,
    WalletChainRecord, WalletRecord,
};
use crate::db::store::WalletStore;
use crate::error::{Result, ScanError};
use crate::price::{token_usd_value, PriceOracle};
use crate::rpc::{ChainClient, ChainClients};
use crate::scanner::balances::fetch_token_balances;
use crate::scanner::fetcher::fetch_all_capped;
use crate::scanner::merge::merge;
use crate::scanner::prober::probe_all;
use crate::scanner::types::{Direction, ProbeOutcome, TokenBalance, Transfer};

/// Result of registering a wallet: the stored wallet, one chain record per
/// chain with activity, and the probe outcome of every configured chain.
#[derive(Debug, Clone, Serialize)]
pub struct AddWalletOutcome {
    pub wallet: WalletRecord,
    pub chains: Vec<WalletChainRecord>,
    pub scans: Vec<ProbeOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainSyncReport {
    pub chain_id: i64,
    pub chain_name: String,
    /// Transfers left after merging both directions.
    pub fetched: usize,
    pub persisted: usize,
    pub failed: usize,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub wallet_id: i64,
    pub chains: Vec<ChainSyncReport>,
    /// Ledger size for the wallet after this run, when it could be counted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_transfers: Option<i64>,
}

impl SyncSummary {
    pub fn persisted(&self) -> usize {
        self.chains.iter().map(|c| c.persisted).sum()
    }

    pub fn failed(&self) -> usize {
        self.chains.iter().map(|c| c.failed).sum()
    }
}

/// Orchestrates wallet registration, activity probing and transfer sync.
///
/// Holds no mutable state of its own; every write goes through the store,
/// so concurrent calls for the same wallet converge on the same rows.
pub struct SyncEngine {
    registry: ChainRegistry,
    clients: ChainClients,
    resolver: AliasResolver,
    store: Arc<dyn WalletStore>,
    prices: Arc<dyn PriceOracle>,
    settings: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        registry: ChainRegistry,
        clients: ChainClients,
        store: Arc<dyn WalletStore>,
        prices: Arc<dyn PriceOracle>,
        settings: SyncConfig,
    ) -> Self {
        let resolver = AliasResolver::new(&registry, &clients);
        Self {
            registry,
            clients,
            resolver,
            store,
            prices,
            settings,
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    // ============================================================
    // Wallet registration
    // ============================================================

    /// Register `input` (hex address or alias) in `scope` and record the
    /// chains it is active on.
    pub async fn add_wallet(
        &self,
        scope: &str,
        input: &str,
        label: Option<String>,
    ) -> Result<AddWalletOutcome> {
        let address = self.resolver.resolve_wallet_input(input).await?;
        let canonical_address = canonical(&address);

        if self
            .store
            .find_wallet_by_address(scope, &canonical_address)
            .await?
            .is_some()
        {
            return Err(ScanError::DuplicateWallet {
                scope: scope.to_string(),
                address: canonical_address,
            });
        }

        let scans = probe_all(&self.registry, &self.clients, address, self.prices.as_ref()).await;

        let (wallet, chains) = self
            .store
            .insert_wallet_with_chains(
                &NewWallet {
                    scope: scope.to_string(),
                    address: canonical_address,
                    label,
                },
                &active_chain_records(&scans),
            )
            .await?;

        tracing::info!(
            wallet_id = wallet.id,
            scope,
            address = %wallet.address,
            active_chains = chains.len(),
            "Wallet added"
        );

        Ok(AddWalletOutcome {
            wallet,
            chains,
            scans,
        })
    }

    /// Re-probe every chain and replace the wallet's chain records wholesale.
    pub async fn resync_wallet(
        &self,
        wallet_id: i64,
    ) -> Result<(WalletRecord, Vec<WalletChainRecord>)> {
        let wallet = self.wallet(wallet_id).await?;
        let address = parse_address(&wallet.address)?;

        let scans = probe_all(&self.registry, &self.clients, address, self.prices.as_ref()).await;
        let chains = self
            .store
            .replace_chain_records(wallet.id, &active_chain_records(&scans))
            .await?;

        tracing::info!(
            wallet_id,
            address = %wallet.address,
            active_chains = chains.len(),
            "Wallet rescanned"
        );
        Ok((wallet, chains))
    }

    // ============================================================
    // Transfer sync
    // ============================================================

    /// Pull transfers for every recorded chain with activity, optionally
    /// restricted to `chain_ids`, and upsert them into the ledger.
    pub async fn sync_transactions(
        &self,
        wallet_id: i64,
        chain_ids: Option<Vec<i64>>,
    ) -> Result<SyncSummary> {
        let wallet = self.wallet(wallet_id).await?;
        let address = parse_address(&wallet.address)?;

        let targets: Vec<WalletChainRecord> = self
            .store
            .list_chain_records(wallet_id)
            .await?
            .into_iter()
            .filter(|c| c.has_activity)
            .filter(|c| chain_ids.as_ref().map_or(true, |ids| ids.contains(&c.chain_id)))
            .collect();

        tracing::info!(
            wallet_id,
            address = %wallet.address,
            chains = targets.len(),
            "Transfer sync started"
        );

        let reports = join_all(
            targets
                .iter()
                .map(|record| self.sync_chain(&wallet, address, record)),
        )
        .await;

        if let Err(e) = self.store.mark_wallet_synced(wallet_id, Utc::now()).await {
            tracing::warn!(wallet_id, error = %e, "Failed to record wallet sync time");
        }

        let total_transfers = match self.store.count_transfers(wallet_id).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(wallet_id, error = %e, "Failed to count ledger transfers");
                None
            }
        };

        let summary = SyncSummary {
            wallet_id,
            chains: reports,
            total_transfers,
        };
        tracing::info!(
            wallet_id,
            persisted = summary.persisted(),
            failed = summary.failed(),
            total = ?summary.total_transfers,
            "Transfer sync complete"
        );
        Ok(summary)
    }

    async fn sync_chain(
        &self,
        wallet: &WalletRecord,
        address: Address,
        record: &WalletChainRecord,
    ) -> ChainSyncReport {
        let mut report = ChainSyncReport {
            chain_id: record.chain_id,
            chain_name: record.chain_name.clone(),
            fetched: 0,
            persisted: 0,
            failed: 0,
            status: SyncStatus::Syncing,
            error: None,
        };

        let (chain, client) = match (
            self.registry.get(record.chain_id),
            self.clients.get(&record.chain_id),
        ) {
            (Some(chain), Some(client)) => (chain, client.as_ref()),
            _ => {
                tracing::warn!(
                    wallet_id = wallet.id,
                    chain_id = record.chain_id,
                    "Recorded chain is no longer configured, skipping"
                );
                report.error = Some(ScanError::UnknownChain(record.chain_id).to_string());
                self.record_status(wallet.id, &mut report, SyncStatus::Error).await;
                return report;
            }
        };

        self.record_status(wallet.id, &mut report, SyncStatus::Syncing).await;

        let fetched = fetch_all_capped(
            client,
            chain,
            address,
            self.settings.page_size,
            self.settings.max_transfers_per_chain,
        )
        .await;

        let (outgoing, incoming) = match fetched {
            Ok(pages) => pages,
            Err(e) => {
                let err = ScanError::chain_unreachable(&chain.name, &e);
                tracing::warn!(
                    wallet_id = wallet.id,
                    chain = %chain.name,
                    error = %err,
                    "Transfer fetch failed"
                );
                report.error = Some(err.to_string());
                self.record_status(wallet.id, &mut report, SyncStatus::Error).await;
                return report;
            }
        };

        let transfers = merge(outgoing, incoming);
        report.fetched = transfers.len();

        let mut block_times = HashMap::new();
        for transfer in &transfers {
            let row = self
                .build_upsert(wallet, client, chain, transfer, &mut block_times)
                .await;
            match self.store.upsert_transfer(&row).await {
                Ok(()) => report.persisted += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        wallet_id = wallet.id,
                        chain = %chain.name,
                        tx_hash = %transfer.tx_hash,
                        error = %e,
                        "Failed to persist transfer"
                    );
                }
            }
        }

        if report.failed > 0 {
            let err = ScanError::PartialSyncFailure {
                chain_id: chain.chain_id,
                attempted: report.fetched,
                failed: report.failed,
            };
            tracing::warn!(wallet_id = wallet.id, chain = %chain.name, "{}", err);
        }

        self.record_status(wallet.id, &mut report, SyncStatus::Synced).await;

        tracing::info!(
            wallet_id = wallet.id,
            chain = %chain.name,
            fetched = report.fetched,
            persisted = report.persisted,
            failed = report.failed,
            "Chain transfers synced"
        );
        report
    }

    /// Write a chain's sync status. A failed write is logged and noted on
    /// the report; it never stops the sync of this or any other chain.
    async fn record_status(
        &self,
        wallet_id: i64,
        report: &mut ChainSyncReport,
        status: SyncStatus,
    ) {
        report.status = status;
        if let Err(e) = self
            .store
            .set_chain_sync_status(wallet_id, report.chain_id, status)
            .await
        {
            tracing::warn!(
                wallet_id,
                chain = %report.chain_name,
                status = status.as_str(),
                error = %e,
                "Failed to record chain sync status"
            );
            if report.error.is_none() {
                report.error = Some(format!(
                    "failed to record '{}' status: {}",
                    status.as_str(),
                    e
                ));
            }
        }
    }

    async fn build_upsert(
        &self,
        wallet: &WalletRecord,
        client: &dyn ChainClient,
        chain: &ChainDescriptor,
        transfer: &Transfer,
        block_times: &mut HashMap<u64, DateTime<Utc>>,
    ) -> TransferUpsert {
        let block_timestamp = resolve_block_time(client, chain, transfer, block_times).await;

        let value_usd = match (&transfer.asset, &transfer.value) {
            (Some(asset), Some(value)) => {
                token_usd_value(
                    self.prices.as_ref(),
                    transfer.chain_id,
                    transfer.contract.address.as_deref(),
                    asset,
                    value,
                )
                .await
            }
            _ => None,
        };

        TransferUpsert {
            wallet_id: wallet.id,
            chain_id: transfer.chain_id,
            tx_hash: transfer.tx_hash.clone(),
            asset: transfer.asset_key().to_string(),
            category: transfer.category,
            block_number: transfer.block_number as i64,
            block_timestamp,
            from_address: transfer.from.clone(),
            to_address: transfer.to.clone(),
            value: transfer.value.clone(),
            value_usd,
            direction: Direction::relative_to(&transfer.from, &wallet.address),
            contract_address: transfer.contract.address.clone(),
            contract_decimals: transfer.contract.decimals.map(i16::from),
            raw_value: transfer.contract.raw_value.clone(),
            metadata: transfer.metadata.clone(),
        }
    }

    // ============================================================
    // Reads
    // ============================================================

    pub async fn list_transfers(
        &self,
        wallet_id: i64,
        filter: TransferFilter,
    ) -> Result<Vec<TransferRecord>> {
        self.wallet(wallet_id).await?;
        self.store.list_transfers(wallet_id, &filter).await
    }

    pub async fn list_chains(&self, wallet_id: i64) -> Result<Vec<WalletChainRecord>> {
        self.wallet(wallet_id).await?;
        self.store.list_chain_records(wallet_id).await
    }

    /// Current ERC-20 holdings of the wallet on one chain, fetched live.
    pub async fn token_balances(&self, wallet_id: i64, chain_id: i64) -> Result<Vec<TokenBalance>> {
        let wallet = self.wallet(wallet_id).await?;
        let address = parse_address(&wallet.address)?;

        let chain = self
            .registry
            .get(chain_id)
            .ok_or(ScanError::UnknownChain(chain_id))?;
        let client = self
            .clients
            .get(&chain_id)
            .ok_or(ScanError::UnknownChain(chain_id))?;

        fetch_token_balances(client.as_ref(), chain, address, self.prices.as_ref())
            .await
            .map_err(|e| ScanError::chain_unreachable(&chain.name, e))
    }

    async fn wallet(&self, wallet_id: i64) -> Result<WalletRecord> {
        self.store
            .get_wallet(wallet_id)
            .await?
            .ok_or(ScanError::WalletNotFound(wallet_id))
    }
}

/// Chain records for every probe that found activity. Degraded chains read
/// as inactive and get no record.
fn active_chain_records(scans: &[ProbeOutcome]) -> Vec<NewWalletChain> {
    scans
        .iter()
        .filter(|o| o.has_activity())
        .map(|o| NewWalletChain::from_scan(&o.scan_result()))
        .collect()
}

/// Provider metadata first, then the block header (cached per sync run),
/// then the current time.
async fn resolve_block_time(
    client: &dyn ChainClient,
    chain: &ChainDescriptor,
    transfer: &Transfer,
    cache: &mut HashMap<u64, DateTime<Utc>>,
) -> DateTime<Utc> {
    if let Some(ts) = transfer.block_timestamp {
        return ts;
    }
    if let Some(ts) = cache.get(&transfer.block_number) {
        return *ts;
    }

    match client.block_timestamp(transfer.block_number).await {
        Ok(Some(ts)) => {
            cache.insert(transfer.block_number, ts);
            ts
        }
        Ok(None) => {
            tracing::debug!(chain = %chain.name, block = transfer.block_number, "Block not found, using current time");
            Utc::now()
        }
        Err(e) => {
            tracing::debug!(chain = %chain.name, block = transfer.block_number, error = %e, "Block timestamp lookup failed, using current time");
            Utc::now()
        }
    }
}
