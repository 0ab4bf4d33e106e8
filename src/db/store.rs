use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{
    NewWallet, NewWalletChain, SyncStatus, TransferFilter, TransferRecord, TransferUpsert,
    WalletChainRecord, WalletRecord,
};
use crate::error::Result;

/// Persistence contract of the sync engine.
///
/// Writes are either an idempotent upsert on the transfer identity or a
/// single transaction over a wallet and its chain records, so no locking
/// beyond a single statement/transaction is needed.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Active wallet in `scope` whose address matches case-insensitively.
    async fn find_wallet_by_address(
        &self,
        scope: &str,
        address: &str,
    ) -> Result<Option<WalletRecord>>;

    async fn get_wallet(&self, wallet_id: i64) -> Result<Option<WalletRecord>>;

    /// Insert the wallet and its chain records in one transaction; either
    /// both land or neither does. Fails with `DuplicateWallet` if an active
    /// wallet already holds the address.
    async fn insert_wallet_with_chains(
        &self,
        wallet: &NewWallet,
        records: &[NewWalletChain],
    ) -> Result<(WalletRecord, Vec<WalletChainRecord>)>;

    /// Delete every chain record of the wallet and insert `records`, atomically.
    async fn replace_chain_records(
        &self,
        wallet_id: i64,
        records: &[NewWalletChain],
    ) -> Result<Vec<WalletChainRecord>>;

    async fn list_chain_records(&self, wallet_id: i64) -> Result<Vec<WalletChainRecord>>;

    /// Moving to `Synced` also stamps the chain's `last_synced_at`.
    async fn set_chain_sync_status(
        &self,
        wallet_id: i64,
        chain_id: i64,
        status: SyncStatus,
    ) -> Result<()>;

    async fn mark_wallet_synced(&self, wallet_id: i64, at: DateTime<Utc>) -> Result<()>;

    async fn upsert_transfer(&self, transfer: &TransferUpsert) -> Result<()>;

    /// Newest block first.
    async fn list_transfers(
        &self,
        wallet_id: i64,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferRecord>>;

    async fn count_transfers(&self, wallet_id: i64) -> Result<i64>;
}
