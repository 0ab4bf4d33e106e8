use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use super::models::{
    NewWallet, NewWalletChain, SyncStatus, TransferFilter, TransferRecord, TransferUpsert,
    WalletChainRecord, WalletRecord,
};
use super::store::WalletStore;
use crate::error::{Result, ScanError};

const WALLET_COLUMNS: &str = "id, scope, address, label, is_active, last_synced_at, created_at";

const CHAIN_COLUMNS: &str = "id, wallet_id, chain_id, chain_name, has_activity, transaction_count, \
     native_balance, native_balance_usd, last_activity_at, last_activity_description, \
     sync_status, last_synced_at";

const TRANSFER_COLUMNS: &str = "id, wallet_id, chain_id, tx_hash, asset, category, block_number, \
     block_timestamp, from_address, to_address, value, value_usd, direction, contract_address, \
     contract_decimals, raw_value, metadata, created_at, updated_at";

/// Postgres-backed `WalletStore`.
#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique violations on upsert/replace paths mean the conflict target did
/// not match; report them as `PersistenceConflict`.
fn map_db_error(e: sqlx::Error) -> ScanError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return ScanError::PersistenceConflict(db.message().to_string());
        }
    }
    ScanError::Database(e)
}

/// Insert chain records for a wallet inside the caller's transaction.
async fn insert_chain_rows(
    conn: &mut PgConnection,
    wallet_id: i64,
    records: &[NewWalletChain],
) -> Result<Vec<WalletChainRecord>> {
    let sql = format!(
        "INSERT INTO wallet_chains (wallet_id, chain_id, chain_name, has_activity,
             transaction_count, native_balance, native_balance_usd, last_activity_at,
             last_activity_description, sync_status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
         RETURNING {CHAIN_COLUMNS}"
    );

    let mut inserted = Vec::with_capacity(records.len());
    for record in records {
        let row = sqlx::query_as::<_, WalletChainRecord>(&sql)
            .bind(wallet_id)
            .bind(record.chain_id)
            .bind(&record.chain_name)
            .bind(record.has_activity)
            .bind(record.transaction_count)
            .bind(&record.native_balance)
            .bind(&record.native_balance_usd)
            .bind(record.last_activity_at)
            .bind(&record.last_activity_description)
            .fetch_one(&mut *conn)
            .await
            .map_err(map_db_error)?;
        inserted.push(row);
    }
    Ok(inserted)
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn find_wallet_by_address(
        &self,
        scope: &str,
        address: &str,
    ) -> Result<Option<WalletRecord>> {
        let sql = format!(
            "SELECT {WALLET_COLUMNS} FROM wallets
             WHERE scope = $1 AND LOWER(address) = LOWER($2) AND is_active"
        );
        let wallet = sqlx::query_as::<_, WalletRecord>(&sql)
            .bind(scope)
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;

        Ok(wallet)
    }

    async fn get_wallet(&self, wallet_id: i64) -> Result<Option<WalletRecord>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE id = $1");
        let wallet = sqlx::query_as::<_, WalletRecord>(&sql)
            .bind(wallet_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(wallet)
    }

    async fn insert_wallet_with_chains(
        &self,
        wallet: &NewWallet,
        records: &[NewWalletChain],
    ) -> Result<(WalletRecord, Vec<WalletChainRecord>)> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO wallets (scope, address, label)
             VALUES ($1, $2, $3)
             RETURNING {WALLET_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, WalletRecord>(&sql)
            .bind(&wallet.scope)
            .bind(&wallet.address)
            .bind(&wallet.label)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e.as_database_error() {
                // partial unique index on (scope, LOWER(address)) WHERE is_active
                Some(db) if db.is_unique_violation() => ScanError::DuplicateWallet {
                    scope: wallet.scope.clone(),
                    address: wallet.address.clone(),
                },
                _ => ScanError::Database(e),
            })?;

        let chains = insert_chain_rows(&mut *tx, inserted.id, records).await?;
        tx.commit().await?;

        Ok((inserted, chains))
    }

    async fn replace_chain_records(
        &self,
        wallet_id: i64,
        records: &[NewWalletChain],
    ) -> Result<Vec<WalletChainRecord>> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM wallet_chains WHERE wallet_id = $1")
            .bind(wallet_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let inserted = insert_chain_rows(&mut *tx, wallet_id, records).await?;
        tx.commit().await?;

        tracing::debug!(
            wallet_id,
            deleted,
            inserted = inserted.len(),
            "Replaced wallet chain records"
        );
        Ok(inserted)
    }

    async fn list_chain_records(&self, wallet_id: i64) -> Result<Vec<WalletChainRecord>> {
        let sql = format!(
            "SELECT {CHAIN_COLUMNS} FROM wallet_chains WHERE wallet_id = $1 ORDER BY chain_id"
        );
        let rows = sqlx::query_as::<_, WalletChainRecord>(&sql)
            .bind(wallet_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn set_chain_sync_status(
        &self,
        wallet_id: i64,
        chain_id: i64,
        status: SyncStatus,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE wallet_chains
             SET sync_status = $3,
                 last_synced_at = CASE WHEN $3 = 'synced' THEN NOW() ELSE last_synced_at END
             WHERE wallet_id = $1 AND chain_id = $2",
        )
        .bind(wallet_id)
        .bind(chain_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_wallet_synced(&self, wallet_id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE wallets SET last_synced_at = $2 WHERE id = $1")
            .bind(wallet_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_transfer(&self, t: &TransferUpsert) -> Result<()> {
        sqlx::query(
            "INSERT INTO wallet_transfers (wallet_id, tx_hash, chain_id, asset, category,
                 block_number, block_timestamp, from_address, to_address, value, value_usd,
                 direction, contract_address, contract_decimals, raw_value, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (wallet_id, tx_hash, chain_id, asset, category) DO UPDATE
             SET block_number = EXCLUDED.block_number,
                 block_timestamp = EXCLUDED.block_timestamp,
                 from_address = EXCLUDED.from_address,
                 to_address = EXCLUDED.to_address,
                 value = EXCLUDED.value,
                 value_usd = EXCLUDED.value_usd,
                 direction = EXCLUDED.direction,
                 contract_address = EXCLUDED.contract_address,
                 contract_decimals = EXCLUDED.contract_decimals,
                 raw_value = EXCLUDED.raw_value,
                 metadata = EXCLUDED.metadata,
                 updated_at = NOW()",
        )
        .bind(t.wallet_id)
        .bind(&t.tx_hash)
        .bind(t.chain_id)
        .bind(&t.asset)
        .bind(t.category.as_str())
        .bind(t.block_number)
        .bind(t.block_timestamp)
        .bind(&t.from_address)
        .bind(&t.to_address)
        .bind(&t.value)
        .bind(&t.value_usd)
        .bind(t.direction.as_str())
        .bind(&t.contract_address)
        .bind(t.contract_decimals)
        .bind(&t.raw_value)
        .bind(&t.metadata)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn list_transfers(
        &self,
        wallet_id: i64,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferRecord>> {
        let sql = format!(
            "SELECT {TRANSFER_COLUMNS} FROM wallet_transfers
             WHERE wallet_id = $1 AND ($2::BIGINT IS NULL OR chain_id = $2)
             ORDER BY block_number DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, TransferRecord>(&sql)
            .bind(wallet_id)
            .bind(filter.chain_id)
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn count_transfers(&self, wallet_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM wallet_transfers WHERE wallet_id = $1")
                .bind(wallet_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
