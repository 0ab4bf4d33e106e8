use thiserror::Error;

/// Errors surfaced by the wallet scan / sync engine.
///
/// Remote-I/O failures are normally absorbed at the chain boundary and only
/// show up here as `ChainUnreachable` inside logs and degraded outcomes.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No configured chain can resolve name '{0}'")]
    ResolutionUnsupported(String),

    #[error("Failed to resolve '{name}': {reason}")]
    ResolutionFailed { name: String, reason: String },

    #[error("Wallet {address} already exists in scope '{scope}'")]
    DuplicateWallet { scope: String, address: String },

    #[error("Wallet {0} not found")]
    WalletNotFound(i64),

    #[error("Chain {0} is not configured")]
    UnknownChain(i64),

    #[error("Chain '{chain}' unreachable: {reason}")]
    ChainUnreachable { chain: String, reason: String },

    #[error("Persistence conflict: {0}")]
    PersistenceConflict(String),

    #[error("{failed} of {attempted} transfers failed to persist on chain {chain_id}")]
    PartialSyncFailure {
        chain_id: i64,
        attempted: usize,
        failed: usize,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ScanError {
    pub fn chain_unreachable(chain: &str, err: impl std::fmt::Display) -> Self {
        Self::ChainUnreachable {
            chain: chain.to_string(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
