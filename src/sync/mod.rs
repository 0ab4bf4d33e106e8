pub mod engine;

pub use engine::{AddWalletOutcome, ChainSyncReport, SyncEngine, SyncSummary};
