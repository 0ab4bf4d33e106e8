pub mod balances;
pub mod fetcher;
pub mod merge;
pub mod prober;
pub mod types;
