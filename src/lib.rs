pub mod api;
pub mod chains;
pub mod config;
pub mod db;
pub mod error;
pub mod price;
pub mod rpc;
pub mod scanner;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;
