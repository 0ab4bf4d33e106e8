pub mod models;
pub mod repository;
pub mod store;

pub use repository::PgWalletStore;
pub use store::WalletStore;
