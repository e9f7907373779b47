pub mod models;
pub mod postgres;
pub mod store;

#[cfg(test)]
pub mod memory;

pub use postgres::PgLedgerStore;
pub use store::{LedgerStore, LedgerTx};
