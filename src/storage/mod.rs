//! In-memory ledger state
//!
//! The UTXO set and the pool of pending transactions.

pub mod memory_pool;
pub mod utxo_set;

pub use memory_pool::TransactionPool;
pub use utxo_set::{derive_utxo_set, OutPoint, UnspentTxOut, UtxoSet};
