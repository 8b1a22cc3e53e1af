//! Core ledger functionality
//!
//! Blocks, transactions, the canonical chain, proof-of-work, difficulty
//! retargeting and the shared ledger handle.

pub mod block;
pub mod blockchain;
pub mod difficulty;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;

pub use block::{calculate_hash, hash_prefix, Block, GENESIS_ADDRESS, GENESIS_TIMESTAMP};
pub use blockchain::{
    is_valid_block, is_valid_chain, rebuild_utxo_set, validate_block, validate_chain,
    validate_chain_work, validate_work, Blockchain,
};
pub use difficulty::{
    DifficultyAdjustment, BLOCK_GENERATION_INTERVAL, DIFFICULTY_ADJUSTMENT_INTERVAL,
};
pub use ledger::{Ledger, MiningJob};
pub use proof_of_work::{hash_meets_difficulty, mine, mine_at, mine_until, ProofOfWork, NONCE_BATCH};
pub use transaction::{
    process_transactions, transaction_id, validate_block_transactions, Transaction, TxIn, TxOut,
    COINBASE_AMOUNT,
};
