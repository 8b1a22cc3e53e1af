//! # Ledger Chain
//!
//! A small proof-of-work ledger with an unspent-output transaction model.
//!
//! ## What is in here
//! - **Chain & mining**: linked blocks, SHA-256 proof-of-work, retargeting every ten blocks
//! - **Transactions**: UTXO inputs and outputs, coinbase rewards, signature checks
//! - **Pool**: pending transactions, kept free of conflicting spends
//! - **Signatures**: P-256 ECDSA with a strict low-S DER-style encoding
//! - **Network**: JSON gossip over TCP plus a local control surface
//!
//! ## Layout
//! - `core/`: blocks, transactions, proof-of-work, difficulty, the chain and the `Ledger` handle
//! - `storage/`: the UTXO set and the transaction pool
//! - `wallet/`: keys, signatures, the key file and coin selection
//! - `network/`: gossip messages, chain sync and the TCP server
//! - `config/`: node settings from the environment
//! - `utils/`: hashing, hex and JSON helpers
//! - `cli/`: command-line parsing for the binary
//! - `testnet/`: chain and fork builders for tests
//!
//! All state lives in memory; a restarted node comes back with only the genesis block
//! and catches up from its peers.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    is_valid_block, is_valid_chain, Block, Blockchain, DifficultyAdjustment, Ledger, MiningJob,
    ProofOfWork, Transaction, TxIn, TxOut,
};
pub use error::{LedgerError, Result, SignatureFormatError};
pub use network::{send_control, ControlRequest, ControlResponse, Message, Nodes, Server};
pub use storage::{TransactionPool, UnspentTxOut, UtxoSet};
pub use wallet::{KeyPair, KeyStore, PublicKey, Signature};
