//! Keys, signatures and the thin wallet
//!
//! This module holds the P-256 key pair, the strict signature codec,
//! the single-key file store and coin selection for building payments.

pub mod key_store;
pub mod keys;
pub mod signature;
#[allow(clippy::module_inception)]
pub mod wallet;

pub use key_store::{KeyStore, DEFAULT_KEY_FILE};
pub use keys::{KeyPair, PublicKey, PUBLIC_KEY_LEN};
pub use signature::{sign, Signature};
pub use wallet::{
    balance, build_transaction, is_valid_address, select_coins, CoinSelection, ADDRESS_LEN,
};
