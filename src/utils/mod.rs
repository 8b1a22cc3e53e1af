//! Utility functions and helpers
//!
//! Hashing, hex encoding, the ring ECDSA calls and JSON helpers
//! used throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_public_key, ecdsa_p256_sha256_sign, ecdsa_p256_sha256_verify,
    hex_decode, hex_encode, new_key_pair, sha256_digest, sha256_hex,
};

pub use serialization::{serialize, to_pretty_json};
