use crate::core::{hash_prefix, Block, Transaction};
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, hex_decode, hex_encode, sha256_digest};
use log::info;
use num_bigint::BigUint;

/// Nonces tried between two checks of the abort condition
pub const NONCE_BATCH: u64 = 1024;

// A hash satisfies `difficulty` when, read as an integer, it is below 2^(bits - difficulty)
fn target_for(bits: usize, difficulty: u32) -> Option<BigUint> {
    let difficulty = difficulty as usize;
    if difficulty > bits {
        return None;
    }
    Some(BigUint::from(1u8) << (bits - difficulty))
}

/// True when `hash` (hex) has at least `difficulty` leading zero bits.
///
/// Difficulty 0 always matches. Non-hex input and difficulties wider than the
/// hash never match.
pub fn hash_meets_difficulty(hash: &str, difficulty: u32) -> bool {
    if difficulty == 0 {
        return true;
    }
    let bytes = match hex_decode(hash) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    match target_for(bytes.len() * 8, difficulty) {
        Some(target) => BigUint::from_bytes_be(&bytes) < target,
        None => false,
    }
}

pub struct ProofOfWork {
    index: u64,
    previous_hash: String,
    timestamp: i64,
    data: Vec<Transaction>,
    difficulty: u32,
    prefix: String,
}

impl ProofOfWork {
    /// Prepares the successor of `previous` carrying `data`
    pub fn new(
        previous: &Block,
        data: Vec<Transaction>,
        difficulty: u32,
        timestamp: i64,
    ) -> ProofOfWork {
        let index = previous.get_index() + 1;
        let prefix = hash_prefix(index, previous.get_hash(), timestamp, &data, difficulty);
        ProofOfWork {
            index,
            previous_hash: previous.get_hash().to_string(),
            timestamp,
            data,
            difficulty,
            prefix,
        }
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Checks both the stored hash and its target for an existing block
    pub fn validate(block: &Block) -> bool {
        block.has_valid_hash() && block.meets_difficulty()
    }

    fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        let mut data = self.prefix.clone().into_bytes();
        data.extend(nonce.to_string().as_bytes());
        data
    }

    pub fn run(self) -> Result<Block> {
        self.run_until(|| false)
    }

    /// Searches nonces from 0 upward, polling `should_abort` every batch
    pub fn run_until<F: FnMut() -> bool>(self, mut should_abort: F) -> Result<Block> {
        let target = target_for(256, self.difficulty).ok_or_else(|| {
            LedgerError::ProofOfWork(format!(
                "difficulty {} exceeds the 256-bit hash width",
                self.difficulty
            ))
        })?;

        info!(
            "Starting proof-of-work for block {} with difficulty {}",
            self.index, self.difficulty
        );
        let mut nonce: u64 = 0;
        loop {
            if nonce % NONCE_BATCH == 0 && should_abort() {
                info!("Abandoning proof-of-work for block {}", self.index);
                return Err(LedgerError::MiningCancelled);
            }
            let digest = sha256_digest(&self.prepare_data(nonce));
            if BigUint::from_bytes_be(&digest) < target {
                let hash = hex_encode(&digest);
                info!(
                    "Proof-of-work completed for block {}: {hash} (nonce: {nonce})",
                    self.index
                );
                return Ok(Block::from_parts(
                    self.index,
                    &self.previous_hash,
                    self.timestamp,
                    self.data,
                    &hash,
                    self.difficulty,
                    nonce,
                ));
            }
            nonce = nonce.checked_add(1).ok_or_else(|| {
                LedgerError::ProofOfWork(format!("nonce space exhausted for block {}", self.index))
            })?;
        }
    }
}

/// Mines the successor of `previous` stamped with the current time
pub fn mine(previous: &Block, data: Vec<Transaction>, difficulty: u32) -> Result<Block> {
    ProofOfWork::new(previous, data, difficulty, current_timestamp()?).run()
}

/// Mines with a caller-chosen timestamp
pub fn mine_at(
    previous: &Block,
    data: Vec<Transaction>,
    difficulty: u32,
    timestamp: i64,
) -> Result<Block> {
    ProofOfWork::new(previous, data, difficulty, timestamp).run()
}

pub fn mine_until<F: FnMut() -> bool>(
    previous: &Block,
    data: Vec<Transaction>,
    difficulty: u32,
    should_abort: F,
) -> Result<Block> {
    ProofOfWork::new(previous, data, difficulty, current_timestamp()?).run_until(should_abort)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase(index: u64) -> Vec<Transaction> {
        vec![Transaction::new_coinbase(crate::core::GENESIS_ADDRESS, index)]
    }

    #[test]
    fn test_hash_meets_difficulty_counts_bits() {
        let hash = format!("0f{}", "ff".repeat(31));
        assert!(hash_meets_difficulty(&hash, 4));
        assert!(!hash_meets_difficulty(&hash, 5));

        let zero_byte = format!("00ff{}", "ff".repeat(30));
        assert!(hash_meets_difficulty(&zero_byte, 8));
        assert!(!hash_meets_difficulty(&zero_byte, 9));
    }

    #[test]
    fn test_hash_meets_difficulty_edges() {
        assert!(hash_meets_difficulty("not hex", 0));
        assert!(!hash_meets_difficulty("not hex", 1));
        assert!(hash_meets_difficulty(&"0".repeat(64), 256));
        assert!(!hash_meets_difficulty(&"0".repeat(64), 257));
    }

    #[test]
    fn test_mined_block_satisfies_its_difficulty() {
        let genesis = Block::genesis();
        let block = mine_at(&genesis, coinbase(1), 8, genesis.get_timestamp() + 10).unwrap();
        assert_eq!(block.get_index(), 1);
        assert_eq!(block.get_previous_hash(), genesis.get_hash());
        assert!(block.has_valid_hash());
        assert!(hash_meets_difficulty(block.get_hash(), 8));
        assert!(ProofOfWork::validate(&block));
    }

    #[test]
    fn test_mining_is_deterministic_for_fixed_inputs() {
        let genesis = Block::genesis();
        let a = mine_at(&genesis, coinbase(1), 4, 1_465_154_800).unwrap();
        let b = mine_at(&genesis, coinbase(1), 4, 1_465_154_800).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_abort_is_observed_before_first_hash() {
        let genesis = Block::genesis();
        let result = mine_until(&genesis, coinbase(1), 64, || true);
        assert_eq!(result, Err(LedgerError::MiningCancelled));
    }

    #[test]
    fn test_impossible_difficulty_is_an_error() {
        let genesis = Block::genesis();
        assert!(matches!(
            mine_at(&genesis, coinbase(1), 300, 0),
            Err(LedgerError::ProofOfWork(_))
        ));
    }
}
