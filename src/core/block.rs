use crate::core::{hash_meets_difficulty, Transaction, TxIn, TxOut, COINBASE_AMOUNT};
use crate::utils::sha256_hex;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const GENESIS_TIMESTAMP: i64 = 1465154705;

/// Recipient of the genesis reward
pub const GENESIS_ADDRESS: &str = "04bfcab8722991ae774db48f934ca79cfb7dd991229153b9f732ba5334aafcd8e7266e47076996b55a14bf9913ee3145ce0cfc1372ada8ada74bd287450313534a";

static GENESIS_BLOCK: Lazy<Block> = Lazy::new(|| {
    let coinbase = Transaction::new(
        vec![TxIn::new("", 0, "")],
        vec![TxOut::new(GENESIS_ADDRESS, COINBASE_AMOUNT)],
    );
    Block::new(0, "", GENESIS_TIMESTAMP, vec![coinbase], 0, 0)
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    previous_hash: String,
    timestamp: i64,
    data: Vec<Transaction>,
    hash: String,
    difficulty: u32,
    nonce: u64,
}

/// Everything in the hash preimage except the trailing nonce
pub fn hash_prefix(
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    data: &[Transaction],
    difficulty: u32,
) -> String {
    let mut preimage = format!("{index}{previous_hash}{timestamp}");
    for tx in data {
        tx.write_preimage(&mut preimage);
    }
    preimage.push_str(&difficulty.to_string());
    preimage
}

pub fn calculate_hash(
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    data: &[Transaction],
    difficulty: u32,
    nonce: u64,
) -> String {
    let mut preimage = hash_prefix(index, previous_hash, timestamp, data, difficulty);
    preimage.push_str(&nonce.to_string());
    sha256_hex(preimage.as_bytes())
}

impl Block {
    /// Assembles a block and fills in its hash. No proof-of-work is done here.
    pub fn new(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        data: Vec<Transaction>,
        difficulty: u32,
        nonce: u64,
    ) -> Block {
        let hash = calculate_hash(index, previous_hash, timestamp, &data, difficulty, nonce);
        Block {
            index,
            previous_hash: previous_hash.to_string(),
            timestamp,
            data,
            hash,
            difficulty,
            nonce,
        }
    }

    /// Takes every field verbatim, including the claimed hash
    pub fn from_parts(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        data: Vec<Transaction>,
        hash: &str,
        difficulty: u32,
        nonce: u64,
    ) -> Block {
        Block {
            index,
            previous_hash: previous_hash.to_string(),
            timestamp,
            data,
            hash: hash.to_string(),
            difficulty,
            nonce,
        }
    }

    pub fn genesis() -> Block {
        GENESIS_BLOCK.clone()
    }

    /// Field-by-field comparison with the hard-coded genesis block
    pub fn is_genesis(&self) -> bool {
        *self == *GENESIS_BLOCK
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_data(&self) -> &[Transaction] {
        self.data.as_slice()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn recompute_hash(&self) -> String {
        calculate_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.data,
            self.difficulty,
            self.nonce,
        )
    }

    pub fn has_valid_hash(&self) -> bool {
        self.recompute_hash() == self.hash
    }

    pub fn meets_difficulty(&self) -> bool {
        hash_meets_difficulty(&self.hash, self.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_well_formed() {
        let genesis = Block::genesis();
        assert_eq!(genesis.get_index(), 0);
        assert_eq!(genesis.get_previous_hash(), "");
        assert_eq!(genesis.get_timestamp(), GENESIS_TIMESTAMP);
        assert_eq!(genesis.get_difficulty(), 0);
        assert_eq!(genesis.get_nonce(), 0);
        assert_eq!(genesis.get_data().len(), 1);
        assert!(genesis.has_valid_hash());
        assert_eq!(genesis.get_hash().len(), 64);
        assert!(genesis.is_genesis());

        let coinbase = &genesis.get_data()[0];
        assert_eq!(coinbase.get_tx_outs()[0].get_address(), GENESIS_ADDRESS);
        assert!(coinbase.validate_coinbase(0).is_ok());
    }

    #[test]
    fn test_any_field_change_breaks_genesis_equality() {
        let genesis = Block::genesis();
        let shifted = Block::new(
            0,
            "",
            GENESIS_TIMESTAMP + 1,
            genesis.get_data().to_vec(),
            0,
            0,
        );
        assert!(!shifted.is_genesis());
    }

    #[test]
    fn test_hash_covers_signatures() {
        let tx = Transaction::new(vec![TxIn::new("aa", 0, "")], vec![TxOut::new("b", 1)]);
        let signed = Transaction::from_parts(
            tx.get_id(),
            vec![TxIn::new("aa", 0, "3006")],
            tx.get_tx_outs().to_vec(),
        );
        let a = Block::new(1, "p", 5, vec![tx], 0, 0);
        let b = Block::new(1, "p", 5, vec![signed], 0, 0);
        assert_ne!(a.get_hash(), b.get_hash());
    }

    #[test]
    fn test_tampered_hash_is_detected() {
        let genesis = Block::genesis();
        let forged = Block::from_parts(
            1,
            genesis.get_hash(),
            GENESIS_TIMESTAMP,
            vec![],
            &"0".repeat(64),
            0,
            0,
        );
        assert!(!forged.has_valid_hash());
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let json = serde_json::to_string(&Block::genesis()).unwrap();
        assert!(json.contains("\"previousHash\":\"\""));
        assert!(json.contains("\"txIns\""));
        assert!(json.contains("\"txOutIndex\":0"));
        let back: Block = serde_json::from_str(&json).unwrap();
        assert!(back.is_genesis());
    }
}
