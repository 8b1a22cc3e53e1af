//! Test utilities for ledger testing

use crate::core::{mine_at, Block, Blockchain, Ledger, Transaction};
use crate::error::Result;
use crate::wallet::KeyPair;

/// Seconds between the blocks produced by these helpers
pub const TEST_BLOCK_SPACING: i64 = 10;

/// Create a chain holding only the genesis block
pub fn create_test_blockchain() -> Result<Blockchain> {
    Blockchain::new()
}

/// Create several independent in-memory nodes
pub fn create_test_network(node_count: usize) -> Result<Vec<Ledger>> {
    (0..node_count).map(|_| Ledger::new()).collect()
}

/// Create fresh key pairs
pub fn create_test_key_pairs(count: usize) -> Result<Vec<KeyPair>> {
    (0..count).map(|_| KeyPair::generate()).collect()
}

/// Mine the next block on `blockchain` with a coinbase for `miner` followed by `transactions`
pub fn mine_test_block(
    blockchain: &Blockchain,
    miner: &str,
    transactions: Vec<Transaction>,
) -> Result<Block> {
    let tip = blockchain.latest_block();
    let mut data = vec![Transaction::new_coinbase(miner, tip.get_index() + 1)];
    data.extend(transactions);
    mine_at(
        tip,
        data,
        blockchain.next_difficulty(),
        tip.get_timestamp() + TEST_BLOCK_SPACING,
    )
}

/// Append `count` coinbase-only blocks for `miner`
pub fn extend_test_blockchain(blockchain: &mut Blockchain, miner: &str, count: usize) -> Result<()> {
    for _ in 0..count {
        let block = mine_test_block(blockchain, miner, vec![])?;
        blockchain.add_block(block)?;
    }
    Ok(())
}

/// Re-validate the chain and the UTXO set it claims
pub fn validate_blockchain_integrity(blockchain: &Blockchain) -> Result<bool> {
    let rebuilt = Blockchain::from_blocks(blockchain.get_blocks().to_vec())?;
    Ok(rebuilt.get_utxo_set() == blockchain.get_utxo_set())
}

/// Two chains sharing the first `fork_point` blocks after genesis, then diverging
/// for `main_length` and `fork_length` blocks respectively
pub fn create_fork_scenario(
    fork_point: usize,
    main_length: usize,
    fork_length: usize,
    main_miner: &str,
    fork_miner: &str,
) -> Result<(Blockchain, Blockchain)> {
    let mut main = create_test_blockchain()?;
    extend_test_blockchain(&mut main, main_miner, fork_point)?;
    let mut fork = main.clone();
    extend_test_blockchain(&mut main, main_miner, main_length)?;
    extend_test_blockchain(&mut fork, fork_miner, fork_length)?;
    Ok((main, fork))
}
