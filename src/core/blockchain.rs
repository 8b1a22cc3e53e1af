// This is the canonical chain together with the UTXO set it implies
// Every mutation validates first and only then swaps state, so a rejected
// block or chain leaves everything exactly as it was

use crate::core::{process_transactions, Block, DifficultyAdjustment};
use crate::error::{LedgerError, Result};
use crate::storage::UtxoSet;
use log::info;

/// Structural check of `candidate` as the successor of `previous`.
///
/// Covers index, linkage and the stored hash. The difficulty target is not
/// checked here.
pub fn validate_block(candidate: &Block, previous: &Block) -> Result<()> {
    if previous.get_index().checked_add(1) != Some(candidate.get_index()) {
        return Err(LedgerError::Structural(format!(
            "invalid index {} after {}",
            candidate.get_index(),
            previous.get_index()
        )));
    }
    if previous.get_hash() != candidate.get_previous_hash() {
        return Err(LedgerError::Structural(format!(
            "invalid previousHash in block {}",
            candidate.get_index()
        )));
    }
    let recomputed = candidate.recompute_hash();
    if recomputed != candidate.get_hash() {
        return Err(LedgerError::Structural(format!(
            "invalid hash in block {}: {} != {recomputed}",
            candidate.get_index(),
            candidate.get_hash()
        )));
    }
    Ok(())
}

pub fn is_valid_block(candidate: &Block, previous: &Block) -> bool {
    validate_block(candidate, previous).is_ok()
}

/// Genesis equality followed by pairwise block validation
pub fn validate_chain(candidate: &[Block]) -> Result<()> {
    let genesis = candidate
        .first()
        .ok_or_else(|| LedgerError::Structural("empty chain".to_string()))?;
    if !genesis.is_genesis() {
        return Err(LedgerError::Structural(
            "chain does not start with the genesis block".to_string(),
        ));
    }
    for pair in candidate.windows(2) {
        validate_block(&pair[1], &pair[0])?;
    }
    Ok(())
}

pub fn is_valid_chain(candidate: &[Block]) -> bool {
    validate_chain(candidate).is_ok()
}

/// Proof-of-work check of `candidate` as the successor of `chain`.
///
/// The claimed difficulty must be the one `chain` requires and the hash must meet it.
pub fn validate_work(candidate: &Block, chain: &[Block]) -> Result<()> {
    let required = DifficultyAdjustment::compute_difficulty(chain);
    if candidate.get_difficulty() != required {
        return Err(LedgerError::ProofOfWork(format!(
            "block {} claims difficulty {} but {required} is required",
            candidate.get_index(),
            candidate.get_difficulty()
        )));
    }
    if !candidate.meets_difficulty() {
        return Err(LedgerError::ProofOfWork(format!(
            "hash {} of block {} does not meet difficulty {required}",
            candidate.get_hash(),
            candidate.get_index()
        )));
    }
    Ok(())
}

/// Checks the work of every block after genesis against the prefix before it
pub fn validate_chain_work(blocks: &[Block]) -> Result<()> {
    (1..blocks.len()).try_for_each(|i| validate_work(&blocks[i], &blocks[..i]))
}

/// Folds every block's transactions from an empty set
pub fn rebuild_utxo_set(blocks: &[Block]) -> Result<UtxoSet> {
    blocks.iter().try_fold(UtxoSet::new(), |utxo_set, block| {
        process_transactions(block.get_data(), &utxo_set, block.get_index())
    })
}

#[derive(Debug, Clone)]
pub struct Blockchain {
    // never empty; index 0 is always the genesis block
    blocks: Vec<Block>,
    utxo_set: UtxoSet,
}

impl Blockchain {
    /// A chain holding only the genesis block
    pub fn new() -> Result<Blockchain> {
        let blocks = vec![Block::genesis()];
        let utxo_set = rebuild_utxo_set(&blocks)?;
        Ok(Blockchain { blocks, utxo_set })
    }

    /// Validates `blocks` wholesale and derives their UTXO set
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Blockchain> {
        validate_chain(&blocks)?;
        validate_chain_work(&blocks)?;
        let utxo_set = rebuild_utxo_set(&blocks)?;
        Ok(Blockchain { blocks, utxo_set })
    }

    pub fn get_blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn latest_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn get_utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    // The genesis block is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn find_block(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.get_hash() == hash)
    }

    pub fn next_difficulty(&self) -> u32 {
        DifficultyAdjustment::compute_difficulty(&self.blocks)
    }

    pub fn accumulated_difficulty(&self) -> u128 {
        DifficultyAdjustment::accumulated_difficulty(&self.blocks)
    }

    /// Appends `block` after the tip if it links correctly, carries the required
    /// work and its transactions apply
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        let utxo_set = validate_block(&block, self.latest_block())
            .and_then(|_| validate_work(&block, &self.blocks))
            .and_then(|_| {
                process_transactions(block.get_data(), &self.utxo_set, block.get_index())
            })
            .map_err(|e| {
                LedgerError::BlockRejected(format!(
                    "block {} at index {}: {e}",
                    block.get_hash(),
                    block.get_index()
                ))
            })?;

        info!(
            "Appended block {} at index {}",
            block.get_hash(),
            block.get_index()
        );
        self.blocks.push(block);
        self.utxo_set = utxo_set;
        Ok(())
    }

    /// Replaces the whole chain when `candidate` is valid and carries more work
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<()> {
        validate_chain(&candidate)
            .map_err(|e| LedgerError::ChainRejected(format!("received chain is invalid: {e}")))?;
        validate_chain_work(&candidate).map_err(|e| {
            LedgerError::ChainRejected(format!("received chain lacks the claimed work: {e}"))
        })?;

        let current_work = self.accumulated_difficulty();
        let candidate_work = DifficultyAdjustment::accumulated_difficulty(&candidate);
        if candidate_work <= current_work {
            let reason = LedgerError::ConsensusRejected(format!(
                "accumulated difficulty {candidate_work} does not exceed {current_work}"
            ));
            return Err(LedgerError::ChainRejected(reason.to_string()));
        }

        let utxo_set = rebuild_utxo_set(&candidate).map_err(|e| {
            LedgerError::ChainRejected(format!("received chain has invalid transactions: {e}"))
        })?;

        info!(
            "Replacing chain of {} blocks with received chain of {} blocks",
            self.blocks.len(),
            candidate.len()
        );
        self.blocks = candidate;
        self.utxo_set = utxo_set;
        Ok(())
    }
}
