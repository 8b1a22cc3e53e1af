//! Shared handle over the canonical chain and the transaction pool
//!
//! Readers see a consistent snapshot under one read lock. Writers validate
//! first and commit chain, UTXO set and pool together under one write lock.

use crate::core::{Block, Blockchain, ProofOfWork, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::{TransactionPool, UtxoSet};
use crate::utils::current_timestamp;
use crate::wallet::{self, KeyPair};
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct LedgerState {
    chain: Blockchain,
    pool: TransactionPool,
}

impl LedgerState {
    fn reconcile_pool(&mut self) {
        let dropped = self.pool.reconcile(self.chain.get_utxo_set());
        if dropped > 0 {
            debug!("Dropped {dropped} pooled transactions after a tip change");
        }
    }
}

#[derive(Clone)]
pub struct Ledger {
    state: Arc<RwLock<LedgerState>>,
    // bumped under the write lock whenever the tip changes
    generation: Arc<AtomicU64>,
}

/// Everything needed to mine the next block outside the lock
pub struct MiningJob {
    previous: Block,
    data: Vec<Transaction>,
    difficulty: u32,
    generation: u64,
}

impl MiningJob {
    pub fn get_previous(&self) -> &Block {
        &self.previous
    }

    pub fn get_data(&self) -> &[Transaction] {
        self.data.as_slice()
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Tip generation the job was prepared against
    pub fn get_generation(&self) -> u64 {
        self.generation
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> MiningJob {
        self.difficulty = difficulty;
        self
    }

    pub fn run<F: FnMut() -> bool>(self, should_abort: F) -> Result<Block> {
        ProofOfWork::new(
            &self.previous,
            self.data,
            self.difficulty,
            current_timestamp()?,
        )
        .run_until(should_abort)
    }
}

impl Ledger {
    pub fn new() -> Result<Ledger> {
        Ok(Ledger::from_chain(Blockchain::new()?))
    }

    pub fn from_chain(chain: Blockchain) -> Ledger {
        Ledger {
            state: Arc::new(RwLock::new(LedgerState {
                chain,
                pool: TransactionPool::new(),
            })),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Lock("ledger state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|_| LedgerError::Lock("ledger state lock poisoned".to_string()))
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn tip_changed(&self, state: &mut LedgerState) {
        state.reconcile_pool();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get_blocks(&self) -> Result<Vec<Block>> {
        Ok(self.read()?.chain.get_blocks().to_vec())
    }

    pub fn latest_block(&self) -> Result<Block> {
        Ok(self.read()?.chain.latest_block().clone())
    }

    pub fn find_block(&self, hash: &str) -> Result<Option<Block>> {
        Ok(self.read()?.chain.find_block(hash).cloned())
    }

    pub fn next_difficulty(&self) -> Result<u32> {
        Ok(self.read()?.chain.next_difficulty())
    }

    pub fn utxo_snapshot(&self) -> Result<UtxoSet> {
        Ok(self.read()?.chain.get_utxo_set().clone())
    }

    pub fn pool_snapshot(&self) -> Result<Vec<Transaction>> {
        Ok(self.read()?.pool.snapshot())
    }

    pub fn balance(&self, address: &str) -> Result<u64> {
        Ok(wallet::balance(address, self.read()?.chain.get_utxo_set()))
    }

    pub fn add_block(&self, block: Block) -> Result<()> {
        let mut state = self.write()?;
        state.chain.add_block(block)?;
        self.tip_changed(&mut state);
        Ok(())
    }

    pub fn replace_chain(&self, blocks: Vec<Block>) -> Result<()> {
        let mut state = self.write()?;
        state.chain.replace_chain(blocks)?;
        self.tip_changed(&mut state);
        Ok(())
    }

    /// Admits `tx` to the pool after validating it against the current set
    pub fn submit_transaction(&self, tx: Transaction) -> Result<()> {
        let mut state = self.write()?;
        let LedgerState { chain, pool } = &mut *state;
        pool.add(tx, chain.get_utxo_set())
    }

    /// Builds, signs and pools a payment in one step
    pub fn send_transaction(
        &self,
        recipient: &str,
        amount: u64,
        key_pair: &KeyPair,
    ) -> Result<Transaction> {
        let mut state = self.write()?;
        let LedgerState { chain, pool } = &mut *state;
        let tx = wallet::build_transaction(
            recipient,
            amount,
            key_pair,
            chain.get_utxo_set(),
            &pool.snapshot(),
        )?;
        pool.add(tx.clone(), chain.get_utxo_set())?;
        info!("Pooled transaction {} paying {amount} to {recipient}", tx.get_id());
        Ok(tx)
    }

    /// Snapshots the tip, difficulty and data for the next block.
    ///
    /// `data` defaults to the pool contents; a coinbase for `miner_address`
    /// is always placed first.
    pub fn prepare_block(
        &self,
        miner_address: &str,
        data: Option<Vec<Transaction>>,
    ) -> Result<MiningJob> {
        let state = self.read()?;
        let previous = state.chain.latest_block().clone();
        let mut block_data = vec![Transaction::new_coinbase(
            miner_address,
            previous.get_index() + 1,
        )];
        block_data.extend(data.unwrap_or_else(|| state.pool.snapshot()));
        Ok(MiningJob {
            difficulty: state.chain.next_difficulty(),
            previous,
            data: block_data,
            generation: self.generation(),
        })
    }

    /// Mines and appends the next block; cancelled if the tip moves meanwhile
    pub fn mine_next_block(
        &self,
        miner_address: &str,
        data: Option<Vec<Transaction>>,
    ) -> Result<Block> {
        let job = self.prepare_block(miner_address, data)?;
        let generation = job.get_generation();
        let block = job.run(|| self.generation() != generation)?;
        self.add_block(block.clone())?;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_mine_next_block_pays_the_miner() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate().unwrap();
        let block = ledger.mine_next_block(&miner.get_address(), None).unwrap();
        assert_eq!(block.get_index(), 1);
        assert_eq!(ledger.balance(&miner.get_address()).unwrap(), 50);
        assert_eq!(ledger.generation(), 1);
    }

    #[test]
    fn test_send_then_mine_clears_pool() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate().unwrap();
        let friend = KeyPair::generate().unwrap();
        ledger.mine_next_block(&miner.get_address(), None).unwrap();

        let tx = ledger
            .send_transaction(&friend.get_address(), 20, &miner)
            .unwrap();
        assert_eq!(ledger.pool_snapshot().unwrap(), vec![tx]);

        ledger.mine_next_block(&miner.get_address(), None).unwrap();
        assert!(ledger.pool_snapshot().unwrap().is_empty());
        assert_eq!(ledger.balance(&friend.get_address()).unwrap(), 20);
        assert_eq!(ledger.balance(&miner.get_address()).unwrap(), 80);
    }

    #[test]
    fn test_stale_job_is_cancelled_when_tip_moves() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate().unwrap();
        let job = ledger
            .prepare_block(&miner.get_address(), None)
            .unwrap()
            .with_difficulty(40);
        let generation = job.get_generation();

        let watcher = ledger.clone();
        let handle = thread::spawn(move || job.run(|| watcher.generation() != generation));

        ledger.mine_next_block(&miner.get_address(), None).unwrap();
        assert_eq!(handle.join().unwrap(), Err(LedgerError::MiningCancelled));
        assert_eq!(ledger.get_blocks().unwrap().len(), 2);
    }

    #[test]
    fn test_rejected_block_does_not_bump_generation() {
        let ledger = Ledger::new().unwrap();
        let orphan = Block::new(5, "nope", 0, vec![], 0, 0);
        assert!(matches!(
            ledger.add_block(orphan),
            Err(LedgerError::BlockRejected(_))
        ));
        assert_eq!(ledger.generation(), 0);
    }
}
