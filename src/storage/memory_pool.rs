use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::storage::{OutPoint, UtxoSet};
use std::collections::HashSet;

/// Pending transactions in admission order.
///
/// No two pooled transactions reference the same outpoint and every entry
/// was valid against the UTXO set when it was admitted.
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    transactions: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> TransactionPool {
        TransactionPool::default()
    }

    pub fn add(&mut self, tx: Transaction, utxo_set: &UtxoSet) -> Result<()> {
        if tx.is_empty() {
            return Err(LedgerError::TransactionInvalid(
                "refusing to pool a transaction without inputs or outputs".to_string(),
            ));
        }
        tx.validate(utxo_set)?;

        if self.contains(tx.get_id()) {
            return Err(LedgerError::PoolConflict(format!(
                "transaction {} is already pooled",
                tx.get_id()
            )));
        }
        let pending = self.spent_outpoints();
        if let Some((tx_out_id, tx_out_index)) = tx.outpoints().find(|op| pending.contains(op)) {
            return Err(LedgerError::PoolConflict(format!(
                "txIn {tx_out_id}:{tx_out_index} is already spent by a pooled transaction"
            )));
        }

        log::debug!("Adding transaction {} to the pool", tx.get_id());
        self.transactions.push(tx);
        Ok(())
    }

    /// Drops every entry with an input missing from `utxo_set`; returns how many went
    pub fn reconcile(&mut self, utxo_set: &UtxoSet) -> usize {
        let before = self.transactions.len();
        self.transactions.retain(|tx| {
            let keep = tx
                .get_tx_ins()
                .iter()
                .all(|tx_in| utxo_set.contains(tx_in.get_tx_out_id(), tx_in.get_tx_out_index()));
            if !keep {
                log::debug!("Removing transaction {} from the pool", tx.get_id());
            }
            keep
        });
        before - self.transactions.len()
    }

    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.get_id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Every outpoint referenced by a pooled transaction
    pub fn spent_outpoints(&self) -> HashSet<OutPoint> {
        self.transactions
            .iter()
            .flat_map(Transaction::outpoints)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
