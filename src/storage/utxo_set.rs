use crate::core::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Values;
use std::collections::BTreeMap;

/// (txOutId, txOutIndex)
pub type OutPoint = (String, u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentTxOut {
    tx_out_id: String,
    tx_out_index: u64,
    address: String,
    amount: u64,
}

impl UnspentTxOut {
    pub fn new(tx_out_id: &str, tx_out_index: u64, address: &str, amount: u64) -> UnspentTxOut {
        UnspentTxOut {
            tx_out_id: tx_out_id.to_string(),
            tx_out_index,
            address: address.to_string(),
            amount,
        }
    }

    pub fn get_tx_out_id(&self) -> &str {
        self.tx_out_id.as_str()
    }

    pub fn get_tx_out_index(&self) -> u64 {
        self.tx_out_index
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn outpoint(&self) -> OutPoint {
        (self.tx_out_id.clone(), self.tx_out_index)
    }
}

/// Unspent outputs keyed by outpoint.
///
/// Values are immutable: applying transactions yields a new set and leaves
/// the receiver untouched. Iteration order is the outpoint order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    outputs: BTreeMap<OutPoint, UnspentTxOut>,
}

impl UtxoSet {
    pub fn new() -> UtxoSet {
        UtxoSet::default()
    }

    pub fn find(&self, tx_out_id: &str, tx_out_index: u64) -> Option<&UnspentTxOut> {
        self.outputs.get(&(tx_out_id.to_string(), tx_out_index))
    }

    pub fn contains(&self, tx_out_id: &str, tx_out_index: u64) -> bool {
        self.find(tx_out_id, tx_out_index).is_some()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> Values<'_, OutPoint, UnspentTxOut> {
        self.outputs.values()
    }

    /// Outputs locked to `address`, in set order
    pub fn owned_by(&self, address: &str) -> Vec<UnspentTxOut> {
        self.outputs
            .values()
            .filter(|utxo| utxo.address == address)
            .cloned()
            .collect()
    }

    pub fn total_amount(&self) -> u64 {
        self.outputs
            .values()
            .fold(0u64, |acc, utxo| acc.saturating_add(utxo.amount))
    }

    /// (self \ consumed) ∪ created, with no validation
    pub fn apply(&self, transactions: &[Transaction]) -> UtxoSet {
        let mut outputs = self.outputs.clone();
        for tx in transactions {
            for tx_in in tx.get_tx_ins() {
                outputs.remove(&tx_in.outpoint());
            }
        }
        for tx in transactions {
            for (index, tx_out) in tx.get_tx_outs().iter().enumerate() {
                let utxo = UnspentTxOut::new(
                    tx.get_id(),
                    index as u64,
                    tx_out.get_address(),
                    tx_out.get_amount(),
                );
                outputs.insert(utxo.outpoint(), utxo);
            }
        }
        UtxoSet { outputs }
    }
}

impl FromIterator<UnspentTxOut> for UtxoSet {
    fn from_iter<I: IntoIterator<Item = UnspentTxOut>>(iter: I) -> Self {
        UtxoSet {
            outputs: iter
                .into_iter()
                .map(|utxo| (utxo.outpoint(), utxo))
                .collect(),
        }
    }
}

/// Derives the set that results from applying `transactions` to `base`
pub fn derive_utxo_set(transactions: &[Transaction], base: &UtxoSet) -> UtxoSet {
    base.apply(transactions)
}
