// This file implements the transaction rules - how value moves between addresses
// Every transaction consumes unspent outputs and creates new ones, and the first
// transaction of each block is the coinbase that mints the block reward

use crate::error::{LedgerError, Result};
use crate::storage::{OutPoint, UnspentTxOut, UtxoSet};
use crate::utils::sha256_hex;
use crate::wallet::{is_valid_address, sign, KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// I mint exactly this many coins in every coinbase
pub const COINBASE_AMOUNT: u64 = 50;

// This references an output I want to spend plus my signature over the spending tx id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    tx_out_id: String,
    tx_out_index: u64,
    signature: String,
}

impl TxIn {
    pub fn new(tx_out_id: &str, tx_out_index: u64, signature: &str) -> TxIn {
        TxIn {
            tx_out_id: tx_out_id.to_string(),
            tx_out_index,
            signature: signature.to_string(),
        }
    }

    /// An input for `outpoint` awaiting its signature
    pub fn unsigned(outpoint: &OutPoint) -> TxIn {
        TxIn::new(&outpoint.0, outpoint.1, "")
    }

    pub fn get_tx_out_id(&self) -> &str {
        self.tx_out_id.as_str()
    }

    pub fn get_tx_out_index(&self) -> u64 {
        self.tx_out_index
    }

    pub fn get_signature(&self) -> &str {
        self.signature.as_str()
    }

    pub fn outpoint(&self) -> OutPoint {
        (self.tx_out_id.clone(), self.tx_out_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    address: String,
    amount: u64,
}

impl TxOut {
    pub fn new(address: &str, amount: u64) -> TxOut {
        TxOut {
            address: address.to_string(),
            amount,
        }
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: String,
    tx_ins: Vec<TxIn>,
    tx_outs: Vec<TxOut>,
}

/// SHA-256 hex over the concatenated input references and outputs.
///
/// Signatures are not part of the preimage, so signing never changes the id.
pub fn transaction_id(tx_ins: &[TxIn], tx_outs: &[TxOut]) -> String {
    let mut preimage = String::new();
    for tx_in in tx_ins {
        preimage.push_str(&tx_in.tx_out_id);
        preimage.push_str(&tx_in.tx_out_index.to_string());
    }
    for tx_out in tx_outs {
        preimage.push_str(&tx_out.address);
        preimage.push_str(&tx_out.amount.to_string());
    }
    sha256_hex(preimage.as_bytes())
}

impl Transaction {
    /// Builds an unsigned transaction with its id already computed
    pub fn new(tx_ins: Vec<TxIn>, tx_outs: Vec<TxOut>) -> Transaction {
        let id = transaction_id(&tx_ins, &tx_outs);
        Transaction {
            id,
            tx_ins,
            tx_outs,
        }
    }

    /// Keeps the given id as-is; used for data received from elsewhere
    pub fn from_parts(id: &str, tx_ins: Vec<TxIn>, tx_outs: Vec<TxOut>) -> Transaction {
        Transaction {
            id: id.to_string(),
            tx_ins,
            tx_outs,
        }
    }

    // The coinbase input carries the block index so coinbase ids differ per height
    pub fn new_coinbase(address: &str, block_index: u64) -> Transaction {
        Transaction::new(
            vec![TxIn::new("", block_index, "")],
            vec![TxOut::new(address, COINBASE_AMOUNT)],
        )
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_tx_ins(&self) -> &[TxIn] {
        self.tx_ins.as_slice()
    }

    pub fn get_tx_outs(&self) -> &[TxOut] {
        self.tx_outs.as_slice()
    }

    pub fn compute_id(&self) -> String {
        transaction_id(&self.tx_ins, &self.tx_outs)
    }

    /// Appends this transaction's block-hash contribution, signatures included
    pub fn write_preimage(&self, buf: &mut String) {
        buf.push_str(&self.id);
        for tx_in in &self.tx_ins {
            buf.push_str(&tx_in.tx_out_id);
            buf.push_str(&tx_in.tx_out_index.to_string());
            buf.push_str(&tx_in.signature);
        }
        for tx_out in &self.tx_outs {
            buf.push_str(&tx_out.address);
            buf.push_str(&tx_out.amount.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tx_ins.is_empty() && self.tx_outs.is_empty()
    }

    pub fn outpoints(&self) -> impl Iterator<Item = OutPoint> + '_ {
        self.tx_ins.iter().map(TxIn::outpoint)
    }

    pub fn total_output(&self) -> Result<u64> {
        self.tx_outs.iter().try_fold(0u64, |acc, tx_out| {
            acc.checked_add(tx_out.amount).ok_or_else(|| {
                LedgerError::TransactionInvalid(format!(
                    "output total of transaction {} overflows",
                    self.id
                ))
            })
        })
    }

    // I sign the tx id bytes once per input; every input is owned by the same key here
    pub fn sign_inputs(&mut self, key_pair: &KeyPair) -> Result<()> {
        for index in 0..self.tx_ins.len() {
            let signature = sign(self.id.as_bytes(), key_pair)?;
            self.tx_ins[index].signature = signature.to_hex();
        }
        Ok(())
    }

    /// Validates a regular transaction against `utxo_set`.
    pub fn validate(&self, utxo_set: &UtxoSet) -> Result<()> {
        if self.compute_id() != self.id {
            return Err(LedgerError::TransactionInvalid(format!(
                "invalid tx id: {}",
                self.id
            )));
        }
        if self.tx_ins.is_empty() {
            return Err(LedgerError::TransactionInvalid(format!(
                "transaction {} has no inputs",
                self.id
            )));
        }
        if self.tx_outs.is_empty() {
            return Err(LedgerError::TransactionInvalid(format!(
                "transaction {} has no outputs",
                self.id
            )));
        }
        for tx_out in &self.tx_outs {
            if !is_valid_address(&tx_out.address) {
                return Err(LedgerError::TransactionInvalid(format!(
                    "transaction {} pays an invalid address {}",
                    self.id, tx_out.address
                )));
            }
            if tx_out.amount == 0 {
                return Err(LedgerError::TransactionInvalid(format!(
                    "transaction {} has a zero-amount output",
                    self.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for tx_in in &self.tx_ins {
            if !seen.insert(tx_in.outpoint()) {
                return Err(LedgerError::TransactionInvalid(format!(
                    "transaction {} spends {}:{} twice",
                    self.id, tx_in.tx_out_id, tx_in.tx_out_index
                )));
            }
        }

        let mut total_in = 0u64;
        for tx_in in &self.tx_ins {
            let utxo = utxo_set
                .find(&tx_in.tx_out_id, tx_in.tx_out_index)
                .ok_or_else(|| {
                    LedgerError::TransactionInvalid(format!(
                        "referenced txOut not found: {}:{}",
                        tx_in.tx_out_id, tx_in.tx_out_index
                    ))
                })?;
            self.verify_input(tx_in, utxo)?;
            total_in = total_in.checked_add(utxo.get_amount()).ok_or_else(|| {
                LedgerError::TransactionInvalid(format!(
                    "input total of transaction {} overflows",
                    self.id
                ))
            })?;
        }

        let total_out = self.total_output()?;
        if total_in != total_out {
            return Err(LedgerError::TransactionInvalid(format!(
                "totalTxOutValues != totalTxInValues in tx {}: {total_out} != {total_in}",
                self.id
            )));
        }
        Ok(())
    }

    fn verify_input(&self, tx_in: &TxIn, utxo: &UnspentTxOut) -> Result<()> {
        let public_key = PublicKey::from_address(utxo.get_address()).map_err(|e| {
            LedgerError::TransactionInvalid(format!(
                "output {}:{} is locked to an unusable address: {e}",
                tx_in.tx_out_id, tx_in.tx_out_index
            ))
        })?;
        let signature = Signature::from_hex(&tx_in.signature).map_err(|e| {
            LedgerError::TransactionInvalid(format!(
                "input {}:{} of tx {}: {e}",
                tx_in.tx_out_id, tx_in.tx_out_index, self.id
            ))
        })?;
        if !signature.verify(self.id.as_bytes(), &public_key) {
            return Err(LedgerError::TransactionInvalid(format!(
                "invalid txIn signature {}:{} in tx {}",
                tx_in.tx_out_id, tx_in.tx_out_index, self.id
            )));
        }
        Ok(())
    }

    /// Checks the reward transaction expected at `block_index`.
    pub fn validate_coinbase(&self, block_index: u64) -> Result<()> {
        if self.compute_id() != self.id {
            return Err(LedgerError::CoinbaseInvalid(format!(
                "invalid coinbase tx id: {}",
                self.id
            )));
        }
        if self.tx_ins.len() != 1 {
            return Err(LedgerError::CoinbaseInvalid(
                "one txIn must be specified in the coinbase transaction".to_string(),
            ));
        }
        if self.tx_ins[0].tx_out_index != block_index {
            return Err(LedgerError::CoinbaseInvalid(format!(
                "the txIn index in coinbase tx must be the block height {block_index}, got {}",
                self.tx_ins[0].tx_out_index
            )));
        }
        if self.tx_outs.len() != 1 {
            return Err(LedgerError::CoinbaseInvalid(
                "invalid number of txOuts in coinbase transaction".to_string(),
            ));
        }
        if self.tx_outs[0].amount != COINBASE_AMOUNT {
            return Err(LedgerError::CoinbaseInvalid(format!(
                "invalid coinbase amount {}, expected {COINBASE_AMOUNT}",
                self.tx_outs[0].amount
            )));
        }
        Ok(())
    }
}

/// Validates a block's transaction list against the pre-block set.
///
/// The first entry must be the coinbase and no outpoint may be referenced
/// twice anywhere in the batch.
pub fn validate_block_transactions(
    transactions: &[Transaction],
    utxo_set: &UtxoSet,
    block_index: u64,
) -> Result<()> {
    let (coinbase, rest) = transactions.split_first().ok_or_else(|| {
        LedgerError::CoinbaseInvalid(format!("block {block_index} carries no transactions"))
    })?;
    coinbase.validate_coinbase(block_index)?;

    let mut seen = HashSet::new();
    for outpoint in transactions.iter().flat_map(Transaction::outpoints) {
        if !seen.insert(outpoint.clone()) {
            return Err(LedgerError::TransactionInvalid(format!(
                "duplicate txIn {}:{} in block {block_index}",
                outpoint.0, outpoint.1
            )));
        }
    }

    for tx in rest {
        tx.validate(utxo_set)?;
    }
    Ok(())
}

/// Validates a block's transactions and returns the resulting set.
///
/// On any failure the caller keeps its current set; nothing is mutated.
pub fn process_transactions(
    transactions: &[Transaction],
    utxo_set: &UtxoSet,
    block_index: u64,
) -> Result<UtxoSet> {
    validate_block_transactions(transactions, utxo_set, block_index)?;
    Ok(utxo_set.apply(transactions))
}
