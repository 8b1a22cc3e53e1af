use crate::core::{Transaction, TxIn, TxOut};
use crate::error::{LedgerError, Result};
use crate::storage::{UnspentTxOut, UtxoSet};
use crate::wallet::KeyPair;
use std::collections::HashSet;

/// Hex characters in an address: 0x04 || X || Y
pub const ADDRESS_LEN: usize = 130;

/// 130 lowercase hex characters starting with the uncompressed-point prefix
pub fn is_valid_address(address: &str) -> bool {
    address.len() == ADDRESS_LEN
        && address.starts_with("04")
        && address
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

pub fn balance(address: &str, utxo_set: &UtxoSet) -> u64 {
    utxo_set
        .iter()
        .filter(|utxo| utxo.get_address() == address)
        .fold(0u64, |acc, utxo| acc.saturating_add(utxo.get_amount()))
}

/// Outputs chosen to fund a payment plus the surplus to return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    pub included: Vec<UnspentTxOut>,
    pub change: u64,
}

/// Takes outputs in the given order until their sum reaches `amount`
pub fn select_coins(amount: u64, owned: &[UnspentTxOut]) -> Result<CoinSelection> {
    let mut included = Vec::new();
    let mut total = 0u64;
    for utxo in owned {
        included.push(utxo.clone());
        total = total.saturating_add(utxo.get_amount());
        if total >= amount {
            return Ok(CoinSelection {
                included,
                change: total - amount,
            });
        }
    }
    Err(LedgerError::InsufficientFunds {
        required: amount,
        available: total,
    })
}

/// Builds and signs a payment of `amount` from `key_pair` to `recipient`.
///
/// Outputs already spent by a pooled transaction are never selected.
pub fn build_transaction(
    recipient: &str,
    amount: u64,
    key_pair: &KeyPair,
    utxo_set: &UtxoSet,
    pool: &[Transaction],
) -> Result<Transaction> {
    if amount == 0 {
        return Err(LedgerError::TransactionInvalid(
            "amount must be positive".to_string(),
        ));
    }
    if !is_valid_address(recipient) {
        return Err(LedgerError::TransactionInvalid(format!(
            "invalid recipient address {recipient}"
        )));
    }

    let sender = key_pair.get_address();
    let pending: HashSet<_> = pool.iter().flat_map(Transaction::outpoints).collect();
    let spendable: Vec<UnspentTxOut> = utxo_set
        .owned_by(&sender)
        .into_iter()
        .filter(|utxo| !pending.contains(&utxo.outpoint()))
        .collect();

    let selection = select_coins(amount, &spendable)?;

    let tx_ins = selection
        .included
        .iter()
        .map(|utxo| TxIn::unsigned(&utxo.outpoint()))
        .collect();
    let mut tx_outs = vec![TxOut::new(recipient, amount)];
    if selection.change > 0 {
        tx_outs.push(TxOut::new(&sender, selection.change));
    }

    let mut tx = Transaction::new(tx_ins, tx_outs);
    tx.sign_inputs(key_pair)?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxos(address: &str, amounts: &[u64]) -> Vec<UnspentTxOut> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| UnspentTxOut::new(&"ab".repeat(32), i as u64, address, *amount))
            .collect()
    }

    #[test]
    fn test_address_validation() {
        let key_pair = KeyPair::generate().unwrap();
        assert!(is_valid_address(&key_pair.get_address()));
        assert!(!is_valid_address(&key_pair.get_address().to_uppercase()));
        assert!(!is_valid_address(&key_pair.get_address()[2..]));
        assert!(!is_valid_address(&format!("05{}", &key_pair.get_address()[2..])));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_select_coins_exact_and_change() {
        let owned = utxos("a", &[30, 20, 10]);
        let exact = select_coins(50, &owned).unwrap();
        assert_eq!(exact.included.len(), 2);
        assert_eq!(exact.change, 0);

        let with_change = select_coins(35, &owned).unwrap();
        assert_eq!(with_change.included.len(), 2);
        assert_eq!(with_change.change, 15);
    }

    #[test]
    fn test_select_coins_insufficient() {
        let owned = utxos("a", &[30, 20]);
        assert_eq!(
            select_coins(51, &owned),
            Err(LedgerError::InsufficientFunds {
                required: 51,
                available: 50
            })
        );
    }

    #[test]
    fn test_build_transaction_is_valid_against_set() {
        let sender = KeyPair::generate().unwrap();
        let recipient = KeyPair::generate().unwrap();
        let set: UtxoSet = utxos(&sender.get_address(), &[50]).into_iter().collect();

        let tx =
            build_transaction(&recipient.get_address(), 20, &sender, &set, &[]).unwrap();
        assert_eq!(tx.get_tx_outs().len(), 2);
        assert_eq!(tx.get_tx_outs()[0].get_amount(), 20);
        assert_eq!(tx.get_tx_outs()[1].get_address(), sender.get_address());
        assert_eq!(tx.get_tx_outs()[1].get_amount(), 30);
        assert!(tx.validate(&set).is_ok());

        let exact = build_transaction(&recipient.get_address(), 50, &sender, &set, &[]).unwrap();
        assert_eq!(exact.get_tx_outs().len(), 1);
    }

    #[test]
    fn test_build_transaction_skips_pooled_outputs() {
        let sender = KeyPair::generate().unwrap();
        let recipient = KeyPair::generate().unwrap();
        let set: UtxoSet = utxos(&sender.get_address(), &[50, 10]).into_iter().collect();

        let first = build_transaction(&recipient.get_address(), 40, &sender, &set, &[]).unwrap();
        let second =
            build_transaction(&recipient.get_address(), 10, &sender, &set, &[first.clone()])
                .unwrap();
        assert_eq!(second.get_tx_ins()[0].get_tx_out_index(), 1);

        assert!(matches!(
            build_transaction(
                &recipient.get_address(),
                1,
                &sender,
                &set,
                &[first, second]
            ),
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_build_transaction_rejects_bad_arguments() {
        let sender = KeyPair::generate().unwrap();
        let set: UtxoSet = utxos(&sender.get_address(), &[50]).into_iter().collect();
        assert!(build_transaction(&sender.get_address(), 0, &sender, &set, &[]).is_err());
        assert!(build_transaction("nobody", 5, &sender, &set, &[]).is_err());
    }

    #[test]
    fn test_balance_sums_owned_outputs() {
        let mut all = utxos("a", &[5, 6]);
        all.push(UnspentTxOut::new(&"cd".repeat(32), 0, "b", 100));
        let set: UtxoSet = all.into_iter().collect();
        assert_eq!(balance("a", &set), 11);
        assert_eq!(balance("c", &set), 0);
    }
}
