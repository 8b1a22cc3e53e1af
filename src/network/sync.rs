use crate::core::{Block, Ledger};
use crate::error::Result;
use log::{debug, info};

/// What a received chain fragment led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Nothing new; no reply needed
    Ignored,
    /// The received tip extended the local chain
    BlockAppended,
    /// The received chain replaced the local one
    ChainReplaced,
    /// Only a tip we cannot link arrived; the sender should be asked for everything
    RequestFullChain,
}

impl SyncAction {
    /// Whether the local tip moved and should be announced
    pub fn changed_tip(self) -> bool {
        matches!(self, SyncAction::BlockAppended | SyncAction::ChainReplaced)
    }
}

/// Decides how a `ResponseBlockchain` payload affects the local chain.
///
/// Rejections are returned as errors; the caller logs and drops them.
pub fn handle_blockchain_response(ledger: &Ledger, received: Vec<Block>) -> Result<SyncAction> {
    let received_tip = match received.last() {
        Some(block) => block.clone(),
        None => {
            debug!("Received an empty block chain");
            return Ok(SyncAction::Ignored);
        }
    };
    let local_tip = ledger.latest_block()?;

    if received_tip.get_index() <= local_tip.get_index() {
        debug!("Received chain is not longer than the local chain");
        return Ok(SyncAction::Ignored);
    }

    info!(
        "Chain possibly behind. We got: {} Peer got: {}",
        local_tip.get_index(),
        received_tip.get_index()
    );
    if received_tip.get_previous_hash() == local_tip.get_hash() {
        ledger.add_block(received_tip)?;
        Ok(SyncAction::BlockAppended)
    } else if received.len() == 1 {
        Ok(SyncAction::RequestFullChain)
    } else {
        ledger.replace_chain(received)?;
        Ok(SyncAction::ChainReplaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::wallet::KeyPair;

    fn remote_with_blocks(count: usize, miner: &str) -> Ledger {
        let remote = Ledger::new().unwrap();
        for _ in 0..count {
            remote.mine_next_block(miner, None).unwrap();
        }
        remote
    }

    #[test]
    fn test_empty_and_stale_payloads_are_ignored() {
        let local = Ledger::new().unwrap();
        assert_eq!(
            handle_blockchain_response(&local, vec![]).unwrap(),
            SyncAction::Ignored
        );
        assert_eq!(
            handle_blockchain_response(&local, vec![Block::genesis()]).unwrap(),
            SyncAction::Ignored
        );
    }

    #[test]
    fn test_linking_tip_is_appended() {
        let miner = KeyPair::generate().unwrap();
        let local = Ledger::new().unwrap();
        let remote = remote_with_blocks(1, &miner.get_address());

        let action =
            handle_blockchain_response(&local, vec![remote.latest_block().unwrap()]).unwrap();
        assert_eq!(action, SyncAction::BlockAppended);
        assert!(action.changed_tip());
        assert_eq!(local.get_blocks().unwrap(), remote.get_blocks().unwrap());
    }

    #[test]
    fn test_unlinked_single_tip_requests_full_chain() {
        let miner = KeyPair::generate().unwrap();
        let local = Ledger::new().unwrap();
        let remote = remote_with_blocks(3, &miner.get_address());

        let action =
            handle_blockchain_response(&local, vec![remote.latest_block().unwrap()]).unwrap();
        assert_eq!(action, SyncAction::RequestFullChain);
        assert_eq!(local.get_blocks().unwrap().len(), 1);
    }

    #[test]
    fn test_full_chain_with_more_work_replaces() {
        let miner = KeyPair::generate().unwrap();
        let local = Ledger::new().unwrap();
        let remote = remote_with_blocks(3, &miner.get_address());

        let action = handle_blockchain_response(&local, remote.get_blocks().unwrap()).unwrap();
        assert_eq!(action, SyncAction::ChainReplaced);
        assert_eq!(local.balance(&miner.get_address()).unwrap(), 150);
    }

    #[test]
    fn test_invalid_full_chain_is_reported() {
        let miner = KeyPair::generate().unwrap();
        let local = Ledger::new().unwrap();
        let mut blocks = remote_with_blocks(3, &miner.get_address())
            .get_blocks()
            .unwrap();
        blocks.remove(1);

        let result = handle_blockchain_response(&local, blocks);
        assert!(matches!(result, Err(LedgerError::ChainRejected(_))));
        assert_eq!(local.get_blocks().unwrap().len(), 1);
    }
}
