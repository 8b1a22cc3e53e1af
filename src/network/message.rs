use crate::core::{Block, Transaction};
use serde::{Deserialize, Serialize};

/// Gossip exchanged between peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    QueryLatest,
    QueryAll,
    ResponseBlockchain(Vec<Block>),
    QueryTransactionPool,
    ResponseTransactionPool(Vec<Transaction>),
}

/// One JSON value on a connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Package {
    /// Replies travel on a fresh connection to `addr_from`
    Peer { addr_from: String, message: Message },
    /// Answered on the same connection
    Control(ControlRequest),
}

/// Requests from the local operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlRequest {
    GetChain,
    GetBlock { hash: String },
    MineBlock { data: Option<Vec<Transaction>> },
    SendTransaction { address: String, amount: u64 },
    /// Defaults to the node's own address
    GetBalance { address: Option<String> },
    GetAddress,
    GetTransactionPool,
    GetPeers,
    AddPeer { addr: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlResponse {
    Chain(Vec<Block>),
    Block(Option<Block>),
    Mined(Block),
    Transaction(Transaction),
    Balance { address: String, balance: u64 },
    Address(String),
    TransactionPool(Vec<Transaction>),
    Peers(Vec<String>),
    PeerAdded(String),
    Error { message: String },
}
