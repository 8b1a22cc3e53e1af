use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ledger-chain")]
pub struct Opt {
    #[arg(
        long,
        global = true,
        help = "Node address to serve on or talk to (overrides NODE_ADDRESS)"
    )]
    pub node: Option<String>,
    #[arg(
        long = "key-file",
        global = true,
        help = "Private key file (overrides KEY_FILE)"
    )]
    pub key_file: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createwallet", about = "Create the node's private key")]
    Createwallet,
    #[command(name = "address", about = "Print the address of the local key")]
    Address,
    #[command(name = "startnode", about = "Start a node")]
    StartNode {
        #[arg(long = "peer", help = "Peer to connect to at startup (repeatable)")]
        peers: Vec<String>,
        #[arg(long = "auto-mine", help = "Mine blocks continuously")]
        auto_mine: bool,
    },
    #[command(name = "chain", about = "Print the node's chain")]
    Chain,
    #[command(name = "block", about = "Print a block by hash")]
    Block {
        #[arg(help = "Block hash")]
        hash: String,
    },
    #[command(name = "mine", about = "Mine one block from the node's pool")]
    Mine,
    #[command(name = "send", about = "Pay an address from the node's key")]
    Send {
        #[arg(help = "Recipient address")]
        address: String,
        #[arg(help = "Amount to send")]
        amount: u64,
    },
    #[command(name = "balance", about = "Balance of an address, the node's own by default")]
    Balance {
        #[arg(help = "Address to look up")]
        address: Option<String>,
    },
    #[command(name = "pool", about = "Print pending transactions")]
    Pool,
    #[command(name = "peers", about = "Print known peers")]
    Peers,
    #[command(name = "addpeer", about = "Connect the node to a peer")]
    AddPeer {
        #[arg(help = "Peer address, host:port")]
        addr: String,
    },
}
