// This is the entry point of the node binary
// Local commands work on the key file directly; everything else talks to a running node
use clap::Parser;
use ledger_chain::{
    send_control, utils, Command, ControlRequest, ControlResponse, KeyStore, Ledger, Opt, Server,
    GLOBAL_CONFIG,
};
use log::{error, LevelFilter};
use std::process;

fn main() {
    // Info by default; RUST_LOG still overrides it
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();
    if let Some(node) = opt.node {
        GLOBAL_CONFIG.set_node_addr(node);
    }
    if let Some(key_file) = opt.key_file {
        GLOBAL_CONFIG.set_key_file(key_file);
    }

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let key_store = KeyStore::new(GLOBAL_CONFIG.get_key_file());
    match command {
        Command::Createwallet => {
            let key_pair = key_store.init()?;
            println!("Your new address: {}", key_pair.get_address());
        }
        Command::Address => {
            println!("{}", key_store.load()?.get_address());
        }
        Command::StartNode { peers, auto_mine } => {
            GLOBAL_CONFIG.add_initial_peers(&peers);
            let key_pair = key_store.load_or_init()?;
            println!("Node address to receive rewards: {}", key_pair.get_address());

            let server = Server::new(Ledger::new()?, key_pair, &GLOBAL_CONFIG.get_node_addr());
            server
                .run(&GLOBAL_CONFIG.get_initial_peers(), auto_mine)
                .map_err(|e| format!("Server error: {e}"))?
        }
        Command::Chain => print_response(request(ControlRequest::GetChain)?)?,
        Command::Block { hash } => print_response(request(ControlRequest::GetBlock { hash })?)?,
        Command::Mine => print_response(request(ControlRequest::MineBlock { data: None })?)?,
        Command::Send { address, amount } => {
            print_response(request(ControlRequest::SendTransaction { address, amount })?)?
        }
        Command::Balance { address } => {
            print_response(request(ControlRequest::GetBalance { address })?)?
        }
        Command::Pool => print_response(request(ControlRequest::GetTransactionPool)?)?,
        Command::Peers => print_response(request(ControlRequest::GetPeers)?)?,
        Command::AddPeer { addr } => print_response(request(ControlRequest::AddPeer { addr })?)?,
    }
    Ok(())
}

fn request(request: ControlRequest) -> ledger_chain::Result<ControlResponse> {
    send_control(&GLOBAL_CONFIG.get_node_addr(), request)
}

fn print_response(response: ControlResponse) -> Result<(), Box<dyn std::error::Error>> {
    match response {
        ControlResponse::Chain(blocks) => println!("{}", utils::to_pretty_json(&blocks)?),
        ControlResponse::Block(Some(block)) | ControlResponse::Mined(block) => {
            println!("{}", utils::to_pretty_json(&block)?)
        }
        ControlResponse::Block(None) => return Err("Block not found".into()),
        ControlResponse::Transaction(tx) => println!("{}", utils::to_pretty_json(&tx)?),
        ControlResponse::Balance { address, balance } => {
            println!("Balance of {address}: {balance}")
        }
        ControlResponse::Address(address) => println!("{address}"),
        ControlResponse::TransactionPool(pool) => println!("{}", utils::to_pretty_json(&pool)?),
        ControlResponse::Peers(peers) => {
            for peer in peers {
                println!("{peer}");
            }
        }
        ControlResponse::PeerAdded(addr) => println!("Connected to {addr}"),
        ControlResponse::Error { message } => return Err(message.into()),
    }
    Ok(())
}
