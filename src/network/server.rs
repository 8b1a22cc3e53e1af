use crate::core::{Block, Ledger, Transaction};
use crate::error::{LedgerError, Result};
use crate::network::sync::{handle_blockchain_response, SyncAction};
use crate::network::{ControlRequest, ControlResponse, Message, Nodes, Package};
use crate::utils::serialize;
use crate::wallet::KeyPair;
use log::{debug, error, info, warn};
use serde_json::Deserializer;
use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TCP_WRITE_TIMEOUT: u64 = 5000;
const TCP_READ_TIMEOUT: u64 = 60;
const MINER_BACKOFF: u64 = 1000;

/// A gossiping node: the ledger, its peers and the key it mines and pays with
#[derive(Clone)]
pub struct Server {
    ledger: Ledger,
    nodes: Arc<Nodes>,
    key_pair: Arc<KeyPair>,
    addr: String,
}

impl Server {
    pub fn new(ledger: Ledger, key_pair: KeyPair, addr: &str) -> Server {
        Server {
            ledger,
            nodes: Arc::new(Nodes::new()),
            key_pair: Arc::new(key_pair),
            addr: addr.to_string(),
        }
    }

    pub fn get_ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn get_nodes(&self) -> Arc<Nodes> {
        Arc::clone(&self.nodes)
    }

    pub fn get_addr(&self) -> &str {
        self.addr.as_str()
    }

    /// Binds to the node address and serves until the listener fails
    pub fn run(&self, initial_peers: &[String], auto_mine: bool) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).map_err(|e| {
            LedgerError::Network(format!("Failed to bind to {}: {e}", self.addr))
        })?;
        info!("Server listening on {}", self.addr);

        self.connect_to_network(initial_peers);
        if auto_mine {
            self.start_miner();
        }
        self.serve(listener)
    }

    /// Accept loop on an already bound listener
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    thread::spawn(move || {
                        let peer_addr = stream.peer_addr().ok();
                        if let Err(e) = server.handle_connection(stream) {
                            error!("Error handling connection from {peer_addr:?}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {e}");
                }
            }
        }
        Ok(())
    }

    /// Announces ourselves to every startup peer by asking for its tip
    pub fn connect_to_network(&self, peers: &[String]) {
        for peer in peers {
            if peer == &self.addr {
                continue;
            }
            self.nodes.add_node(peer.clone());
            if let Err(e) = self.send_message(peer, Message::QueryLatest) {
                warn!("Could not reach peer {peer}: {e}");
            }
        }
    }

    fn start_miner(&self) {
        let server = self.clone();
        thread::spawn(move || loop {
            match server
                .ledger
                .mine_next_block(&server.key_pair.get_address(), None)
            {
                Ok(block) => server.announce_block(&block),
                Err(LedgerError::MiningCancelled) => {
                    debug!("Tip moved while mining, starting over");
                }
                Err(e) => {
                    warn!("Mining failed: {e}");
                    thread::sleep(Duration::from_millis(MINER_BACKOFF));
                }
            }
        });
    }

    fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        stream
            .set_read_timeout(Some(Duration::from_secs(TCP_READ_TIMEOUT)))
            .map_err(|e| LedgerError::Network(format!("Failed to set read timeout: {e}")))?;

        let reader = BufReader::new(&stream);
        let pkg_reader = Deserializer::from_reader(reader).into_iter::<Package>();

        for pkg in pkg_reader {
            let pkg = pkg.map_err(|e| {
                LedgerError::Network(format!("Failed to deserialize package: {e}"))
            })?;
            debug!("Received package: {pkg:?}");

            match pkg {
                Package::Peer { addr_from, message } => {
                    if let Err(e) = self.process_peer_message(&addr_from, message) {
                        warn!("Dropping message from {addr_from}: {e}");
                    }
                }
                Package::Control(request) => {
                    let response = self.process_control(request);
                    let mut writer = &stream;
                    writer.write_all(&serialize(&response)?)?;
                    writer.flush()?;
                }
            }
        }

        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }

    fn process_peer_message(&self, addr_from: &str, message: Message) -> Result<()> {
        if addr_from != self.addr && self.nodes.add_node(addr_from.to_string()) {
            info!("Learned new peer {addr_from}");
        }

        match message {
            Message::QueryLatest => {
                let latest = self.ledger.latest_block()?;
                self.send_message(addr_from, Message::ResponseBlockchain(vec![latest]))
            }
            Message::QueryAll => {
                let blocks = self.ledger.get_blocks()?;
                self.send_message(addr_from, Message::ResponseBlockchain(blocks))
            }
            Message::ResponseBlockchain(blocks) => {
                match handle_blockchain_response(&self.ledger, blocks)? {
                    SyncAction::RequestFullChain => {
                        self.send_message(addr_from, Message::QueryAll)
                    }
                    action if action.changed_tip() => {
                        let latest = self.ledger.latest_block()?;
                        self.announce_block(&latest);
                        Ok(())
                    }
                    _ => Ok(()),
                }
            }
            Message::QueryTransactionPool => {
                let pool = self.ledger.pool_snapshot()?;
                self.send_message(addr_from, Message::ResponseTransactionPool(pool))
            }
            Message::ResponseTransactionPool(transactions) => {
                for tx in transactions {
                    let id = tx.get_id().to_string();
                    match self.ledger.submit_transaction(tx.clone()) {
                        Ok(()) => self.announce_transaction(&tx),
                        Err(e) => debug!("Not pooling transaction {id}: {e}"),
                    }
                }
                Ok(())
            }
        }
    }

    fn process_control(&self, request: ControlRequest) -> ControlResponse {
        match self.try_control(request) {
            Ok(response) => response,
            Err(e) => {
                warn!("Control request failed: {e}");
                ControlResponse::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    fn try_control(&self, request: ControlRequest) -> Result<ControlResponse> {
        let response = match request {
            ControlRequest::GetChain => ControlResponse::Chain(self.ledger.get_blocks()?),
            ControlRequest::GetBlock { hash } => {
                ControlResponse::Block(self.ledger.find_block(&hash)?)
            }
            ControlRequest::MineBlock { data } => {
                let block = self
                    .ledger
                    .mine_next_block(&self.key_pair.get_address(), data)?;
                self.announce_block(&block);
                ControlResponse::Mined(block)
            }
            ControlRequest::SendTransaction { address, amount } => {
                let tx = self
                    .ledger
                    .send_transaction(&address, amount, &self.key_pair)?;
                self.announce_transaction(&tx);
                ControlResponse::Transaction(tx)
            }
            ControlRequest::GetBalance { address } => {
                let address = address.unwrap_or_else(|| self.key_pair.get_address());
                let balance = self.ledger.balance(&address)?;
                ControlResponse::Balance { address, balance }
            }
            ControlRequest::GetAddress => ControlResponse::Address(self.key_pair.get_address()),
            ControlRequest::GetTransactionPool => {
                ControlResponse::TransactionPool(self.ledger.pool_snapshot()?)
            }
            ControlRequest::GetPeers => ControlResponse::Peers(self.nodes.get_addrs()),
            ControlRequest::AddPeer { addr } => {
                self.connect_to_network(std::slice::from_ref(&addr));
                ControlResponse::PeerAdded(addr)
            }
        };
        Ok(response)
    }

    fn announce_block(&self, block: &Block) {
        self.broadcast(Message::ResponseBlockchain(vec![block.clone()]));
    }

    fn announce_transaction(&self, tx: &Transaction) {
        self.broadcast(Message::ResponseTransactionPool(vec![tx.clone()]));
    }

    fn broadcast(&self, message: Message) {
        for node in self.nodes.get_nodes() {
            let addr = node.get_addr();
            if let Err(e) = self.send_message(&addr, message.clone()) {
                warn!("Evicting unreachable peer {addr}: {e}");
                self.nodes.evict_node(&addr);
            }
        }
    }

    fn send_message(&self, addr: &str, message: Message) -> Result<()> {
        send_data(
            addr,
            &Package::Peer {
                addr_from: self.addr.clone(),
                message,
            },
        )
    }
}

fn connect(addr: &str) -> Result<TcpStream> {
    let socket_addr = addr
        .parse::<SocketAddr>()
        .map_err(|e| LedgerError::Network(format!("Invalid address {addr}: {e}")))?;

    let stream =
        TcpStream::connect_timeout(&socket_addr, Duration::from_millis(TCP_WRITE_TIMEOUT))
            .map_err(|e| LedgerError::Network(format!("Failed to connect to {addr}: {e}")))?;
    stream
        .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))
        .map_err(|e| LedgerError::Network(format!("Failed to set write timeout: {e}")))?;
    Ok(stream)
}

/// Writes one package on a fresh connection
pub fn send_data(addr: &str, pkg: &Package) -> Result<()> {
    debug!("Sending package to {addr}: {pkg:?}");
    let bytes = serialize(pkg)?;
    let mut stream = connect(addr)?;
    stream
        .write_all(&bytes)
        .map_err(|e| LedgerError::Network(format!("Failed to send data: {e}")))?;
    stream
        .flush()
        .map_err(|e| LedgerError::Network(format!("Failed to flush data: {e}")))?;
    Ok(())
}

/// Sends a control request and waits for its reply on the same connection
pub fn send_control(addr: &str, request: ControlRequest) -> Result<ControlResponse> {
    let bytes = serialize(&Package::Control(request))?;
    let mut stream = connect(addr)?;
    stream
        .write_all(&bytes)
        .map_err(|e| LedgerError::Network(format!("Failed to send request: {e}")))?;
    stream
        .shutdown(Shutdown::Write)
        .map_err(|e| LedgerError::Network(format!("Failed to finish request: {e}")))?;

    let reader = BufReader::new(&stream);
    match Deserializer::from_reader(reader)
        .into_iter::<ControlResponse>()
        .next()
    {
        Some(response) => response
            .map_err(|e| LedgerError::Network(format!("Failed to read response: {e}"))),
        None => Err(LedgerError::Network(format!(
            "{addr} closed the connection without replying"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_server() -> Server {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = Server::new(Ledger::new().unwrap(), KeyPair::generate().unwrap(), &addr);
        let background = server.clone();
        thread::spawn(move || background.serve(listener));
        server
    }

    #[test]
    fn test_control_round_trip() {
        let server = spawn_server();
        let addr = server.get_addr().to_string();

        let response = send_control(&addr, ControlRequest::GetAddress).unwrap();
        assert!(matches!(response, ControlResponse::Address(a) if a.len() == 130));

        match send_control(&addr, ControlRequest::MineBlock { data: None }).unwrap() {
            ControlResponse::Mined(block) => assert_eq!(block.get_index(), 1),
            other => panic!("unexpected response {other:?}"),
        }
        match send_control(&addr, ControlRequest::GetBalance { address: None }).unwrap() {
            ControlResponse::Balance { balance, .. } => assert_eq!(balance, 50),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_control_errors_are_replies() {
        let server = spawn_server();
        let response = send_control(
            server.get_addr(),
            ControlRequest::SendTransaction {
                address: "nobody".to_string(),
                amount: 1,
            },
        )
        .unwrap();
        assert!(matches!(response, ControlResponse::Error { .. }));
    }

    #[test]
    fn test_send_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(matches!(
            send_control(&addr, ControlRequest::GetPeers),
            Err(LedgerError::Network(_))
        ));
    }
}
