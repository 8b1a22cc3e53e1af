//! Peer-to-peer gossip and the local control surface
//!
//! Nodes exchange JSON packages over TCP. Peer messages are answered on a new
//! connection to the sender; control requests are answered in place.

pub mod message;
pub mod node;
pub mod server;
pub mod sync;

pub use message::{ControlRequest, ControlResponse, Message, Package};
pub use node::{Node, Nodes};
pub use server::{send_control, send_data, Server};
pub use sync::{handle_blockchain_response, SyncAction};
