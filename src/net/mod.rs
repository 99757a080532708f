//! Gossip overlay: wire types, outbound peer sessions, the peer registry,
//! and the inbound RPC server

pub mod peer;
pub mod registry;
pub mod server;
pub mod types;

pub use peer::Peer;
pub use registry::PeerRegistry;
pub use types::NodeId;
