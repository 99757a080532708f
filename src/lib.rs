//! # forgechain
//!
//! A proof-of-work blockchain node. The node maintains an append-only
//! hash-chained ledger, competes with peers to extend it by nonce search,
//! verifies candidate chains received from peers, adjusts mining difficulty
//! to hold a target block interval, and propagates blocks and transactions
//! through an HTTP gossip overlay.
//!
//! ## Architecture
//!
//! All consensus state (the chain, the transaction pool, and the current
//! difficulty) is owned by a single [`node::Node`] event loop. Mining
//! workers, RPC handlers, and the discovery ticker communicate with it over
//! channels; nothing else mutates the chain. Workers hold read-only
//! snapshots of `(prev_hash, target, txs)` that the
//! [`miner::MiningCoordinator`] refreshes whenever the chain changes.

#![warn(rust_2018_idioms, unused_lifetimes, unused_qualifications)]
#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod difficulty;
pub mod error;
pub mod miner;
pub mod net;
pub mod node;
pub mod storage;

pub use crate::config::{Args, Config, HashSpeed};
pub use crate::core::{Block, Chain, Hash32, Target, Transaction, BLOCK_REWARD};
pub use crate::error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Args, Config, HashSpeed};
    pub use crate::core::{
        Block, BlockHasher, Chain, Hash32, Sha256Hasher, Target, Transaction, BLOCK_REWARD,
    };
    pub use crate::difficulty::DifficultyController;
    pub use crate::error::{Error, Result};
    pub use crate::miner::MiningCoordinator;
    pub use crate::net::{NodeId, PeerRegistry};
    pub use crate::node::{Node, NodeHandle};
}
