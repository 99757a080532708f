//! Core ledger types
//!
//! The fundamental pieces shared by mining, validation, and the node:
//! blocks, transactions, the chain, targets, and the header hasher.

mod block;
mod chain;
pub mod hash;
pub mod hasher;
mod target;

pub use block::{Block, HeaderData, Transaction};
pub use chain::Chain;
pub use hash::Hash32;
pub use hasher::{BlockHasher, Sha256Hasher};
pub use target::Target;

/// Reward paid to the miner of each block via its coinbase transaction
pub const BLOCK_REWARD: f64 = 100.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_reward() {
        assert_eq!(BLOCK_REWARD, 100.0);
    }

    #[test]
    fn test_reexports_compose() {
        let hasher = Sha256Hasher;
        let chain = Chain::genesis(&hasher);
        assert!(Target::MAX.meets(&chain.last().hash));
    }
}
