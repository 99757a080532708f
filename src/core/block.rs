//! Block and transaction types

use crate::core::hash::Hash32;
use crate::core::hasher::{self, BlockHasher};
use crate::core::target::Target;
use crate::core::BLOCK_REWARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value transfer recorded in a block.
///
/// The sender is the SHA-256 hex of the sender's secret key. Coinbase
/// transactions, which pay the block reward, carry an empty sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub recipient: String,
    pub value: f64,
    pub message: String,
    pub hash: Hash32,
}

impl Transaction {
    /// Create a transaction stamped with the current time, hash included
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        value: f64,
        message: impl Into<String>,
    ) -> Self {
        Self::at(Utc::now(), sender, recipient, value, message)
    }

    /// Create a transaction at a specific timestamp
    pub fn at(
        timestamp: DateTime<Utc>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        value: f64,
        message: impl Into<String>,
    ) -> Self {
        let sender = sender.into();
        let recipient = recipient.into();
        let message = message.into();
        let hash = hasher::tx_hash(value, &timestamp, &sender, &recipient, &message);

        Self {
            timestamp,
            sender,
            recipient,
            value,
            message,
            hash,
        }
    }

    /// Create the block-reward transaction paying a miner
    pub fn coinbase(recipient: impl Into<String>) -> Self {
        Self::new("", recipient, BLOCK_REWARD, "Block solve reward")
    }

    /// Whether this is a coinbase (reward) transaction
    pub fn is_coinbase(&self) -> bool {
        self.sender.is_empty()
    }
}

/// The hashed portion of a block. Cheap to copy, so the mining hot loop can
/// assemble one per nonce without touching the transaction list.
#[derive(Debug, Clone, Copy)]
pub struct HeaderData {
    pub timestamp: DateTime<Utc>,
    pub prev_hash: Hash32,
    pub nonce: u64,
    pub target: Target,
    pub merkle_root: Hash32,
}

/// A link in the chain: header fields, the transaction payload, and the
/// header digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: DateTime<Utc>,
    pub prev_hash: Hash32,
    pub nonce: u64,
    pub target: Target,
    pub merkle_root: Hash32,
    pub miner_pubkey: String,
    pub txs: Vec<Transaction>,
    pub hash: Hash32,
}

impl Block {
    /// Assemble a block on top of `prev_hash`, stamped with the current time.
    /// The merkle root and header digest are computed here.
    pub fn new(
        hasher: &dyn BlockHasher,
        prev_hash: Hash32,
        txs: Vec<Transaction>,
        nonce: u64,
        target: Target,
        miner_pubkey: impl Into<String>,
    ) -> Self {
        let timestamp = Utc::now();
        let merkle_root = hasher::merkle_root(&txs);
        let header = HeaderData {
            timestamp,
            prev_hash,
            nonce,
            target,
            merkle_root,
        };
        let hash = hasher.hash(&header);

        Self {
            timestamp,
            prev_hash,
            nonce,
            target,
            merkle_root,
            miner_pubkey: miner_pubkey.into(),
            txs,
            hash,
        }
    }

    /// The deterministic first block: zero prev-hash, no transactions, epoch
    /// timestamp, maximum target.
    pub fn genesis(hasher: &dyn BlockHasher) -> Self {
        let timestamp = DateTime::<Utc>::UNIX_EPOCH;
        let header = HeaderData {
            timestamp,
            prev_hash: Hash32::ZERO,
            nonce: 0,
            target: Target::MAX,
            merkle_root: Hash32::ZERO,
        };
        let hash = hasher.hash(&header);

        Self {
            timestamp,
            prev_hash: Hash32::ZERO,
            nonce: 0,
            target: Target::MAX,
            merkle_root: Hash32::ZERO,
            miner_pubkey: String::new(),
            txs: Vec::new(),
            hash,
        }
    }

    /// View of the hashed header fields
    pub fn header(&self) -> HeaderData {
        HeaderData {
            timestamp: self.timestamp,
            prev_hash: self.prev_hash,
            nonce: self.nonce,
            target: self.target,
            merkle_root: self.merkle_root,
        }
    }

    /// The miner credited by this block's coinbase, if present.
    ///
    /// Attribution reads the coinbase recipient rather than trusting the
    /// `miner_pubkey` field.
    pub fn mined_by(&self) -> Option<&str> {
        self.txs
            .first()
            .filter(|tx| tx.is_coinbase())
            .map(|tx| tx.recipient.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::Sha256Hasher;

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::coinbase("miner-key");
        assert!(tx.is_coinbase());
        assert_eq!(tx.sender, "");
        assert_eq!(tx.recipient, "miner-key");
        assert_eq!(tx.value, BLOCK_REWARD);
        assert!(!tx.hash.is_zero());
    }

    #[test]
    fn test_tx_hash_depends_on_fields() {
        let ts = Utc::now();
        let a = Transaction::at(ts, "alice", "bob", 5.0, "coffee");
        let b = Transaction::at(ts, "alice", "bob", 5.0, "tea");
        let c = Transaction::at(ts, "alice", "bob", 6.0, "coffee");
        assert_ne!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let hasher = Sha256Hasher;
        let a = Block::genesis(&hasher);
        let b = Block::genesis(&hasher);
        assert_eq!(a.hash, b.hash);
        assert!(a.prev_hash.is_zero());
        assert!(a.txs.is_empty());
        assert_eq!(a.target, Target::MAX);
    }

    #[test]
    fn test_block_hash_matches_header() {
        let hasher = Sha256Hasher;
        let genesis = Block::genesis(&hasher);
        let block = Block::new(
            &hasher,
            genesis.hash,
            vec![Transaction::coinbase("miner")],
            42,
            Target::MAX,
            "miner",
        );
        assert_eq!(block.hash, hasher.hash(&block.header()));
        assert_eq!(block.prev_hash, genesis.hash);
    }

    #[test]
    fn test_mined_by_reads_coinbase() {
        let hasher = Sha256Hasher;
        let genesis = Block::genesis(&hasher);
        assert_eq!(genesis.mined_by(), None);

        let block = Block::new(
            &hasher,
            genesis.hash,
            vec![Transaction::coinbase("miner"), Transaction::new("a", "b", 1.0, "")],
            0,
            Target::MAX,
            "miner",
        );
        assert_eq!(block.mined_by(), Some("miner"));
    }
}
