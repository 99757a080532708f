//! Block header and transaction digests
//!
//! The `BlockHasher` trait is the only approved path to a block's digest;
//! mining and validation must agree byte-for-byte, so both go through it.
//! The trait seam also lets tests substitute a deterministic hasher.

use crate::core::block::{HeaderData, Transaction};
use crate::core::hash::Hash32;
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Computes the digest of a block header
pub trait BlockHasher: Send + Sync {
    fn hash(&self, header: &HeaderData) -> Hash32;
}

/// Production hasher: SHA-256 over the canonical header byte sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl BlockHasher for Sha256Hasher {
    /// Concatenates, in fixed order: the canonical timestamp text, the
    /// previous block's digest, the nonce (big-endian), the target bytes,
    /// and the merkle root.
    fn hash(&self, header: &HeaderData) -> Hash32 {
        let mut hasher = Sha256::new();
        hasher.update(timestamp_text(&header.timestamp).as_bytes());
        hasher.update(header.prev_hash.as_bytes());
        hasher.update(header.nonce.to_be_bytes());
        hasher.update(header.target.as_bytes());
        hasher.update(header.merkle_root.as_bytes());
        Hash32(hasher.finalize().into())
    }
}

/// Canonical textual form of a timestamp: RFC 3339 UTC with nanosecond
/// precision, e.g. `2024-05-01T12:00:00.000000001Z`
pub fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Transaction digest: SHA-256 over the decimal value, canonical timestamp
/// text, sender, recipient, and message
pub fn tx_hash(
    value: f64,
    timestamp: &DateTime<Utc>,
    sender: &str,
    recipient: &str,
    message: &str,
) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hasher.update(timestamp_text(timestamp).as_bytes());
    hasher.update(sender.as_bytes());
    hasher.update(recipient.as_bytes());
    hasher.update(message.as_bytes());
    Hash32(hasher.finalize().into())
}

/// Flat merkle root: SHA-256 over the concatenation of the transaction
/// digests in order. Zero for an empty payload.
pub fn merkle_root(txs: &[Transaction]) -> Hash32 {
    if txs.is_empty() {
        return Hash32::ZERO;
    }

    let mut hasher = Sha256::new();
    for tx in txs {
        hasher.update(tx.hash.as_bytes());
    }
    Hash32(hasher.finalize().into())
}

/// Derive a pubkey from a secret key: SHA-256 hex of the key bytes
pub fn pubkey_from_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
