//! Wire types for the peer RPC surface

use crate::core::{hasher, Chain, Hash32, Transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node on the network.
///
/// A single operator may run several nodes under one pubkey; the pool ID
/// disambiguates them, so a same-pubkey peer at a different pool ID is a
/// distinct peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub pubkey: String,
    pub pool_id: i32,
}

impl NodeId {
    pub fn new(pubkey: impl Into<String>, pool_id: i32) -> Self {
        Self {
            pubkey: pubkey.into(),
            pool_id,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = if self.pubkey.len() > 8 {
            &self.pubkey[..8]
        } else {
            &self.pubkey
        };
        write!(f, "{}#{}", short, self.pool_id)
    }
}

/// Peer handshake: who is calling, where to reach them, and what addresses
/// they know
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverRequest {
    pub node_id: NodeId,
    pub return_addr: String,
    #[serde(default)]
    pub known_addrs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub ok: bool,
    pub node_id: NodeId,
    #[serde(default)]
    pub known_addrs: Vec<String>,
}

/// Bootstrap read of a peer's chain and difficulty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub chain: Chain,
    pub difficulty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareChainRequest {
    pub chain: Chain,
    #[serde(default)]
    pub node_id: Option<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareChainResponse {
    pub accepted: bool,
}

/// A transaction as submitted over RPC. Optional fields are filled in
/// server-side before admission: a missing timestamp becomes the receipt
/// time, a missing hash is computed, and a submission carrying a
/// `sender_key` instead of a sender has the pubkey derived and the key
/// discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxSubmission {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_key: Option<String>,
    pub recipient: String,
    pub value: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub hash: Option<Hash32>,
}

impl TxSubmission {
    /// Normalize into a pool-ready transaction
    pub fn into_tx(self) -> Transaction {
        let sender = match self.sender_key {
            Some(ref key) if self.sender.is_empty() && !key.is_empty() => {
                hasher::pubkey_from_key(key)
            }
            _ => self.sender,
        };

        let timestamp = self.timestamp.unwrap_or_else(Utc::now);
        let hash = self.hash.unwrap_or_else(|| {
            hasher::tx_hash(self.value, &timestamp, &sender, &self.recipient, &self.message)
        });

        Transaction {
            timestamp,
            sender,
            recipient: self.recipient,
            value: self.value,
            message: self.message,
            hash,
        }
    }
}

impl From<&Transaction> for TxSubmission {
    fn from(tx: &Transaction) -> Self {
        Self {
            timestamp: Some(tx.timestamp),
            sender: tx.sender.clone(),
            sender_key: None,
            recipient: tx.recipient.clone(),
            value: tx.value,
            message: tx.message.clone(),
            hash: Some(tx.hash),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareTxRequest {
    pub tx: TxSubmission,
    #[serde(default)]
    pub node_id: Option<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareTxResponse {
    pub accepted: bool,
    #[serde(default)]
    pub info: String,
}

/// Credit lookup by secret key; the server derives the pubkey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditResponse {
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_equality_includes_pool() {
        let a = NodeId::new("pubkey", 0);
        let b = NodeId::new("pubkey", 1);
        let c = NodeId::new("pubkey", 0);
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_submission_derives_sender_from_key() {
        let submission = TxSubmission {
            timestamp: None,
            sender: String::new(),
            sender_key: Some("secret".to_string()),
            recipient: "bob".to_string(),
            value: 5.0,
            message: String::new(),
            hash: None,
        };

        let tx = submission.into_tx();
        assert_eq!(tx.sender, hasher::pubkey_from_key("secret"));
        assert!(!tx.hash.is_zero());
    }

    #[test]
    fn test_submission_keeps_explicit_fields() {
        let original = Transaction::new("alice", "bob", 2.5, "ping");
        let submission = TxSubmission::from(&original);
        let tx = submission.into_tx();
        assert_eq!(tx, original);
    }

    #[test]
    fn test_submission_fills_missing_hash() {
        let ts = Utc::now();
        let submission = TxSubmission {
            timestamp: Some(ts),
            sender: "alice".to_string(),
            sender_key: None,
            recipient: "bob".to_string(),
            value: 1.0,
            message: "m".to_string(),
            hash: None,
        };

        let tx = submission.into_tx();
        assert_eq!(tx.hash, hasher::tx_hash(1.0, &ts, "alice", "bob", "m"));
    }

    #[test]
    fn test_wire_round_trip() {
        let req = ShareTxRequest {
            tx: TxSubmission::from(&Transaction::new("a", "b", 1.0, "")),
            node_id: Some(NodeId::new("pubkey", 2)),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: ShareTxRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node_id, req.node_id);
        assert_eq!(back.tx.into_tx(), req.tx.into_tx());
    }
}
