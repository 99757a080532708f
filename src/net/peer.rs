//! Outbound peer session

use crate::core::{Chain, Transaction};
use crate::error::{Error, Result};
use crate::net::types::{
    CreditRequest, CreditResponse, DiscoverRequest, DiscoverResponse, NodeId, ShareChainRequest,
    ShareChainResponse, ShareTxRequest, ShareTxResponse, StateResponse, TxSubmission,
};

/// A live outbound session to one peer. The HTTP client carries the
/// configured per-request deadline, so every call here is bounded.
#[derive(Debug, Clone)]
pub struct Peer {
    addr: String,
    http: reqwest::Client,
}

impl Peer {
    pub fn new(http: reqwest::Client, addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            http,
        }
    }

    /// The host:port this session dials
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Handshake: introduce ourselves and exchange known addresses
    pub async fn discover(&self, req: &DiscoverRequest) -> Result<DiscoverResponse> {
        let resp = self
            .http
            .post(self.url("/discover"))
            .json(req)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Bootstrap read of the peer's chain and difficulty
    pub async fn get_state(&self) -> Result<StateResponse> {
        let resp = self
            .http
            .get(self.url("/state"))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Offer our chain; the peer applies its own longest-valid rule
    pub async fn share_chain(&self, chain: &Chain, node_id: &NodeId) -> Result<bool> {
        let req = ShareChainRequest {
            chain: chain.clone(),
            node_id: Some(node_id.clone()),
        };
        let resp = self
            .http
            .post(self.url("/chain"))
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        let body: ShareChainResponse = resp.json().await?;
        Ok(body.accepted)
    }

    /// Offer a transaction we already admitted
    pub async fn share_tx(&self, tx: &Transaction, node_id: &NodeId) -> Result<()> {
        let req = ShareTxRequest {
            tx: TxSubmission::from(tx),
            node_id: Some(node_id.clone()),
        };
        let resp = self
            .http
            .post(self.url("/tx"))
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        let body: ShareTxResponse = resp.json().await?;
        if !body.accepted {
            return Err(Error::network(format!(
                "peer {} did not accept tx: {}",
                self.addr, body.info
            )));
        }
        Ok(())
    }

    /// Credit lookup by secret key
    pub async fn get_credit(&self, key: &str) -> Result<f64> {
        let req = CreditRequest {
            key: key.to_string(),
        };
        let resp = self
            .http
            .post(self.url("/credit"))
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        let body: CreditResponse = resp.json().await?;
        Ok(body.value)
    }
}
