//! Peer registry and discovery
//!
//! Holds the set of live outbound peer sessions keyed by node identity, and
//! the map of known network addresses learned from seeds and peers. A
//! periodic ticker re-runs discovery while the node is under its minimum
//! peer count. Propagation fans the chain or a transaction out to every
//! peer except the origin, pruning peers that fail.

use crate::config::Config;
use crate::core::{Chain, Transaction};
use crate::net::peer::Peer;
use crate::net::types::{DiscoverRequest, NodeId, StateResponse};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How often the discovery ticker fires
const DISCOVERY_INTERVAL: Duration = Duration::from_secs(3);

/// Set of live peers plus the addresses worth dialing
pub struct PeerRegistry {
    self_id: NodeId,
    return_addr: String,
    seed_addrs: Vec<String>,
    min_peers: usize,
    max_peers: usize,
    http: reqwest::Client,
    peers: RwLock<HashMap<NodeId, Peer>>,
    known_addrs: RwLock<HashSet<String>>,
}

impl PeerRegistry {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.peer_deadline)
            .build()
            .expect("building the peer HTTP client");

        Self {
            self_id: NodeId::new(&config.pubkey, config.pool_id),
            return_addr: config.return_addr.clone(),
            seed_addrs: config.seed_addrs.clone(),
            min_peers: config.min_peers,
            max_peers: config.max_peers,
            http,
            peers: RwLock::new(HashMap::new()),
            known_addrs: RwLock::new(HashSet::new()),
        }
    }

    /// Number of live peer sessions
    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Merge learned addresses into the known set, filtering our own
    /// return address and empty strings
    pub fn merge_addrs(&self, addrs: impl IntoIterator<Item = String>) {
        let mut known = self.known_addrs.write();
        for addr in addrs {
            if !addr.is_empty() && addr != self.return_addr {
                known.insert(addr);
            }
        }
    }

    /// Forget an address that proved unreachable or self-referential
    pub fn remove_addr(&self, addr: &str) {
        self.known_addrs.write().remove(addr);
    }

    /// Snapshot of known addresses, minus the given exceptions
    pub fn known_addrs_except(&self, except: &[&str]) -> Vec<String> {
        self.known_addrs
            .read()
            .iter()
            .filter(|addr| !except.contains(&addr.as_str()))
            .cloned()
            .collect()
    }

    /// One discovery round: dial every known address that is not already a
    /// peer, handshake, and record accepting peers while under the maximum.
    pub async fn discover(self: &Arc<Self>) {
        if self.known_addrs.read().is_empty() {
            self.merge_addrs(self.seed_addrs.iter().cloned());
        }

        let peered: HashSet<String> = self
            .peers
            .read()
            .values()
            .map(|p| p.addr().to_string())
            .collect();

        let unknocked: Vec<String> = self
            .known_addrs
            .read()
            .iter()
            .filter(|addr| !peered.contains(*addr))
            .cloned()
            .collect();

        let dials = unknocked.into_iter().map(|addr| {
            let registry = Arc::clone(self);
            async move { registry.dial(addr).await }
        });
        futures::future::join_all(dials).await;

        debug!(peers = self.peer_count(), "discovery round finished");
    }

    async fn dial(&self, addr: String) {
        let peer = Peer::new(self.http.clone(), addr.clone());
        let req = DiscoverRequest {
            node_id: self.self_id.clone(),
            return_addr: self.return_addr.clone(),
            known_addrs: self.known_addrs_except(&[addr.as_str()]),
        };

        let resp = match peer.discover(&req).await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(addr = %addr, "no answer from address: {}", e);
                self.remove_addr(&addr);
                return;
            }
        };

        // Dialed ourselves through a round-about address
        if resp.node_id == self.self_id {
            self.remove_addr(&addr);
            return;
        }

        self.merge_addrs(resp.known_addrs);

        let mut peers = self.peers.write();
        if peers.contains_key(&resp.node_id) {
            return;
        }
        if resp.ok && peers.len() < self.max_peers {
            info!(addr = %addr, peer = %resp.node_id, "added new peer");
            peers.insert(resp.node_id, peer);
        }
    }

    /// Run discovery on a timer while under the minimum peer count
    pub async fn run_discovery(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(DISCOVERY_INTERVAL);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.peer_count() < self.min_peers {
                        self.discover().await;
                    }
                }
                _ = shutdown.changed() => {
                    debug!("discovery stopped");
                    return;
                }
            }
        }
    }

    /// Fetch `(chain, difficulty)` from every current peer for bootstrap.
    /// Returns the response with the longest chain; the caller validates it
    /// before adopting.
    pub async fn bootstrap_state(&self) -> Option<StateResponse> {
        let peers: Vec<Peer> = self.peers.read().values().cloned().collect();

        let reads = peers.iter().map(|peer| peer.get_state());
        let responses = futures::future::join_all(reads).await;

        responses
            .into_iter()
            .filter_map(|r| r.ok())
            .max_by_key(|state| state.chain.len())
    }

    /// Gossip the chain to every peer except the origin. A peer that fails
    /// is pruned from the registry.
    pub async fn propagate_chain(&self, chain: &Chain, node_id: &NodeId, except: Option<NodeId>) {
        let targets = self.targets_except(except);

        for (id, peer) in targets {
            if let Err(e) = peer.share_chain(chain, node_id).await {
                warn!(addr = %peer.addr(), "could not propagate chain: {}", e);
                self.prune(&id);
            }
        }
    }

    /// Gossip an admitted transaction to every peer except the origin
    pub async fn propagate_tx(&self, tx: &Transaction, node_id: &NodeId, except: Option<NodeId>) {
        let targets = self.targets_except(except);

        for (id, peer) in targets {
            if let Err(e) = peer.share_tx(tx, node_id).await {
                warn!(addr = %peer.addr(), "could not propagate tx: {}", e);
                self.prune(&id);
            }
        }
    }

    fn targets_except(&self, except: Option<NodeId>) -> Vec<(NodeId, Peer)> {
        self.peers
            .read()
            .iter()
            .filter(|(id, _)| Some(*id) != except.as_ref())
            .map(|(id, peer)| (id.clone(), peer.clone()))
            .collect()
    }

    fn prune(&self, id: &NodeId) {
        if self.peers.write().remove(id).is_some() {
            info!(peer = %id, "pruned unreachable peer");
        }
    }
}
