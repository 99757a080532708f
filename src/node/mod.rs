//! The node core: sole owner of the chain, transaction pool, and difficulty
//!
//! Every state mutation funnels through one event loop. Miner solves, peer
//! chains, peer transactions, and RPC reads all arrive as messages; the loop
//! applies the longest-valid-chain rule, runs difficulty recalculation at
//! window boundaries, re-primes the mining workers, and hands gossip to the
//! peer registry.

mod telemetry;

pub use telemetry::TelemetryLog;

use crate::config::Config;
use crate::core::{BlockHasher, Chain, Transaction};
use crate::difficulty::DifficultyController;
use crate::error::Result;
use crate::miner::{MiningCoordinator, SolveReport};
use crate::net::registry::PeerRegistry;
use crate::net::types::NodeId;
use crate::storage;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Capacity of the node's event channel
const EVENT_QUEUE_DEPTH: usize = 64;

/// Result of a transaction admission attempt
#[derive(Debug, Clone, PartialEq)]
pub struct TxOutcome {
    pub accepted: bool,
    pub info: String,
}

impl TxOutcome {
    fn rejected(info: impl Into<String>) -> Self {
        Self {
            accepted: false,
            info: info.into(),
        }
    }
}

/// Read snapshot of the node's consensus state
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub chain: Chain,
    pub difficulty: f64,
}

/// Messages the node loop serializes
pub enum NodeEvent {
    /// A chain offered by a peer (or adopted at bootstrap)
    PeerChain {
        chain: Chain,
        from: Option<NodeId>,
        reply: oneshot::Sender<bool>,
    },
    /// A transaction offered over RPC
    PeerTx {
        tx: Transaction,
        from: Option<NodeId>,
        reply: oneshot::Sender<TxOutcome>,
    },
    /// Bootstrap read of chain and difficulty
    GetState { reply: oneshot::Sender<StateSnapshot> },
    /// Committed credit of a pubkey
    GetCredit {
        pubkey: String,
        reply: oneshot::Sender<f64>,
    },
}

/// Cloneable sender half used by RPC handlers and peers
#[derive(Clone)]
pub struct NodeHandle {
    events: mpsc::Sender<NodeEvent>,
}

impl NodeHandle {
    /// Offer a chain; true when it replaced the current one
    pub async fn share_chain(&self, chain: Chain, from: Option<NodeId>) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .events
            .send(NodeEvent::PeerChain { chain, from, reply })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Offer a transaction for pool admission
    pub async fn share_tx(&self, tx: Transaction, from: Option<NodeId>) -> TxOutcome {
        let (reply, rx) = oneshot::channel();
        if self
            .events
            .send(NodeEvent::PeerTx { tx, from, reply })
            .await
            .is_err()
        {
            return TxOutcome::rejected("node is shutting down");
        }
        rx.await
            .unwrap_or_else(|_| TxOutcome::rejected("node is shutting down"))
    }

    /// Snapshot the chain and difficulty
    pub async fn state(&self) -> Option<StateSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.events.send(NodeEvent::GetState { reply }).await.ok()?;
        rx.await.ok()
    }

    /// Committed credit of a pubkey, net of nothing pending
    pub async fn credit_of(&self, pubkey: String) -> f64 {
        let (reply, rx) = oneshot::channel();
        if self
            .events
            .send(NodeEvent::GetCredit { pubkey, reply })
            .await
            .is_err()
        {
            return 0.0;
        }
        rx.await.unwrap_or(0.0)
    }
}

/// The node: owns the chain, pool, and difficulty, and reacts to events
pub struct Node {
    pubkey: String,
    node_id: NodeId,
    files_prefix: String,
    hasher: Arc<dyn BlockHasher>,
    chain: Chain,
    txpool: Vec<Transaction>,
    difficulty: DifficultyController,
    coordinator: MiningCoordinator,
    registry: Arc<PeerRegistry>,
    blocks_log: TelemetryLog,
    periods_log: TelemetryLog,
    /// Taken by [`Node::run`]; the loop owns it from then on
    events: Option<mpsc::Receiver<NodeEvent>>,
    shutdown: watch::Receiver<bool>,
}

impl Node {
    /// Build the node and spawn its mining workers, primed with the current
    /// chain tip, the controller's target, and a pool holding one fresh
    /// coinbase. Returns the node, the handle RPC uses to reach it, and the
    /// merged solve stream to feed to [`Node::run`].
    pub fn new(
        config: &Config,
        hasher: Arc<dyn BlockHasher>,
        chain: Chain,
        difficulty: DifficultyController,
        registry: Arc<PeerRegistry>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(Self, NodeHandle, mpsc::Receiver<SolveReport>)> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

        let txpool = vec![Transaction::coinbase(&config.pubkey)];
        let (coordinator, solves) = MiningCoordinator::spawn(
            config.num_miners,
            &config.pubkey,
            config.speed,
            Arc::clone(&hasher),
            chain.last().hash,
            difficulty.target()?,
            txpool.clone(),
        );

        let node = Self {
            pubkey: config.pubkey.clone(),
            node_id: NodeId::new(&config.pubkey, config.pool_id),
            files_prefix: config.files_prefix.clone(),
            hasher,
            chain,
            txpool,
            difficulty,
            coordinator,
            registry,
            blocks_log: TelemetryLog::blocks(&config.files_prefix)?,
            periods_log: TelemetryLog::periods(&config.files_prefix)?,
            events: Some(events_rx),
            shutdown,
        };

        Ok((node, NodeHandle { events: events_tx }, solves))
    }

    /// Drain events until shutdown, then persist the chain and stop the
    /// mining workers.
    pub async fn run(mut self, mut solves: mpsc::Receiver<SolveReport>) {
        let mut events = self.events.take().expect("run is called once");
        let mut shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                Some(report) = solves.recv() => self.on_local_solve(report),
                Some(event) = events.recv() => self.on_event(event),
                _ = shutdown.changed() => break,
            }
        }

        if let Err(e) = storage::store(&self.chain, &self.files_prefix) {
            error!("could not persist chain at shutdown: {}", e);
        }

        // Dropping the solve stream releases workers blocked on a send;
        // shutdown then joins them.
        drop(solves);
        self.coordinator.shutdown();
        info!("shutting down node");
    }

    fn on_event(&mut self, event: NodeEvent) {
        match event {
            NodeEvent::PeerChain { chain, from, reply } => {
                let accepted = self.accept_chain(chain, false);
                if accepted {
                    self.gossip_chain(from);
                }
                let _ = reply.send(accepted);
            }
            NodeEvent::PeerTx { tx, from, reply } => {
                let outcome = self.admit_tx(tx.clone());
                if outcome.accepted {
                    self.gossip_tx(tx, from);
                }
                let _ = reply.send(outcome);
            }
            NodeEvent::GetState { reply } => {
                let _ = reply.send(StateSnapshot {
                    chain: self.chain.clone(),
                    difficulty: self.difficulty.difficulty(),
                });
            }
            NodeEvent::GetCredit { pubkey, reply } => {
                let _ = reply.send(self.chain.credit_of(&pubkey));
            }
        }
    }

    /// A worker solved a block against our own inputs: trusted, but the
    /// length rule still applies as a correctness net against stale solves.
    fn on_local_solve(&mut self, report: SolveReport) {
        debug!(worker_id = report.worker_id, "local solve received");
        let candidate = self.chain.with_block(report.block);
        if self.accept_chain(candidate, true) {
            self.gossip_chain(None);
        } else {
            debug!(worker_id = report.worker_id, "stale local solve discarded");
        }
    }

    /// The replacement rule. Accepts only a strictly longer chain that (for
    /// untrusted sources) passes full validation; on success re-primes the
    /// workers, recalculates difficulty at window boundaries, and resets the
    /// transaction pool around a fresh coinbase.
    fn accept_chain(&mut self, chain: Chain, trusted: bool) -> bool {
        if chain.len() <= self.chain.len() {
            return false;
        }
        if !trusted && !chain.is_valid(&*self.hasher) {
            debug!("rejecting invalid peer chain");
            return false;
        }

        self.chain = chain;
        self.log_accept();

        self.coordinator.set_prev_hash(self.chain.last().hash);

        if self.difficulty.is_boundary(self.chain.len()) {
            if let Some(recalc) = self.difficulty.recalc(&self.chain) {
                self.periods_log.append(recalc.actual_avg_secs, recalc.previous);
                match self.difficulty.target() {
                    Ok(target) => self.coordinator.set_target(target),
                    Err(e) => warn!("could not derive target: {}", e),
                }
            }
        }

        self.reset_txpool();
        true
    }

    /// Clear the pool and re-seed it with a coinbase paying this node
    fn reset_txpool(&mut self) {
        self.txpool = vec![Transaction::coinbase(&self.pubkey)];
        self.coordinator.set_txs(&self.txpool);
    }

    /// Admission control for inbound transactions. Coinbase entries are
    /// created only by the pool-reset path, never admitted here. Gossip
    /// happens after admission, in the event handler.
    fn admit_tx(&mut self, tx: Transaction) -> TxOutcome {
        if self
            .txpool
            .iter()
            .any(|t| t.timestamp == tx.timestamp && t.hash == tx.hash)
        {
            return TxOutcome::rejected("tx already in pool");
        }
        if tx.sender.is_empty() {
            return TxOutcome::rejected("`sender` must not be empty");
        }
        if tx.recipient.is_empty() {
            return TxOutcome::rejected("`recipient` must not be empty");
        }
        if !(tx.value > 0.0) {
            return TxOutcome::rejected("`value` must be greater than 0");
        }

        let available = self.chain.credit_of(&tx.sender) - self.pending_debits(&tx.sender);
        if tx.value > available {
            return TxOutcome::rejected(format!(
                "insufficient credit; pubkey owns {}",
                available
            ));
        }

        info!(
            value = tx.value,
            sender = %tx.sender,
            recipient = %tx.recipient,
            "new tx admitted to pool"
        );

        let value = tx.value;
        self.txpool.push(tx);
        self.coordinator.set_txs(&self.txpool);

        TxOutcome {
            accepted: true,
            info: format!(
                "sender will have {} left after tx is committed in the next block",
                available - value
            ),
        }
    }

    /// Value already promised by pool entries from this sender
    fn pending_debits(&self, sender: &str) -> f64 {
        self.txpool
            .iter()
            .filter(|tx| !tx.is_coinbase() && tx.sender == sender)
            .map(|tx| tx.value)
            .sum()
    }

    /// Log the newly accepted tip and record its solve duration
    fn log_accept(&mut self) {
        let block = self.chain.last();
        let solve_secs = self
            .chain
            .last_block_dur()
            .and_then(|d| d.num_nanoseconds())
            .map(|n| n as f64 / 1e9)
            .unwrap_or(0.0);

        let mined_by = match block.mined_by() {
            Some(pubkey) if pubkey == self.pubkey => format!("{} (you)", pubkey),
            Some(pubkey) => pubkey.to_string(),
            None => block.miner_pubkey.clone(),
        };

        info!(
            hash = %block.hash,
            height = self.chain.len() - 1,
            solve_secs,
            mined_by = %mined_by,
            "chain extended"
        );

        self.blocks_log.append(solve_secs, self.difficulty.difficulty());
    }

    /// Fan the current chain out to every peer except the origin
    fn gossip_chain(&self, except: Option<NodeId>) {
        let registry = Arc::clone(&self.registry);
        let chain = self.chain.clone();
        let node_id = self.node_id.clone();
        tokio::spawn(async move {
            registry.propagate_chain(&chain, &node_id, except).await;
        });
    }

    /// Fan an admitted transaction out to every peer except the origin
    fn gossip_tx(&self, tx: Transaction, except: Option<NodeId>) {
        let registry = Arc::clone(&self.registry);
        let node_id = self.node_id.clone();
        tokio::spawn(async move {
            registry.propagate_tx(&tx, &node_id, except).await;
        });
    }
}
