//! Single-threaded nonce search

use crate::config::HashSpeed;
use crate::core::{hasher, Block, BlockHasher, Hash32, HeaderData, Target, Transaction};
use crate::miner::{SolveReport, WorkerUpdate};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use tracing::debug;

/// A mining worker. Owns a read-only snapshot of
/// `(prev_hash, target, txs, pubkey)` plus its local nonce counter, and
/// hashes candidate headers until one satisfies the target.
pub struct MinerWorker {
    id: usize,
    pubkey: String,
    speed: HashSpeed,
    hasher: Arc<dyn BlockHasher>,

    prev_hash: Hash32,
    target: Target,
    txs: Vec<Transaction>,
    merkle_root: Hash32,
    nonce: u64,

    updates: Receiver<WorkerUpdate>,
    solves: tokio::sync::mpsc::Sender<SolveReport>,
    stop: Arc<AtomicBool>,
}

impl MinerWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: usize,
        pubkey: String,
        speed: HashSpeed,
        hasher: Arc<dyn BlockHasher>,
        prev_hash: Hash32,
        target: Target,
        txs: Vec<Transaction>,
        updates: Receiver<WorkerUpdate>,
        solves: tokio::sync::mpsc::Sender<SolveReport>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let merkle_root = hasher::merkle_root(&txs);
        Self {
            id,
            pubkey,
            speed,
            hasher,
            prev_hash,
            target,
            txs,
            merkle_root,
            nonce: 0,
            updates,
            solves,
            stop,
        }
    }

    /// The worker loop. Returns when cancellation is signaled or the solve
    /// channel closes; dropping the worker closes its side of the channel.
    pub fn run(mut self) {
        debug!(worker_id = self.id, "mining worker started");

        loop {
            if self.stop.load(Ordering::Relaxed) {
                debug!(worker_id = self.id, "mining worker stopping");
                return;
            }

            if let Some(report) = self.step() {
                if self.solves.blocking_send(report).is_err() {
                    return;
                }
            }

            if let Some(pause) = self.speed.throttle() {
                std::thread::sleep(pause);
            }
        }
    }

    /// One loop iteration: apply pending updates, hash one candidate, and
    /// report it when it satisfies the target.
    fn step(&mut self) -> Option<SolveReport> {
        self.drain_updates();

        let timestamp = Utc::now();
        let header = HeaderData {
            timestamp,
            prev_hash: self.prev_hash,
            nonce: self.nonce,
            target: self.target,
            merkle_root: self.merkle_root,
        };
        let hash = self.hasher.hash(&header);

        if self.target.meets(&hash) {
            let block = Block {
                timestamp,
                prev_hash: self.prev_hash,
                nonce: self.nonce,
                target: self.target,
                merkle_root: self.merkle_root,
                miner_pubkey: self.pubkey.clone(),
                txs: self.txs.clone(),
                hash,
            };

            // Continue on top of the solve until the node re-primes us
            self.prev_hash = hash;
            self.nonce = 0;

            return Some(SolveReport {
                worker_id: self.id,
                block,
            });
        }

        self.nonce = self.nonce.wrapping_add(1);
        None
    }

    /// Apply every queued update before the next candidate is assembled
    fn drain_updates(&mut self) {
        loop {
            match self.updates.try_recv() {
                Ok(update) => self.apply(update),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.stop.store(true, Ordering::Relaxed);
                    return;
                }
            }
        }
    }

    fn apply(&mut self, update: WorkerUpdate) {
        match update {
            WorkerUpdate::PrevHash(hash) => {
                self.prev_hash = hash;
                self.nonce = 0;
            }
            WorkerUpdate::Target(target) => {
                self.target = target;
            }
            WorkerUpdate::Txs(txs) => {
                self.merkle_root = hasher::merkle_root(&txs);
                self.txs = txs;
            }
        }
    }
}
