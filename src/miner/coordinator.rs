//! Worker fan-out and solve fan-in

use crate::config::HashSpeed;
use crate::core::{BlockHasher, Hash32, Target, Transaction};
use crate::miner::{MinerWorker, SolveReport, WorkerUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{info, warn};

/// Spawns the configured number of workers on dedicated threads, pushes
/// chain-state changes to all of them, and merges their solve reports into
/// the single stream the node consumes.
///
/// The coordinator performs no validation of its own; the node treats local
/// solves as trusted but still applies the length rule.
pub struct MiningCoordinator {
    updates: Vec<mpsc::Sender<WorkerUpdate>>,
    stop: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl MiningCoordinator {
    /// Spawn `num_workers` miners primed with the given chain state.
    /// Returns the coordinator and the merged solve stream.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        num_workers: usize,
        pubkey: &str,
        speed: HashSpeed,
        hasher: Arc<dyn BlockHasher>,
        prev_hash: Hash32,
        target: Target,
        txs: Vec<Transaction>,
    ) -> (Self, tokio::sync::mpsc::Receiver<SolveReport>) {
        let (solve_tx, solve_rx) = tokio::sync::mpsc::channel(num_workers.max(1));
        let stop = Arc::new(AtomicBool::new(false));

        let mut updates = Vec::with_capacity(num_workers);
        let mut workers = Vec::with_capacity(num_workers);

        for id in 0..num_workers {
            let (update_tx, update_rx) = mpsc::channel();
            let worker = MinerWorker::new(
                id,
                pubkey.to_string(),
                speed,
                Arc::clone(&hasher),
                prev_hash,
                target,
                txs.clone(),
                update_rx,
                solve_tx.clone(),
                Arc::clone(&stop),
            );

            let handle = thread::Builder::new()
                .name(format!("miner-{}", id))
                .spawn(move || worker.run())
                .expect("spawning a mining thread");

            updates.push(update_tx);
            workers.push(handle);
        }

        info!(workers = num_workers, "mining coordinator started");

        (
            Self {
                updates,
                stop,
                workers,
            },
            solve_rx,
        )
    }

    /// Point every worker at a new chain tip (resets their nonces)
    pub fn set_prev_hash(&self, prev_hash: Hash32) {
        self.broadcast(WorkerUpdate::PrevHash(prev_hash));
    }

    /// Distribute a new mining target
    pub fn set_target(&self, target: Target) {
        self.broadcast(WorkerUpdate::Target(target));
    }

    /// Distribute a new transaction snapshot
    pub fn set_txs(&self, txs: &[Transaction]) {
        self.broadcast(WorkerUpdate::Txs(txs.to_vec()));
    }

    fn broadcast(&self, update: WorkerUpdate) {
        for tx in &self.updates {
            if tx.send(update.clone()).is_err() {
                warn!("mining worker is gone; update dropped");
            }
        }
    }

    /// Signal cancellation and join every worker thread. Workers observe the
    /// signal at their next loop head.
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        for handle in self.workers {
            let _ = handle.join();
        }
        info!("mining coordinator stopped");
    }
}
