//! Mining engine
//!
//! One `MinerWorker` per configured degree of parallelism runs a nonce
//! search on its own thread; the `MiningCoordinator` fans state updates out
//! to the workers and merges their solves into a single stream for the node.

mod coordinator;
mod worker;

pub use coordinator::MiningCoordinator;
pub use worker::MinerWorker;

use crate::core::{Block, Hash32, Target, Transaction};

/// A solved block, reported by the worker that found it
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub worker_id: usize,
    pub block: Block,
}

/// State pushed from the coordinator to a worker. Applied between loop
/// iterations, so workers never observe a half-updated tuple.
#[derive(Debug, Clone)]
pub enum WorkerUpdate {
    /// New chain tip; also resets the worker's nonce
    PrevHash(Hash32),
    /// New mining target
    Target(Target),
    /// New transaction snapshot
    Txs(Vec<Transaction>),
}
