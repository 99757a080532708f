//! Chain persistence
//!
//! Two files per prefix: `<prefix>.chain` is the authoritative bincode
//! serialization; `<prefix>.json` is a readable rendering for operator
//! inspection. The node refuses to start from a persisted chain that fails
//! validation.

use crate::core::{BlockHasher, Chain};
use crate::error::{Error, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Path of the binary chain file for a prefix
pub fn chain_path(files_prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}.chain", files_prefix))
}

/// Path of the readable chain rendering for a prefix
pub fn json_path(files_prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}.json", files_prefix))
}

/// Load the persisted chain, or synthesize genesis when no file exists.
///
/// A file that cannot be decoded or fails full validation is a fatal
/// storage error: the node will not run on a corrupted ledger.
pub fn load_or_init(files_prefix: &str, hasher: &dyn BlockHasher) -> Result<Chain> {
    let path = chain_path(files_prefix);

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(_) => {
            info!("initializing node with a new blockchain");
            return Ok(Chain::genesis(hasher));
        }
    };

    let chain: Chain = bincode::deserialize(&bytes)
        .map_err(|e| Error::storage(format!("could not decode {}: {}", path.display(), e)))?;

    if !chain.is_valid(hasher) {
        return Err(Error::storage(format!(
            "broken chain in storage file {}",
            path.display()
        )));
    }

    info!(blocks = chain.len(), "initializing node with blockchain from storage");
    Ok(chain)
}

/// Persist the chain: binary form first, then the JSON rendering
pub fn store(chain: &Chain, files_prefix: &str) -> Result<()> {
    let bytes = bincode::serialize(chain)?;
    fs::write(chain_path(files_prefix), bytes)?;

    let json = serde_json::to_vec_pretty(chain)?;
    fs::write(json_path(files_prefix), json)?;

    Ok(())
}
