//! Configuration management
//!
//! Command-line arguments are parsed with clap and validated into a
//! `Config`. The miner secret comes exclusively from the `BLOCKCHAIN_KEY`
//! environment variable; the node's pubkey is its SHA-256 hex.

use crate::core::hasher::pubkey_from_key;
use crate::error::{Error, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the miner secret key
pub const KEY_ENV_VAR: &str = "BLOCKCHAIN_KEY";

/// How aggressively mining workers hash, as a CPU-usage hint.
/// Lower speeds sleep between nonce attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashSpeed {
    Low,
    Medium,
    High,
    Ultra,
}

impl HashSpeed {
    /// Pause applied between loop iterations, if any
    pub fn throttle(&self) -> Option<Duration> {
        match self {
            HashSpeed::Low => Some(Duration::from_millis(100)),
            HashSpeed::Medium => Some(Duration::from_millis(10)),
            HashSpeed::High => Some(Duration::from_millis(1)),
            HashSpeed::Ultra => None,
        }
    }
}

impl FromStr for HashSpeed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(HashSpeed::Low),
            "medium" => Ok(HashSpeed::Medium),
            "high" => Ok(HashSpeed::High),
            "ultra" => Ok(HashSpeed::Ultra),
            other => Err(Error::config(format!(
                "invalid speed {:?}, expected one of low/medium/high/ultra",
                other
            ))),
        }
    }
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(name = "forgechain", about = "Proof-of-work blockchain node", version)]
pub struct Args {
    /// ID for a node within a single miner's pool (nodes with the same pubkey)
    #[clap(long = "poolid", default_value_t = 0)]
    pub pool_id: i32,

    /// Local address to bind/listen on
    #[clap(long = "bindAddr", default_value = "0.0.0.0:20403")]
    pub bind_addr: String,

    /// External address (host:port) for peers to return connections
    #[clap(long = "returnAddr")]
    pub return_addr: Option<String>,

    /// Comma-separated list of host:port seed addresses for peer discovery
    #[clap(long = "seeds", default_value = "")]
    pub seeds: String,

    /// Minimum number of peers to aim for; fewer triggers a discovery event
    #[clap(long = "minpeers", default_value_t = 25)]
    pub min_peers: usize,

    /// Maximum number of peers to hold sessions with
    #[clap(long = "maxpeers", default_value_t = 50)]
    pub max_peers: usize,

    /// Desired time between block solves; controls mining difficulty
    #[clap(long = "targetdur", default_value = "10s", value_parser = humantime::parse_duration)]
    pub target_dur: Duration,

    /// Number of blocks to solve before recalculating the difficulty
    #[clap(long = "recalc", default_value_t = 10)]
    pub recalc_period: usize,

    /// Hashing speed / CPU usage: one of low/medium/high/ultra
    #[clap(long = "speed", default_value = "medium")]
    pub speed: String,

    /// Number of concurrent mining workers
    #[clap(long = "miners", default_value_t = 1)]
    pub num_miners: usize,

    /// Common prefix for all output files
    #[clap(long = "filesprefix", default_value = "run")]
    pub files_prefix: String,

    /// Level at which log messages are written to the console
    #[clap(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Deadline for individual peer RPC calls
    #[clap(long = "peerdeadline", default_value = "5s", value_parser = humantime::parse_duration)]
    pub peer_deadline: Duration,
}

/// Validated node configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub pool_id: i32,
    pub bind_addr: SocketAddr,
    pub return_addr: String,
    pub seed_addrs: Vec<String>,
    pub min_peers: usize,
    pub max_peers: usize,
    pub target_dur: Duration,
    pub recalc_period: usize,
    pub speed: HashSpeed,
    pub num_miners: usize,
    pub files_prefix: String,
    pub log_level: String,
    pub peer_deadline: Duration,
    /// SHA-256 hex of the miner secret
    pub pubkey: String,
}

impl Config {
    /// Validate arguments and the environment into a runnable configuration
    pub fn from_args(args: Args) -> Result<Self> {
        let key = std::env::var(KEY_ENV_VAR)
            .map_err(|_| Error::config(format!("please set the {} env variable", KEY_ENV_VAR)))?;
        if key.is_empty() {
            return Err(Error::config(format!("{} must not be empty", KEY_ENV_VAR)));
        }

        let bind_addr: SocketAddr = args
            .bind_addr
            .parse()
            .map_err(|_| Error::config(format!("invalid bindAddr: {}", args.bind_addr)))?;

        let return_addr = args.return_addr.ok_or_else(|| {
            Error::config("please include returnAddr (external host:port) for peers to connect back")
        })?;
        validate_host_port(&return_addr)?;

        let speed: HashSpeed = args.speed.parse()?;

        if args.recalc_period == 0 {
            return Err(Error::config("recalc period must be at least 1"));
        }
        if args.num_miners == 0 {
            return Err(Error::config("at least one miner is required"));
        }

        let seed_addrs = args
            .seeds
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            pool_id: args.pool_id,
            bind_addr,
            return_addr,
            seed_addrs,
            min_peers: args.min_peers,
            max_peers: args.max_peers,
            target_dur: args.target_dur,
            recalc_period: args.recalc_period,
            speed,
            num_miners: args.num_miners,
            files_prefix: args.files_prefix,
            log_level: args.log_level,
            peer_deadline: args.peer_deadline,
            pubkey: pubkey_from_key(&key),
        })
    }
}

/// Check that an address is a plausible host:port pair. Hostnames are
/// allowed, so this is looser than a `SocketAddr` parse.
fn validate_host_port(addr: &str) -> Result<()> {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(Error::config(format!(
            "invalid returnAddr {:?}, expected host:port",
            addr
        ))),
    }
}
