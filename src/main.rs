//! forgechain node
//!
//! Proof-of-work blockchain node: mines locally, gossips with peers, and
//! serves the RPC surface.

use clap::Parser;
use forgechain::config::{Args, Config};
use forgechain::core::{BlockHasher, Sha256Hasher};
use forgechain::difficulty::DifficultyController;
use forgechain::error::Result;
use forgechain::net::registry::PeerRegistry;
use forgechain::net::server::{self, ServerState};
use forgechain::net::types::NodeId;
use forgechain::node::Node;
use forgechain::storage;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.log_level);

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: Config) -> Result<()> {
    info!("starting forgechain v{}", forgechain::VERSION);
    info!("your public key is: {}", config.pubkey);

    let hasher: Arc<dyn BlockHasher> = Arc::new(Sha256Hasher);

    // Local truth first: a persisted chain must be valid or we refuse to run
    let mut chain = storage::load_or_init(&config.files_prefix, &*hasher)?;
    let mut controller =
        DifficultyController::new(1.0, config.target_dur, config.recalc_period);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Initial peer discovery, then adopt the best network state on offer
    let registry = Arc::new(PeerRegistry::new(&config));
    registry.discover().await;

    if let Some(state) = registry.bootstrap_state().await {
        if state.chain.len() > chain.len() && state.chain.is_valid(&*hasher) {
            info!(
                blocks = state.chain.len(),
                difficulty = state.difficulty,
                "adopting chain from the network"
            );
            chain = state.chain;
            controller.set_difficulty(state.difficulty);
        }
    }

    let (node, handle, solves) = Node::new(
        &config,
        Arc::clone(&hasher),
        chain,
        controller,
        Arc::clone(&registry),
        shutdown_rx.clone(),
    )?;

    let node_task = tokio::spawn(node.run(solves));

    let discovery_task = tokio::spawn(
        Arc::clone(&registry).run_discovery(shutdown_rx.clone()),
    );

    let server_state = ServerState {
        node: handle,
        registry,
        node_id: NodeId::new(&config.pubkey, config.pool_id),
    };
    let server_task = tokio::spawn(server::serve(
        server_state,
        config.bind_addr,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    info!("signal received, shutting down");
    let _ = shutdown_tx.send(true);

    if let Err(e) = node_task.await {
        warn!("node loop ended abnormally: {}", e);
    }
    let _ = discovery_task.await;
    match server_task.await {
        Ok(Err(e)) => warn!("RPC server: {}", e),
        Err(e) => warn!("RPC server task: {}", e),
        Ok(Ok(())) => {}
    }

    Ok(())
}
