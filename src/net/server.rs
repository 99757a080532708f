//! Inbound RPC surface
//!
//! Five JSON-over-HTTP operations. Handlers do wire-level normalization
//! only; every consensus decision is forwarded to the node event loop.

use crate::core::hasher;
use crate::error::Result;
use crate::net::registry::PeerRegistry;
use crate::net::types::{
    CreditRequest, CreditResponse, DiscoverRequest, DiscoverResponse, NodeId, ShareChainRequest,
    ShareChainResponse, ShareTxRequest, ShareTxResponse, StateResponse,
};
use crate::node::NodeHandle;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared state for the RPC handlers
#[derive(Clone)]
pub struct ServerState {
    pub node: NodeHandle,
    pub registry: Arc<PeerRegistry>,
    pub node_id: NodeId,
}

/// Build the RPC router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/discover", post(discover))
        .route("/state", get(get_state))
        .route("/chain", post(share_chain))
        .route("/tx", post(share_tx))
        .route("/credit", post(get_credit))
        .with_state(state)
}

/// Bind and serve until the shutdown signal flips
pub async fn serve(
    state: ServerState,
    bind_addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("RPC server listening on {}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    Ok(())
}

/// Peer handshake: absorb the caller's addresses (and the caller itself),
/// answer with ours
async fn discover(
    State(state): State<ServerState>,
    Json(req): Json<DiscoverRequest>,
) -> Json<DiscoverResponse> {
    let mut addrs = req.known_addrs;
    addrs.push(req.return_addr.clone());
    state.registry.merge_addrs(addrs);

    Json(DiscoverResponse {
        ok: true,
        node_id: state.node_id.clone(),
        known_addrs: state.registry.known_addrs_except(&[req.return_addr.as_str()]),
    })
}

/// Bootstrap read of our chain and difficulty
async fn get_state(
    State(state): State<ServerState>,
) -> std::result::Result<Json<StateResponse>, StatusCode> {
    match state.node.state().await {
        Some(snapshot) => Ok(Json(StateResponse {
            chain: snapshot.chain,
            difficulty: snapshot.difficulty,
        })),
        None => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

/// A peer offers a chain; the node applies the longest-valid rule
async fn share_chain(
    State(state): State<ServerState>,
    Json(req): Json<ShareChainRequest>,
) -> Json<ShareChainResponse> {
    let accepted = state.node.share_chain(req.chain, req.node_id).await;
    Json(ShareChainResponse { accepted })
}

/// A peer or client offers a transaction
async fn share_tx(
    State(state): State<ServerState>,
    Json(req): Json<ShareTxRequest>,
) -> Json<ShareTxResponse> {
    let tx = req.tx.into_tx();
    let outcome = state.node.share_tx(tx, req.node_id).await;
    Json(ShareTxResponse {
        accepted: outcome.accepted,
        info: outcome.info,
    })
}

/// Committed credit of the pubkey derived from a secret key
async fn get_credit(
    State(state): State<ServerState>,
    Json(req): Json<CreditRequest>,
) -> std::result::Result<Json<CreditResponse>, (StatusCode, String)> {
    if req.key.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "missing `key` from request".into()));
    }

    let pubkey = hasher::pubkey_from_key(&req.key);
    let value = state.node.credit_of(pubkey).await;
    Ok(Json(CreditResponse { value }))
}
