//! WebSocket upgrade handler for the hosting peer

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::{AppState, LinkClaim};
use crate::ws::pump::run_link;
use crate::ws::transport::{ChannelTransport, LinkEvent};

/// WebSocket upgrade handler. Only one remote peer at a time.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(claim) = state.link.try_claim() else {
        warn!("Rejecting connection, a peer is already linked");
        return (StatusCode::CONFLICT, "Peer already connected").into_response();
    };
    // The claim lives in the callback, so a failed upgrade drops it too
    ws.on_failed_upgrade(|e: axum::Error| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| handle_socket(socket, state, claim))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, _claim: LinkClaim) {
    info!("Peer connected");

    let inbound = state.link.inbound();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
    if inbound
        .send(LinkEvent::Open(Box::new(ChannelTransport::new(out_tx))))
        .is_err()
    {
        debug!("Frame loop gone before link opened");
        return;
    }

    let (ws_sink, ws_stream) = socket.split();
    run_link(ws_sink, ws_stream, out_rx, inbound).await;

    info!("Peer connection closed");
}
