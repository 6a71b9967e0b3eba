//! WebSocket connection handling — accept, greeting, read/write loops.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chalkline_core::protocol::{ClientFrame, ServerFrame};

use crate::lifecycle::Session;
use crate::outbound::Outbound;
use crate::state::RelayState;

/// Drive one WebSocket connection from accept to close.
pub async fn handle_ws_connection(state: Arc<RelayState>, ws: WebSocket) {
    let conn_id = Uuid::new_v4();
    state.connection_opened();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_tx, mut ws_rx) = ws.split();
    let outbound = Arc::new(Outbound::new());

    let hello = ServerFrame::Hello {
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        conn_id: conn_id.to_string(),
    };
    if let Ok(msg) = serde_json::to_string(&hello) {
        outbound.push_frame(msg).await;
    }

    // Writer: drain this connection's queue into the socket. Ends when the
    // queue closes (disconnect or supersession) or the socket rejects a send.
    let writer_queue = outbound.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = writer_queue.next().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                return;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    let mut session = Session::new(state.clone(), conn_id, outbound.clone());

    let read_loop = async {
        while let Some(msg_result) = ws_rx.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => session.handle_frame(frame).await,
                    Err(e) => {
                        // Malformed input is never fatal; skip it.
                        warn!(conn_id = %conn_id, %e, "Unparseable frame dropped");
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!(conn_id = %conn_id, "Client requested close");
                    break;
                }
                Ok(_) => {
                    // Binary frames are not part of the protocol; axum
                    // answers pings itself.
                }
                Err(e) => {
                    debug!(conn_id = %conn_id, %e, "WebSocket error");
                    break;
                }
            }
        }
    };

    // Either the peer goes away (read loop ends) or this connection was
    // superseded and its queue closed (writer ends).
    tokio::select! {
        _ = &mut send_task => {}
        _ = read_loop => {}
    }

    session.close().await;
    outbound.close().await;
    send_task.abort();
    state.connection_closed();
    info!(conn_id = %conn_id, "WebSocket connection closed");
}
