//! Event relay: fan-out of draw/cursor/clear events to room peers.

use serde_json::Value;
use tracing::debug;

use chalkline_core::protocol::ServerFrame;

use crate::registry::RoomRegistry;

/// An inbound event ready for routing. Draw and cursor payloads are opaque;
/// the relay forwards them unmodified.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    Draw(Value),
    Cursor(Value),
    Clear,
}

/// Deliver `event` to every connection currently in `room_id` except the
/// sender. Best-effort and at-most-once: an unknown room, an empty room, or
/// a sender that already disconnected all degrade to a silent no-op, and a
/// recipient whose queue has closed simply misses the event.
///
/// Per-sender ordering holds because each connection routes its events
/// sequentially from its own read loop, and pushes into a recipient's queue
/// preserve that order. Cursor events go through per-sender supersession
/// slots instead of the FIFO.
pub async fn route(registry: &RoomRegistry, room_id: &str, sender_id: &str, event: RelayEvent) {
    let Some(room) = registry.get(room_id).await else {
        debug!(room_id, sender = sender_id, "Event for unknown room dropped");
        return;
    };

    let frame = match event {
        RelayEvent::Draw(stroke) => ServerFrame::Draw {
            sender: sender_id.to_string(),
            stroke,
        },
        RelayEvent::Cursor(cursor) => ServerFrame::Cursor {
            sender: sender_id.to_string(),
            cursor,
        },
        RelayEvent::Clear => ServerFrame::Clear,
    };
    let is_cursor = matches!(frame, ServerFrame::Cursor { .. });

    let msg = match serde_json::to_string(&frame) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(%e, "Failed to serialize relay frame");
            return;
        }
    };

    let members = room.members().await;
    let mut sent = 0;
    for (client_id, outbound) in &members {
        if client_id == sender_id {
            continue;
        }
        if is_cursor {
            outbound.push_cursor(sender_id, msg.clone()).await;
        } else {
            outbound.push_frame(msg.clone()).await;
        }
        sent += 1;
    }
    debug!(room_id, sender = sender_id, sent, "Relayed event");
}
