//! Chalkline wire protocol.
//!
//! All relay communication uses JSON-over-WebSocket with tagged frames:
//! [`ClientFrame`] inbound, [`ServerFrame`] outbound. Stroke and cursor
//! payloads are opaque JSON blobs — the relay routes them without ever
//! inspecting their contents.

use serde::{Deserialize, Serialize};

/// Frames sent by a participant to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Declare identity and enter a room. Must be the first frame; anything
    /// else sent before it is dropped.
    Join {
        room_id: String,
        client_id: String,
        #[serde(default)]
        label: String,
    },

    /// A completed stroke segment (point list, color, width, tool, label —
    /// opaque to the relay).
    Draw {
        room_id: String,
        stroke: serde_json::Value,
    },

    /// Cursor position update (position, color, label — opaque to the
    /// relay). Supersedes any earlier cursor from the same sender that a
    /// recipient has not yet drained.
    Cursor {
        room_id: String,
        cursor: serde_json::Value,
    },

    /// Wipe the whole canvas.
    Clear { room_id: String },
}

/// Frames sent by the relay to a participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Greeting sent once when the socket is accepted, before any join.
    Hello {
        server_version: String,
        conn_id: String,
    },

    /// Full replacement roster for the room. Sent to every member (including
    /// the one whose join/leave caused it) on each membership change.
    Roster {
        room_id: String,
        participants: Vec<RosterEntry>,
    },

    /// A peer's stroke, payload relayed unmodified.
    Draw {
        sender: String,
        stroke: serde_json::Value,
    },

    /// A peer's cursor position.
    Cursor {
        sender: String,
        cursor: serde_json::Value,
    },

    /// A peer wiped the canvas.
    Clear,

    /// A peer's connection closed. Lets clients drop its remote cursor
    /// without diffing rosters.
    PeerLeft { client_id: String },
}

/// One live participant in a room's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub client_id: String,
    pub label: String,
}
