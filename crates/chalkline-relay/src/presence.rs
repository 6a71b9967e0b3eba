//! Presence tracking: full-roster broadcasts on every membership change.
//!
//! Rosters are recomputed from scratch and delivered as a complete
//! replacement list — incremental patches drift, snapshots cannot. Callers
//! invoke these while holding the room lock, which is what gives each room's
//! members a strictly ordered view of its membership changes.

use std::collections::HashMap;

use tracing::{debug, error};

use chalkline_core::protocol::{RosterEntry, ServerFrame};
use chalkline_core::types::ClientId;

use crate::room::Member;

/// Compute the full roster, ordered by join time (ties broken by client id
/// so the order is stable).
pub fn roster_of(members: &HashMap<ClientId, Member>) -> Vec<RosterEntry> {
    let mut ordered: Vec<&Member> = members.values().collect();
    ordered.sort_by(|a, b| {
        a.joined_at
            .cmp(&b.joined_at)
            .then_with(|| a.client_id.cmp(&b.client_id))
    });
    ordered.into_iter().map(Member::roster_entry).collect()
}

/// Broadcast the current roster to every member of the room, including the
/// one whose join or leave triggered it.
pub async fn broadcast_roster(room_id: &str, members: &HashMap<ClientId, Member>) {
    let frame = ServerFrame::Roster {
        room_id: room_id.to_string(),
        participants: roster_of(members),
    };
    broadcast_frame(members, &frame).await;
    debug!(room_id, count = members.len(), "Broadcast roster");
}

/// Serialize a frame once and push it to every member's outbound queue.
/// Pushes never block; a closed queue just drops the frame.
pub async fn broadcast_frame(members: &HashMap<ClientId, Member>, frame: &ServerFrame) {
    let msg = match serde_json::to_string(frame) {
        Ok(m) => m,
        Err(e) => {
            error!(%e, "Failed to serialize frame");
            return;
        }
    };

    for member in members.values() {
        member.outbound.push_frame(msg.clone()).await;
    }
}
