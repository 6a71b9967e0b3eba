//! Per-connection session lifecycle.
//!
//! Each connection moves through `Connecting -> Joined -> Closed`, with
//! `Closed` terminal — a participant that comes back gets a brand-new
//! connection and session. Events that arrive in the wrong phase or for the
//! wrong room are caller errors: dropped, never fatal.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use chalkline_core::protocol::ClientFrame;
use chalkline_core::types::{ClientId, RoomId, normalize_label};

use crate::events::{self, RelayEvent};
use crate::outbound::Outbound;
use crate::room::{AddOutcome, LeaveOutcome, Room};
use crate::state::RelayState;

pub enum ConnectionPhase {
    /// Socket open, identity not yet declared.
    Connecting,
    Joined(JoinedSession),
    Closed,
}

pub struct JoinedSession {
    pub room: Arc<Room>,
    pub room_id: RoomId,
    pub client_id: ClientId,
}

/// Lifecycle controller for one connection.
pub struct Session {
    state: Arc<RelayState>,
    conn_id: Uuid,
    outbound: Arc<Outbound>,
    phase: ConnectionPhase,
}

impl Session {
    pub fn new(state: Arc<RelayState>, conn_id: Uuid, outbound: Arc<Outbound>) -> Self {
        Self {
            state,
            conn_id,
            outbound,
            phase: ConnectionPhase::Connecting,
        }
    }

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn is_joined(&self) -> bool {
        matches!(self.phase, ConnectionPhase::Joined(_))
    }

    /// Dispatch one inbound frame according to the current phase.
    pub async fn handle_frame(&mut self, frame: ClientFrame) {
        match frame {
            ClientFrame::Join {
                room_id,
                client_id,
                label,
            } => self.handle_join(room_id, client_id, label).await,
            ClientFrame::Draw { room_id, stroke } => {
                self.relay(room_id, RelayEvent::Draw(stroke)).await;
            }
            ClientFrame::Cursor { room_id, cursor } => {
                self.relay(room_id, RelayEvent::Cursor(cursor)).await;
            }
            ClientFrame::Clear { room_id } => {
                self.relay(room_id, RelayEvent::Clear).await;
            }
        }
    }

    async fn handle_join(&mut self, room_id: RoomId, client_id: ClientId, label: String) {
        match self.phase {
            ConnectionPhase::Connecting => {}
            ConnectionPhase::Joined(_) => {
                debug!(conn_id = %self.conn_id, "Duplicate join frame dropped");
                return;
            }
            ConnectionPhase::Closed => return,
        }

        let label = normalize_label(&label);
        if !self.state.gate.allow(&room_id, &label).await {
            warn!(conn_id = %self.conn_id, %room_id, "Join rejected by gate");
            return;
        }

        // A room evicted between lookup and join surfaces as a retired
        // instance; re-resolve until the join lands.
        loop {
            let room = self.state.registry.get_or_create(&room_id).await;
            let member = crate::room::Member::new(
                self.conn_id,
                client_id.clone(),
                label.clone(),
                self.outbound.clone(),
            );
            match room.join(member).await {
                Some(outcome) => {
                    if outcome == AddOutcome::Superseded {
                        info!(%room_id, %client_id, "Superseded prior connection");
                    }
                    info!(conn_id = %self.conn_id, %room_id, %client_id, "Joined room");
                    self.phase = ConnectionPhase::Joined(JoinedSession {
                        room,
                        room_id,
                        client_id,
                    });
                    return;
                }
                None => continue,
            }
        }
    }

    async fn relay(&mut self, room_id: RoomId, event: RelayEvent) {
        let ConnectionPhase::Joined(joined) = &self.phase else {
            debug!(conn_id = %self.conn_id, "Event before join dropped");
            return;
        };
        if joined.room_id != room_id {
            debug!(
                conn_id = %self.conn_id,
                joined = %joined.room_id,
                claimed = %room_id,
                "Event for foreign room dropped"
            );
            return;
        }
        events::route(&self.state.registry, &joined.room_id, &joined.client_id, event).await;
    }

    /// Transition to `Closed`. Safe to call at any time and any number of
    /// times, including when this connection was superseded by a rejoin.
    pub async fn close(&mut self) {
        let phase = std::mem::replace(&mut self.phase, ConnectionPhase::Closed);
        let ConnectionPhase::Joined(joined) = phase else {
            return;
        };

        match joined.room.leave(&joined.client_id, self.conn_id).await {
            LeaveOutcome::Removed { now_empty } => {
                if now_empty {
                    self.state.registry.remove_if_empty(&joined.room_id).await;
                }
                info!(
                    conn_id = %self.conn_id,
                    room_id = %joined.room_id,
                    client_id = %joined.client_id,
                    "Left room"
                );
            }
            LeaveOutcome::Stale => {
                debug!(conn_id = %self.conn_id, "Close after supersession; membership untouched");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DenyAll;
    use chalkline_core::config::Config;
    use serde_json::json;

    fn session(state: &Arc<RelayState>) -> (Session, Arc<Outbound>) {
        let outbound = Arc::new(Outbound::new());
        (
            Session::new(state.clone(), Uuid::new_v4(), outbound.clone()),
            outbound,
        )
    }

    fn join_frame(room: &str, client: &str, label: &str) -> ClientFrame {
        ClientFrame::Join {
            room_id: room.into(),
            client_id: client.into(),
            label: label.into(),
        }
    }

    #[tokio::test]
    async fn test_join_transitions_and_broadcasts_roster() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut a, a_out) = session(&state);

        a.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;

        assert!(a.is_joined());
        let roster: serde_json::Value =
            serde_json::from_str(&a_out.try_next().await.expect("own roster")).unwrap();
        assert_eq!(roster["type"], "roster");
        assert_eq!(roster["participants"][0]["label"], "ada@example.com");
    }

    #[tokio::test]
    async fn test_empty_label_becomes_anonymous() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut a, a_out) = session(&state);

        a.handle_frame(join_frame("proj-1", "c-a", "")).await;

        let roster: serde_json::Value =
            serde_json::from_str(&a_out.try_next().await.unwrap()).unwrap();
        assert_eq!(roster["participants"][0]["label"], "anonymous");
    }

    #[tokio::test]
    async fn test_events_before_join_are_dropped() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut bystander, by_out) = session(&state);
        bystander
            .handle_frame(join_frame("proj-1", "c-b", "bob@example.com"))
            .await;
        while by_out.try_next().await.is_some() {}

        let (mut stranger, _) = session(&state);
        stranger
            .handle_frame(ClientFrame::Draw {
                room_id: "proj-1".into(),
                stroke: json!({"points": [1, 2]}),
            })
            .await;

        assert!(!stranger.is_joined());
        assert_eq!(by_out.try_next().await, None, "pre-join event must not relay");
    }

    #[tokio::test]
    async fn test_event_for_foreign_room_dropped() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut a, _) = session(&state);
        a.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;

        let (mut b, b_out) = session(&state);
        b.handle_frame(join_frame("proj-2", "c-b", "bob@example.com"))
            .await;
        while b_out.try_next().await.is_some() {}

        // A is joined to proj-1 but claims proj-2; nothing may reach B.
        a.handle_frame(ClientFrame::Clear {
            room_id: "proj-2".into(),
        })
        .await;
        assert_eq!(b_out.try_next().await, None);
    }

    #[tokio::test]
    async fn test_close_leaves_room_and_evicts_empty() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut a, _) = session(&state);
        a.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;
        assert!(state.registry.contains("proj-1").await);

        a.close().await;
        assert!(
            !state.registry.contains("proj-1").await,
            "empty room must not linger"
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut a, _) = session(&state);
        a.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;

        a.close().await;
        a.close().await;
        assert!(matches!(a.phase(), ConnectionPhase::Closed));
    }

    #[tokio::test]
    async fn test_remaining_member_sees_departure() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut a, a_out) = session(&state);
        let (mut b, _) = session(&state);
        a.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;
        b.handle_frame(join_frame("proj-1", "c-b", "bob@example.com"))
            .await;
        while a_out.try_next().await.is_some() {}

        b.close().await;

        let left: serde_json::Value =
            serde_json::from_str(&a_out.try_next().await.expect("peer_left")).unwrap();
        assert_eq!(left["type"], "peer_left");
        assert_eq!(left["client_id"], "c-b");
        let roster: serde_json::Value =
            serde_json::from_str(&a_out.try_next().await.expect("roster")).unwrap();
        assert_eq!(roster["participants"].as_array().unwrap().len(), 1);
        assert_eq!(roster["participants"][0]["client_id"], "c-a");
        assert!(state.registry.contains("proj-1").await);
    }

    #[tokio::test]
    async fn test_rejoin_supersedes_and_old_close_is_harmless() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut old, old_out) = session(&state);
        old.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;

        let (mut new, _) = session(&state);
        new.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;

        assert!(old_out.is_closed().await, "superseded outbound must close");

        // The stale connection's close must not disturb the replacement.
        old.close().await;
        let room = state.registry.get("proj-1").await.expect("room alive");
        assert_eq!(room.member_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_join_frame_ignored() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut a, a_out) = session(&state);
        a.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;
        while a_out.try_next().await.is_some() {}

        a.handle_frame(join_frame("proj-2", "c-a", "ada@example.com"))
            .await;

        // Still in proj-1; no new room created, no roster churn.
        assert!(!state.registry.contains("proj-2").await);
        assert_eq!(a_out.try_next().await, None);
    }

    #[tokio::test]
    async fn test_gate_denial_keeps_connection_in_connecting() {
        let state = Arc::new(RelayState::new(
            Arc::new(Config::default()),
            Arc::new(DenyAll),
        ));
        let (mut a, a_out) = session(&state);

        a.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;

        assert!(!a.is_joined());
        assert!(!state.registry.contains("proj-1").await);
        assert_eq!(a_out.try_next().await, None);
    }

    #[tokio::test]
    async fn test_draw_fanout_between_sessions() {
        let state = Arc::new(RelayState::with_defaults());
        let (mut a, a_out) = session(&state);
        let (mut b, b_out) = session(&state);
        a.handle_frame(join_frame("proj-1", "c-a", "ada@example.com"))
            .await;
        b.handle_frame(join_frame("proj-1", "c-b", "bob@example.com"))
            .await;
        while a_out.try_next().await.is_some() {}
        while b_out.try_next().await.is_some() {}

        let stroke = json!({"points": [0, 0, 5, 5], "color": "#222", "width": 3, "tool": "pen"});
        a.handle_frame(ClientFrame::Draw {
            room_id: "proj-1".into(),
            stroke: stroke.clone(),
        })
        .await;

        let v: serde_json::Value =
            serde_json::from_str(&b_out.try_next().await.expect("draw")).unwrap();
        assert_eq!(v["type"], "draw");
        assert_eq!(v["sender"], "c-a");
        assert_eq!(v["stroke"], stroke);
        assert_eq!(b_out.try_next().await, None);
        assert_eq!(a_out.try_next().await, None, "sender receives zero copies");
    }
}
