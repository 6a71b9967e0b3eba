//! Room membership.
//!
//! A room is the set of live connections collaborating on one canvas, keyed
//! by client id. All membership mutation happens under the room's own lock,
//! which also serializes the roster broadcasts those mutations trigger —
//! no member can observe rosters out of order with the changes that caused
//! them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use chalkline_core::protocol::{RosterEntry, ServerFrame};
use chalkline_core::types::{ClientId, RoomId};

use crate::outbound::Outbound;
use crate::presence;

/// One live member of a room.
#[derive(Clone)]
pub struct Member {
    /// Server-assigned connection id. Distinguishes two connections that
    /// claim the same client id, so a superseded connection's cleanup cannot
    /// evict its replacement.
    pub conn_id: Uuid,
    pub client_id: ClientId,
    pub label: String,
    pub outbound: Arc<Outbound>,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(conn_id: Uuid, client_id: ClientId, label: String, outbound: Arc<Outbound>) -> Self {
        Self {
            conn_id,
            client_id,
            label,
            outbound,
            joined_at: Utc::now(),
        }
    }

    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            client_id: self.client_id.clone(),
            label: self.label.clone(),
        }
    }
}

/// Result of adding a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Fresh client id for this room.
    Joined,
    /// Same client id was already present: treated as a reconnection, the
    /// prior connection's outbound queue is closed.
    Superseded,
}

/// Result of removing a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Removed { now_empty: bool },
    /// Client id absent, or present under a different connection (this
    /// connection was superseded earlier). Nothing changed.
    Stale,
}

pub struct Room {
    id: RoomId,
    inner: Mutex<RoomInner>,
}

#[derive(Default)]
struct RoomInner {
    members: HashMap<ClientId, Member>,
    /// Set by the registry while unlinking an empty room. A join that raced
    /// and still holds this instance must retry through the registry.
    retired: bool,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            inner: Mutex::new(RoomInner::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a member and broadcast the updated roster to everyone, including
    /// the newcomer. Returns `None` if this room instance was already
    /// retired by the registry — the caller must re-resolve the room.
    pub async fn join(&self, member: Member) -> Option<AddOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.retired {
            return None;
        }

        let client_id = member.client_id.clone();
        let outcome = match inner.members.insert(client_id, member) {
            Some(old) => {
                old.outbound.close().await;
                AddOutcome::Superseded
            }
            None => AddOutcome::Joined,
        };

        presence::broadcast_roster(&self.id, &inner.members).await;
        Some(outcome)
    }

    /// Remove the member for `client_id`, provided it still belongs to the
    /// connection identified by `conn_id`. Remaining members get a
    /// `peer_left` notice followed by the updated roster.
    pub async fn leave(&self, client_id: &str, conn_id: Uuid) -> LeaveOutcome {
        let mut inner = self.inner.lock().await;

        let owned = inner
            .members
            .get(client_id)
            .is_some_and(|m| m.conn_id == conn_id);
        if !owned {
            return LeaveOutcome::Stale;
        }

        if let Some(member) = inner.members.remove(client_id) {
            member.outbound.close().await;
        }

        let now_empty = inner.members.is_empty();
        if !now_empty {
            let left = ServerFrame::PeerLeft {
                client_id: client_id.to_string(),
            };
            presence::broadcast_frame(&inner.members, &left).await;
            presence::broadcast_roster(&self.id, &inner.members).await;
        }

        LeaveOutcome::Removed { now_empty }
    }

    /// Point-in-time membership snapshot for routing. Safe to iterate while
    /// concurrent joins/leaves proceed.
    pub async fn members(&self) -> Vec<(ClientId, Arc<Outbound>)> {
        let inner = self.inner.lock().await;
        inner
            .members
            .values()
            .map(|m| (m.client_id.clone(), m.outbound.clone()))
            .collect()
    }

    /// Current roster, ordered by join time.
    pub async fn roster(&self) -> Vec<RosterEntry> {
        let inner = self.inner.lock().await;
        presence::roster_of(&inner.members)
    }

    pub async fn member_count(&self) -> usize {
        self.inner.lock().await.members.len()
    }

    /// Mark the room retired if it has no members. Called by the registry
    /// under its own write lock right before unlinking the room.
    pub(crate) async fn retire_if_empty(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.members.is_empty() {
            inner.retired = true;
            true
        } else {
            false
        }
    }
}
