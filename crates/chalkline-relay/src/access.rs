//! Authorization seam for project-scoped rooms.
//!
//! Ownership and invitation checks live outside the relay (the web tier
//! authorizes a participant before handing out the room id). Deployments
//! that want a second check at the socket layer plug one in here.

use async_trait::async_trait;

/// Decides whether a join request may enter a room. A denied join is dropped
/// silently; the connection stays open and may try another room.
#[async_trait]
pub trait JoinGate: Send + Sync {
    async fn allow(&self, room_id: &str, label: &str) -> bool;
}

/// Default gate: every join is allowed (the public canvas behavior).
pub struct AllowAll;

#[async_trait]
impl JoinGate for AllowAll {
    async fn allow(&self, _room_id: &str, _label: &str) -> bool {
        true
    }
}

#[cfg(test)]
pub(crate) struct DenyAll;

#[cfg(test)]
#[async_trait]
impl JoinGate for DenyAll {
    async fn allow(&self, _room_id: &str, _label: &str) -> bool {
        false
    }
}
