//! Process-wide room registry.
//!
//! Rooms are created lazily on first join and unlinked the moment they
//! empty. The registry is an injectable service object, never a global —
//! every test gets its own instance.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use chalkline_core::types::RoomId;

use crate::room::Room;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Room>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the room for `room_id`, creating it if absent. Atomic with
    /// respect to concurrent callers for the same id: while any connection
    /// of a room is live there is exactly one `Room` instance for it.
    pub async fn get_or_create(&self, room_id: &str) -> Arc<Room> {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(room_id) {
                return room.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                debug!(room_id, "Room created");
                Arc::new(Room::new(room_id.to_string()))
            })
            .clone()
    }

    pub async fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Unlink the room if it has no members. The room is retired under its
    /// own lock while the registry write lock is held, so a join racing with
    /// the eviction either lands before the emptiness check or observes the
    /// retired instance and retries through `get_or_create`.
    pub async fn remove_if_empty(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(room_id) {
            if room.retire_if_empty().await {
                rooms.remove(room_id);
                info!(room_id, "Room closed");
            }
        }
    }

    pub async fn contains(&self, room_id: &str) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
