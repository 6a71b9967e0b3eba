//! Chalkline session relay.
//!
//! Groups WebSocket connections into rooms (one per canvas), keeps a live
//! presence roster per room, and fans drawing/cursor/clear events out to the
//! other members. Delivery is best-effort: no replay, no acknowledgement,
//! per-sender ordering only.

pub mod access;
pub mod connection;
pub mod events;
pub mod lifecycle;
pub mod outbound;
pub mod presence;
pub mod registry;
pub mod room;
pub mod server;
pub mod state;

pub use server::start_relay;
pub use state::RelayState;
