//! Room module for the chat server
//!
//! Session bookkeeping and the event protocol that routes joins, leaves,
//! messages and typing activity to the right connections.

mod broadcast;
mod registry;
mod router;

#[cfg(test)]
pub use broadcast::MockBroadcaster;
pub use broadcast::{Broadcaster, Recipients};
pub use registry::{ConnectionId, Session, SessionRegistry};
pub use router::RoomRouter;
