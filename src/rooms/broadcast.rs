use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::registry::ConnectionId;
use crate::websocket::ServerEvent;

/// Who an outbound event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// Every live connection, joined or not.
    All,
    /// Every connection in the transport group `room`.
    Room(String),
    /// The transport group `room` minus one connection.
    RoomExcept { room: String, except: ConnectionId },
    /// A single connection.
    Connection(ConnectionId),
}

/// Fan-out capability the router drives.
///
/// Implementations own the transport-level group membership that room
/// recipients resolve against. Delivery is best-effort: a failure towards one
/// recipient must not stop delivery to the rest.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn join_group(&self, id: ConnectionId, room: &str);

    async fn leave_group(&self, id: ConnectionId, room: &str);

    /// Returns how many connections the event was handed to.
    async fn send(&self, to: Recipients, event: &ServerEvent) -> usize;
}
