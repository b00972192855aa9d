use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

use crate::error::WebSocketError;
use crate::rooms::{Broadcaster, ConnectionId, Recipients};
use crate::websocket::ServerEvent;

#[derive(Debug, Default)]
struct PoolState {
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<String>>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

impl PoolState {
    fn resolve(&self, to: &Recipients) -> Vec<ConnectionId> {
        match to {
            Recipients::All => self.connections.keys().copied().collect(),
            Recipients::Room(room) => self
                .groups
                .get(room)
                .map(|members| members.iter().copied().collect())
                .unwrap_or_default(),
            Recipients::RoomExcept { room, except } => self
                .groups
                .get(room)
                .map(|members| members.iter().copied().filter(|id| id != except).collect())
                .unwrap_or_default(),
            Recipients::Connection(id) => vec![*id],
        }
    }

    fn deliver(&self, id: &ConnectionId, text: &str) -> Result<(), WebSocketError> {
        let sender = self
            .connections
            .get(id)
            .ok_or_else(|| WebSocketError::ConnectionError(format!("Connection {} not found", id)))?;
        sender
            .send(text.to_string())
            .map_err(|e| WebSocketError::SendError(e.to_string()))
    }
}

/// Outbound channels of every live websocket plus the named groups they sit in.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    state: RwLock<PoolState>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, id: ConnectionId, sender: mpsc::UnboundedSender<String>) {
        self.state.write().await.connections.insert(id, sender);
        info!("Added connection {} to pool", id);
    }

    /// Drops the connection and every group membership it held.
    pub async fn remove(&self, id: &ConnectionId) -> bool {
        let mut state = self.state.write().await;
        let removed = state.connections.remove(id).is_some();
        state.groups.retain(|_, members| {
            members.remove(id);
            !members.is_empty()
        });
        if removed {
            info!("Removed connection {} from pool", id);
        }
        removed
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    pub async fn group_members(&self, room: &str) -> Vec<ConnectionId> {
        self.state.read().await.resolve(&Recipients::Room(room.to_string()))
    }
}

#[async_trait]
impl Broadcaster for ConnectionPool {
    async fn join_group(&self, id: ConnectionId, room: &str) {
        self.state
            .write()
            .await
            .groups
            .entry(room.to_string())
            .or_default()
            .insert(id);
        debug!("Connection {} joined group {}", id, room);
    }

    async fn leave_group(&self, id: ConnectionId, room: &str) {
        let mut state = self.state.write().await;
        if let Some(members) = state.groups.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                state.groups.remove(room);
            }
        }
        debug!("Connection {} left group {}", id, room);
    }

    async fn send(&self, to: Recipients, event: &ServerEvent) -> usize {
        let text = match event.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("Dropping event for {:?}: {}", to, e);
                return 0;
            }
        };

        let state = self.state.read().await;
        let mut delivered = 0;
        for id in state.resolve(&to) {
            match state.deliver(&id, &text) {
                Ok(()) => delivered += 1,
                Err(e) => error!("Failed to send to connection {}: {}", id, e),
            }
        }
        delivered
    }
}
