use std::fmt::Write;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::broadcast::{Broadcaster, Recipients};
use super::registry::{ConnectionId, Session, SessionRegistry};
use crate::config::ChatConfig;
use crate::error::AppError;
use crate::websocket::{ChatMessage, ClientEvent, ServerEvent};

const FALLBACK_TIME_FORMAT: &str = "%H:%M:%S";

/// Drives the chat protocol for every connection.
///
/// Each handler holds the registry lock for its whole read-modify-broadcast
/// sequence, so other connections observe joins and disconnects as atomic.
/// Broadcasts only push onto connection channels and never block.
pub struct RoomRouter {
    registry: RwLock<SessionRegistry>,
    broadcaster: Arc<dyn Broadcaster>,
    chat: ChatConfig,
}

impl RoomRouter {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, chat: ChatConfig) -> Self {
        Self {
            registry: RwLock::new(SessionRegistry::new()),
            broadcaster,
            chat,
        }
    }

    /// Greets a freshly connected client. Nothing is registered until it joins.
    pub async fn connect(&self, id: ConnectionId) {
        let welcome = self.notice(&self.chat.welcome_message);
        self.broadcaster.send(Recipients::Connection(id), &welcome).await;
    }

    pub async fn dispatch(&self, id: ConnectionId, event: ClientEvent) -> crate::Result<()> {
        match event {
            ClientEvent::EnterRoom { name, room } => self.join_room(id, &name, &room).await,
            ClientEvent::Message { name, text } => {
                self.send_message(id, &name, &text).await;
                Ok(())
            }
            ClientEvent::Activity(name) => {
                self.activity(id, &name).await;
                Ok(())
            }
        }
    }

    /// Moves `id` into `room`, leaving its previous room first.
    ///
    /// Re-joining the current room is not collapsed: the old room still gets
    /// the leave notice and the full join sequence follows.
    pub async fn join_room(&self, id: ConnectionId, name: &str, room: &str) -> crate::Result<()> {
        if name.trim().is_empty() || room.trim().is_empty() {
            return Err(AppError::ValidationError(
                "enterRoom requires a non-empty name and room".to_string(),
            ));
        }

        let mut registry = self.registry.write().await;
        let previous = registry.get(&id).map(|session| session.room.clone());

        // The leaver must be out of the old group before the notice goes out.
        if let Some(old_room) = &previous {
            self.broadcaster.leave_group(id, old_room).await;
            self.broadcaster
                .send(
                    Recipients::Room(old_room.clone()),
                    &self.notice(&format!("{} left the room", name)),
                )
                .await;
        }

        let session = registry.upsert(id, name, room);

        if let Some(old_room) = &previous {
            self.broadcaster
                .send(Recipients::Room(old_room.clone()), &roster(&registry, old_room))
                .await;
        }

        self.broadcaster.join_group(id, &session.room).await;
        self.broadcaster
            .send(
                Recipients::Connection(id),
                &self.notice(&format!("You have joined the {} chat room", session.room)),
            )
            .await;
        self.broadcaster
            .send(
                Recipients::RoomExcept {
                    room: session.room.clone(),
                    except: id,
                },
                &self.notice(&format!("{} has joined the chat.", session.name)),
            )
            .await;
        self.broadcaster
            .send(Recipients::Room(session.room.clone()), &roster(&registry, &session.room))
            .await;
        self.broadcaster
            .send(Recipients::All, &room_list(&registry))
            .await;

        info!(
            "Connection {} joined room {} as {} (previous: {:?})",
            id, session.room, session.name, previous
        );
        Ok(())
    }

    /// Forgets `id` and tells its room. Connections that never joined are a no-op.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut registry = self.registry.write().await;
        let Some(session) = registry.remove(&id) else {
            debug!("Connection {} disconnected without joining a room", id);
            return;
        };

        self.broadcaster
            .send(
                Recipients::Room(session.room.clone()),
                &self.notice(&format!("{} has left the chat room", session.name)),
            )
            .await;
        self.broadcaster
            .send(Recipients::Room(session.room.clone()), &roster(&registry, &session.room))
            .await;
        self.broadcaster
            .send(Recipients::All, &room_list(&registry))
            .await;

        info!("Connection {} ({}) left room {}", id, session.name, session.room);
    }

    /// Relays a chat line to the sender's whole room, sender included.
    pub async fn send_message(&self, id: ConnectionId, name: &str, text: &str) {
        let registry = self.registry.read().await;
        let Some(room) = registry.get(&id).map(|session| session.room.clone()) else {
            debug!("Dropping message from connection {} outside any room", id);
            return;
        };

        let event = ServerEvent::Message(ChatMessage {
            name: name.to_string(),
            text: text.to_string(),
            time: self.timestamp(),
        });
        self.broadcaster.send(Recipients::Room(room), &event).await;
    }

    /// Relays a typing indicator to everyone else in the sender's room.
    pub async fn activity(&self, id: ConnectionId, name: &str) {
        let registry = self.registry.read().await;
        let Some(room) = registry.get(&id).map(|session| session.room.clone()) else {
            debug!("Dropping activity from connection {} outside any room", id);
            return;
        };

        self.broadcaster
            .send(
                Recipients::RoomExcept { room, except: id },
                &ServerEvent::Activity(name.to_string()),
            )
            .await;
    }

    pub async fn session(&self, id: &ConnectionId) -> Option<Session> {
        self.registry.read().await.get(id).cloned()
    }

    pub async fn room_names(&self) -> Vec<String> {
        self.registry.read().await.room_names()
    }

    pub async fn session_count(&self) -> usize {
        self.registry.read().await.len()
    }

    fn notice(&self, text: &str) -> ServerEvent {
        ServerEvent::Message(ChatMessage {
            name: self.chat.system_name.clone(),
            text: text.to_string(),
            time: self.timestamp(),
        })
    }

    fn timestamp(&self) -> String {
        let now = Local::now();
        let mut time = String::new();
        if write!(time, "{}", now.format(&self.chat.time_format)).is_err() {
            time = now.format(FALLBACK_TIME_FORMAT).to_string();
        }
        time
    }
}

fn roster(registry: &SessionRegistry, room: &str) -> ServerEvent {
    ServerEvent::UserList {
        users: registry.members_of(room),
    }
}

fn room_list(registry: &SessionRegistry) -> ServerEvent {
    ServerEvent::RoomList {
        rooms: registry.room_names(),
    }
}
