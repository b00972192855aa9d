use serde::{Deserialize, Serialize};

use crate::error::WebSocketError;
use crate::rooms::Session;

/// Events a client may send once connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEvent {
    #[serde(rename = "enterRoom")]
    EnterRoom { name: String, room: String },
    #[serde(rename = "message")]
    Message { name: String, text: String },
    #[serde(rename = "activity")]
    Activity(String),
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, WebSocketError> {
        serde_json::from_str(text).map_err(|e| WebSocketError::InvalidFormat(e.to_string()))
    }
}

/// A chat line as rendered by clients. `time` is stamped by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub name: String,
    pub text: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "message")]
    Message(ChatMessage),
    #[serde(rename = "activity")]
    Activity(String),
    #[serde(rename = "userList")]
    UserList { users: Vec<Session> },
    #[serde(rename = "roomList")]
    RoomList { rooms: Vec<String> },
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, WebSocketError> {
        serde_json::to_string(self)
            .map_err(|e| WebSocketError::InvalidFormat(format!("Failed to serialize event: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use uuid::Uuid;

    #[test]
    fn test_parse_client_events() {
        let join = ClientEvent::parse(r#"{"type":"enterRoom","payload":{"name":"alice","room":"lobby"}}"#)
            .unwrap();
        assert_eq!(
            join,
            ClientEvent::EnterRoom {
                name: "alice".to_string(),
                room: "lobby".to_string(),
            }
        );

        let activity = ClientEvent::parse(r#"{"type":"activity","payload":"alice"}"#).unwrap();
        assert_eq!(activity, ClientEvent::Activity("alice".to_string()));

        let message = ClientEvent::parse(r#"{"type":"message","payload":{"name":"alice","text":"hi"}}"#)
            .unwrap();
        assert!(matches!(message, ClientEvent::Message { ref text, .. } if text == "hi"));
    }

    #[test]
    fn test_parse_rejects_malformed_frames() {
        for frame in [
            "not json",
            r#"{"type":"enterRoom","payload":{"name":"alice"}}"#,
            r#"{"type":"shout","payload":"hey"}"#,
        ] {
            let err = ClientEvent::parse(frame).unwrap_err();
            assert!(matches!(err, WebSocketError::InvalidFormat(_)), "frame: {}", frame);
        }
    }

    #[test]
    fn test_server_event_wire_shape() {
        let id = Uuid::new_v4();
        let users = ServerEvent::UserList {
            users: vec![Session {
                id,
                name: "alice".to_string(),
                room: "lobby".to_string(),
            }],
        };
        let value: Value = serde_json::from_str(&users.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "userList",
                "payload": { "users": [{ "id": id.to_string(), "name": "alice", "room": "lobby" }] }
            })
        );

        let rooms: Value =
            serde_json::from_str(&ServerEvent::RoomList { rooms: vec!["lobby".into()] }.to_json().unwrap())
                .unwrap();
        assert_eq!(rooms, json!({ "type": "roomList", "payload": { "rooms": ["lobby"] } }));

        let activity: Value =
            serde_json::from_str(&ServerEvent::Activity("bob".into()).to_json().unwrap()).unwrap();
        assert_eq!(activity, json!({ "type": "activity", "payload": "bob" }));
    }
}
