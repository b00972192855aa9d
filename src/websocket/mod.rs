//! WebSocket module for the chat server
//!
//! This module owns the wire protocol, the pool of live connections and
//! the per-connection session actor that feeds the room router.

mod pool;
mod protocol;
mod session;

pub use pool::ConnectionPool;
pub use protocol::{ChatMessage, ClientEvent, ServerEvent};
pub use session::{websocket_route, ChatSession};
