use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::rooms::{ConnectionId, RoomRouter};
use crate::websocket::{ClientEvent, ConnectionPool};
use crate::AppState;

/// WebSocket connection handler
/// This upgrades the HTTP connection to a chat session
pub async fn websocket_route(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> std::result::Result<HttpResponse, Error> {
    let peer_addr = req
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    info!("New WebSocket connection request from: {}", peer_addr);

    let websocket = &state.config.websocket;
    ws::start(
        ChatSession::new(
            state.router.clone(),
            state.pool.clone(),
            peer_addr,
            Duration::from_secs(websocket.heartbeat_interval_secs),
            Duration::from_secs(websocket.client_timeout_secs),
        ),
        &req,
        stream,
    )
}

/// One chat connection. Inbound frames are handed to the router one at a time;
/// outbound events arrive through the channel registered in the pool.
pub struct ChatSession {
    id: ConnectionId,
    router: Arc<RoomRouter>,
    pool: Arc<ConnectionPool>,
    peer_addr: String,
    last_heartbeat: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl ChatSession {
    pub fn new(
        router: Arc<RoomRouter>,
        pool: Arc<ConnectionPool>,
        peer_addr: String,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            router,
            pool,
            peer_addr,
            last_heartbeat: Instant::now(),
            heartbeat_interval,
            client_timeout,
        }
    }

    fn handle_text(&mut self, text: &str, ctx: &mut <Self as Actor>::Context) {
        let event = match ClientEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring frame from {} ({}): {}", self.peer_addr, self.id, e);
                return;
            }
        };

        debug!("Event from {}: {:?}", self.id, event);
        let router = self.router.clone();
        let id = self.id;
        // wait() keeps this connection's events strictly ordered
        ctx.wait(
            async move {
                if let Err(e) = router.dispatch(id, event).await {
                    warn!("Rejected event from connection {}: {}", id, e);
                }
            }
            .into_actor(self),
        );
    }

    fn start_heartbeat(&self, ctx: &mut <Self as Actor>::Context) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > act.client_timeout {
                warn!("Heartbeat timeout for connection {} ({})", act.id, act.peer_addr);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for ChatSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection established with {} (id: {})", self.peer_addr, self.id);

        self.start_heartbeat(ctx);

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        ctx.add_stream(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|text| (Outbound(text), rx))
        }));

        let router = self.router.clone();
        let pool = self.pool.clone();
        let id = self.id;
        ctx.wait(
            async move {
                pool.add(id, tx).await;
                router.connect(id).await;
            }
            .into_actor(self),
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("WebSocket connection closed with {} (id: {})", self.peer_addr, self.id);

        let router = self.router.clone();
        let pool = self.pool.clone();
        let id = self.id;
        actix_rt::spawn(async move {
            pool.remove(&id).await;
            router.disconnect(id).await;
        });
    }
}

/// Serialized event queued for this connection by the pool.
struct Outbound(String);

impl StreamHandler<Outbound> for ChatSession {
    fn handle(&mut self, Outbound(text): Outbound, ctx: &mut Self::Context) {
        ctx.text(text);
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        debug!("Outbound channel for connection {} closed", self.id);
        ctx.stop();
    }
}

/// Implement the StreamHandler trait to process WebSocket messages
impl StreamHandler<std::result::Result<ws::Message, ws::ProtocolError>> for ChatSession {
    fn handle(&mut self, msg: std::result::Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Binary(bin)) => {
                warn!("Ignoring binary message from {} of {} bytes", self.peer_addr, bin.len());
            }
            Ok(ws::Message::Close(reason)) => {
                info!("WebSocket closed from {}: {:?}", self.peer_addr, reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error handling WebSocket message from {}: {}", self.peer_addr, e);
                ctx.stop();
            }
        }
    }
}
