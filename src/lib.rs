pub mod config;
pub mod error;
pub mod rooms;
pub mod websocket;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use rooms::{RoomRouter, Session, SessionRegistry};
pub use websocket::ConnectionPool;

/// Health check endpoint handler
/// Returns server status plus live connection, session and room counts
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "connections": state.pool.connection_count().await,
        "sessions": state.router.session_count().await,
        "rooms": state.router.room_names().await,
    }))
}

/// Registers every HTTP and websocket route on an `App`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ws", web::get().to(websocket::websocket_route));
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub pool: Arc<ConnectionPool>,
    pub router: Arc<RoomRouter>,
}

impl AppState {
    pub fn new(config: Settings) -> Self {
        let pool = Arc::new(ConnectionPool::new());
        let router = Arc::new(RoomRouter::new(pool.clone(), config.chat.clone()));

        Self {
            config: Arc::new(config),
            pool,
            router,
        }
    }
}
