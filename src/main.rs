use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use chatroom_server::config::CorsConfig;
use chatroom_server::{configure_routes, AppError, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn build_cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allowed_origins.iter().any(|origin| origin == "*") {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET"])
        .allow_any_header()
        .max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> chatroom_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully ({})", config.environment);

    let state = web::Data::new(AppState::new(config.clone()));

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    info!(
        "Chat server ready to accept connections at ws://{}:{}/ws",
        config.server.host, config.server.port
    );

    let workers = config.server.workers as usize;
    let cors = config.cors.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors))
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .listen(listener)?
    .workers(workers)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
