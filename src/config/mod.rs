use chrono::format::{Item, StrftimeItems};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allowed_origins: Vec<String>,
    pub max_age: u32,
}

/// Server-generated notices and message stamping.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub system_name: String,
    pub welcome_message: String,
    /// chrono strftime pattern used for message timestamps
    pub time_format: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_name: "admin".to_string(),
            welcome_message: "Welcome to Chat App!".to_string(),
            time_format: "%-I:%M:%S %p".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSocketConfig {
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub chat: ChatConfig,
    pub websocket: WebSocketConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let settings: Settings = Self::defaults()?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let chat = ChatConfig::default();

        Config::builder()
            .set_default("environment", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3500)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("cors.enabled", true)?
            .set_default(
                "cors.allowed_origins",
                vec!["http://localhost:5500", "http://127.0.0.1:5500"],
            )?
            .set_default("cors.max_age", 3600)?
            .set_default("chat.system_name", chat.system_name)?
            .set_default("chat.welcome_message", chat.welcome_message)?
            .set_default("chat.time_format", chat.time_format)?
            .set_default("websocket.heartbeat_interval_secs", 5)?
            .set_default("websocket.client_timeout_secs", 10)
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.system_name.trim().is_empty() {
            return Err(ConfigError::Message("chat.system_name must not be empty".into()));
        }
        if StrftimeItems::new(&self.chat.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Message(format!(
                "chat.time_format is not a valid strftime pattern: {}",
                self.chat.time_format
            )));
        }
        if self.websocket.client_timeout_secs <= self.websocket.heartbeat_interval_secs {
            return Err(ConfigError::Message(
                "websocket.client_timeout_secs must exceed websocket.heartbeat_interval_secs".into(),
            ));
        }
        Ok(())
    }
}
