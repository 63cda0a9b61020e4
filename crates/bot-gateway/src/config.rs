//! Environment Configuration
//!
//! All settings come from the environment (a `.env` file is loaded in
//! `main`). The MongoDB URI is either taken verbatim from `MONGO_URI` or
//! composed from host/port/credential parts the way the original deployment
//! configures it.

use crate::error::{GatewayError, Result};

#[derive(Clone, Debug)]
pub struct Settings {
    /// Telegram bot token
    pub telegram_bot_token: String,

    /// Public webhook URL to register at startup (skipped when unset)
    pub telegram_webhook_url: Option<String>,

    /// HTTP bind address
    pub bind_addr: String,

    /// MongoDB connection string
    pub mongo_uri: String,

    /// MongoDB database name
    pub mongo_db: String,

    /// Model (or Azure deployment) the agent generates with
    pub model: String,

    /// Budget for one agent run, seconds
    pub agent_timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let telegram_bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| GatewayError::Config("TELEGRAM_BOT_TOKEN not set".into()))?;

        let mongo_db = env_or("MONGO_DB", "bull_vision");
        let mongo_uri = std::env::var("MONGO_URI").unwrap_or_else(|_| compose_mongo_uri(&mongo_db));

        Ok(Self {
            telegram_bot_token,
            telegram_webhook_url: std::env::var("TELEGRAM_WEBHOOK_URL").ok(),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),
            mongo_uri,
            mongo_db,
            model: env_or("AGENT_MODEL", "gpt-4o-mini"),
            agent_timeout_secs: std::env::var("AGENT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(45),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn compose_mongo_uri(db: &str) -> String {
    let host = env_or("MONGO_HOST", "localhost");
    let port = env_or("MONGO_PORT", "27017");
    let user = std::env::var("MONGO_USER").unwrap_or_default();
    let pass = std::env::var("MONGO_PASS").unwrap_or_default();

    if user.is_empty() || pass.is_empty() {
        format!("mongodb://{host}:{port}/{db}")
    } else {
        let auth_source = env_or("MONGO_AUTH_SOURCE", "admin");
        let auth_mechanism = env_or("MONGO_AUTH_MECHANISM", "SCRAM-SHA-256");
        format!(
            "mongodb://{user}:{pass}@{host}:{port}/{db}?authSource={auth_source}&authMechanism={auth_mechanism}"
        )
    }
}
