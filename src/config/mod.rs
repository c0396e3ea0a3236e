//! Application configuration management

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use base64::Engine;
use tracing::warn;

use crate::events::{DEFAULT_QUEUE_CAPACITY, EventBusConfig};
use crate::services::auth::DEFAULT_TOKEN_TTL_SECONDS;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host to bind (all interfaces when unset)
    pub host: Option<String>,

    /// Server port
    pub port: u16,

    /// SQLite database URL (DATABASE_PATH or DATABASE_URL)
    pub database_url: String,

    /// Connection pool size
    pub database_max_connections: u32,

    /// HMAC secret for signing tokens
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub token_ttl_seconds: i64,

    /// Shared password accepted by `login`
    pub login_password: String,

    /// Per-subscription event queue bound
    pub event_queue_capacity: usize,

    /// Maximum live subscriptions (unlimited when unset)
    pub max_subscriptions: Option<usize>,

    /// Insert sample authors and books into an empty database
    pub seed_sample_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            port: 4000,
            database_url: "sqlite:./data/library.db".to_string(),
            database_max_connections: 5,
            jwt_secret: generate_dev_secret(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            login_password: "secret".to_string(),
            event_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_subscriptions: None,
            seed_sample_data: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        // DATABASE_PATH wins over DATABASE_URL; bare paths get the sqlite: prefix
        let database_url = match lookup("DATABASE_PATH").or_else(|| lookup("DATABASE_URL")) {
            Some(url) if url.starts_with("sqlite:") => url,
            Some(path) => format!("sqlite:{}", path),
            None => defaults.database_url,
        };

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set, using a random secret; tokens will not survive a restart");
                defaults.jwt_secret
            }
        };

        Ok(Self {
            host: lookup("HOST").filter(|h| !h.is_empty()),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            database_url,
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.database_max_connections),
            jwt_secret,
            token_ttl_seconds: parse_var(&lookup, "TOKEN_TTL_SECONDS")?
                .unwrap_or(defaults.token_ttl_seconds),
            login_password: lookup("LOGIN_PASSWORD").unwrap_or(defaults.login_password),
            event_queue_capacity: parse_var(&lookup, "EVENT_QUEUE_CAPACITY")?
                .unwrap_or(defaults.event_queue_capacity),
            max_subscriptions: parse_var(&lookup, "MAX_SUBSCRIPTIONS")?,
            seed_sample_data: lookup("SEED_SAMPLE_DATA")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.seed_sample_data),
        })
    }

    /// Address to bind the HTTP server to
    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.host.as_deref().unwrap_or("0.0.0.0"),
            self.port
        )
    }

    pub fn event_bus(&self) -> EventBusConfig {
        EventBusConfig {
            queue_capacity: self.event_queue_capacity,
            max_subscriptions: self.max_subscriptions,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid {}: {:?}", key, raw))
        })
        .transpose()
}

fn generate_dev_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
