//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Directory served for every path that is not an API route
    pub static_dir: PathBuf,
    /// Allowed client origins for CORS, comma-separated, `*` for any
    pub client_origin: String,
    /// Input frames per second allowed per connection (unlimited when unset)
    pub input_rate_limit: Option<u32>,
    /// Fixed seed for spawn positions and colors (random when unset)
    pub world_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR, as on most hosting platforms
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let input_rate_limit = lookup("INPUT_RATE_LIMIT")
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("INPUT_RATE_LIMIT"))
            })
            .transpose()?;

        let world_seed = lookup("WORLD_SEED")
            .map(|raw| raw.trim().parse().map_err(|_| ConfigError::Invalid("WORLD_SEED")))
            .transpose()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),

            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),

            input_rate_limit,
            world_seed,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
