//! Configuration for casework
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

/// Minimum accepted JWT secret length outside dev mode
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// MongoDB (production)
    Mongo,
    /// Process-local maps, lost on restart
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Mongo => write!(f, "mongo"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Casework - case management API for community services
#[derive(Parser, Debug, Clone)]
#[command(name = "casework")]
#[command(about = "GraphQL case-management API for community services organizations")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:4000")]
    pub listen: SocketAddr,

    /// Enable development mode (insecure JWT secret, GraphiQL, memory fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Storage backend
    #[arg(long, env = "STORAGE", value_enum, default_value_t = StorageBackend::Mongo)]
    pub storage: StorageBackend,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "casework")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Per-channel event buffer for subscriptions
    #[arg(long, env = "SUBSCRIPTION_BUFFER", default_value = "64")]
    pub subscription_buffer: usize,

    /// Maximum accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "1048576")]
    pub max_body_bytes: usize,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match self.jwt_secret.as_deref() {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < MIN_JWT_SECRET_LEN => {
                    return Err(format!(
                        "JWT_SECRET must be at least {} characters",
                        MIN_JWT_SECRET_LEN
                    ))
                }
                Some(_) => {}
            }
        }

        if self.subscription_buffer == 0 {
            return Err("SUBSCRIPTION_BUFFER must be greater than zero".to_string());
        }

        if self.max_body_bytes < 1024 {
            return Err("MAX_BODY_BYTES must be at least 1024".to_string());
        }

        Ok(())
    }
}
