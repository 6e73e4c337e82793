//! Casework - case management API for community services organizations

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casework::{
    auth::JwtValidator,
    config::{Args, StorageBackend},
    db::{Collections, MongoClient},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("casework={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Casework - community services API");
    info!("======================================");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), env!("CASEWORK_GIT_REVISION"));
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Storage: {}", args.storage);
    if args.storage == StorageBackend::Mongo {
        info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    }
    info!("======================================");

    let (storage, collections) = open_storage(&args).await;

    let jwt = match args.jwt_secret.clone() {
        Some(secret) => JwtValidator::new(secret, args.jwt_expiry_seconds)?,
        None => {
            warn!("No JWT_SECRET set, using the development signing key");
            JwtValidator::new_dev()
        }
    };

    let state = Arc::new(AppState::new(args, storage, collections, jwt));
    server::run(state).await?;

    Ok(())
}

/// Open the configured backend; in dev mode an unreachable MongoDB falls
/// back to the in-memory store
async fn open_storage(args: &Args) -> (StorageBackend, Collections) {
    match args.storage {
        StorageBackend::Memory => {
            warn!("In-memory storage: data is lost on restart");
            (StorageBackend::Memory, Collections::in_memory())
        }
        StorageBackend::Mongo => {
            let opened = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
                Ok(client) => Collections::mongo(&client).await,
                Err(e) => Err(e),
            };

            match opened {
                Ok(collections) => {
                    info!("MongoDB connected successfully");
                    (StorageBackend::Mongo, collections)
                }
                Err(e) if args.dev_mode => {
                    warn!("MongoDB connection failed (dev mode, using in-memory storage): {}", e);
                    (StorageBackend::Memory, Collections::in_memory())
                }
                Err(e) => {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
