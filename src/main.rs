//! Agora - REST backend for the community platform

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agora::{
    blobs::LocalBlobStore,
    config::Args,
    db::MongoClient,
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("agora={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Agora - community platform backend");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    info!("Blob root: {}", args.blob_root.display());
    info!("Admin allowlist: {} user(s)", args.admin_ids().len());
    info!("======================================");

    // Connect to MongoDB; everything depends on the record store
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            client
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    // Local blob store for resumes, profile images, and videos
    let blobs = Arc::new(LocalBlobStore::new(
        args.blob_root.clone(),
        args.blob_base_url.clone(),
    ));

    // Create application state (opens collections, applies indexes)
    let state = match server::AppState::new(args, mongo, blobs).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
