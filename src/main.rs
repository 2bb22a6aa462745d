//! Proof of Peacemaking API server

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peacemaking::{
    auth::spawn_sweep_task,
    config::Args,
    db::{mongo_stores, MongoClient},
    server::{self, AppState, Services},
    store::Stores,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("peacemaking={},info", args.log_level).into());
    if args.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Proof of Peacemaking");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
    info!("WebAuthn RP: {} ({})", args.webauthn_rp_id, args.webauthn_rp_origin);
    match args.r2_buckets() {
        Ok(buckets) => {
            for bucket in buckets {
                info!("Object storage: {} -> {}", bucket.kind, bucket.bucket);
            }
        }
        Err(e) => warn!("Object storage: {}", e),
    }
    info!("======================================");

    let stores = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => match mongo_stores(&client).await {
            Ok(stores) => stores,
            Err(e) => {
                error!("MongoDB index setup failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory stores): {}", e);
                Stores::memory()
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let services = match Services::build(stores, &args) {
        Ok(services) => services,
        Err(e) => {
            error!("Service setup failed: {}", e);
            std::process::exit(1);
        }
    };

    spawn_sweep_task(
        Arc::clone(&services.sessions),
        args.session_sweep_interval(),
    );

    let state = Arc::new(AppState::new(args, services));

    tokio::select! {
        result = server::run(state) => {
            if let Err(e) = result {
                error!("Server error: {:?}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
