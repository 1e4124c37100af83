//! Vouch - mutual reference exchange service
//!
//! References stay private until both sides have spoken.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vouch::{
    auth::JwtValidator,
    config::Args,
    db::schemas::{REFERENCE_COLLECTION, USER_COLLECTION},
    db::MongoClient,
    directory::{MemoryUserDirectory, MongoUserDirectory, UserDirectory},
    nats::NatsClient,
    notify::{
        EmailNotifier, LogEmailNotifier, LogPushNotifier, NatsEmailNotifier, NatsPushNotifier,
        PushNotifier,
    },
    reference::{MemoryReferenceStore, MongoReferenceStore, ReferenceService, ReferenceStore},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env before clap so the file can supply any flag
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // RUST_LOG wins over the --log-level flag when both are set
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vouch={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Vouch - Reference Exchange Service");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode {
            "DEVELOPMENT"
        } else {
            "PRODUCTION"
        }
    );
    info!("NATS: {}", args.nats.nats_url);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("======================================");

    // Reference store; in dev mode the service can run without it
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => Some(client),
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, using in-memory store): {}",
                    e
                );
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Notification relay; same dev-mode escape hatch
    let nats = match NatsClient::new(&args.nats, &format!("vouch-{}", args.node_id)).await {
        Ok(client) => Some(client),
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "NATS connection failed (dev mode, notifications go to the log): {}",
                    e
                );
                None
            } else {
                error!("NATS connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Token verifier; validate() guarantees a secret outside dev mode
    let jwt = match args.jwt_secret.clone() {
        Some(secret) => match JwtValidator::new(secret, args.jwt_expiry_seconds) {
            Ok(jwt) => jwt,
            Err(e) => {
                error!("JWT configuration error: {}", e);
                std::process::exit(1);
            }
        },
        None => JwtValidator::new_dev(),
    };

    // Storage and directory: MongoDB when connected, in-memory fallback in dev
    let (store, directory): (Arc<dyn ReferenceStore>, Arc<dyn UserDirectory>) = match mongo.clone()
    {
        Some(client) => {
            let references = client.collection(REFERENCE_COLLECTION).await?;
            let users = client.collection(USER_COLLECTION).await?;
            (
                Arc::new(MongoReferenceStore::new(references)),
                Arc::new(MongoUserDirectory::new(users)),
            )
        }
        None => {
            let directory = MemoryUserDirectory::new();
            seed_demo_users(&directory, &jwt);
            (Arc::new(MemoryReferenceStore::new()), Arc::new(directory))
        }
    };

    // Notification relays: NATS when connected, log-only fallback in dev
    let (email, push): (Arc<dyn EmailNotifier>, Arc<dyn PushNotifier>) = match nats.clone() {
        Some(client) => (
            Arc::new(NatsEmailNotifier::new(client.clone())),
            Arc::new(NatsPushNotifier::new(client)),
        ),
        None => (Arc::new(LogEmailNotifier), Arc::new(LogPushNotifier)),
    };

    let references = Arc::new(ReferenceService::new(
        store,
        Arc::clone(&directory),
        email,
        push,
    ));

    let state = Arc::new(AppState::new(args, mongo, nats, jwt, directory, references));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Seed two demo members and log ready-to-use bearer tokens.
///
/// Only runs on the in-memory fallback, so a bare `cargo run -- --dev-mode`
/// gives a working playground without MongoDB or account setup.
fn seed_demo_users(directory: &MemoryUserDirectory, jwt: &JwtValidator) {
    for (username, display_name, email) in [
        ("ada", "Ada Demo", "ada@example.com"),
        ("noor", "Noor Demo", "noor@example.com"),
    ] {
        let id = directory.add(username, display_name, email, true);
        match jwt.generate_token(&id.to_hex(), username) {
            Ok(token) => info!("Demo user '{}' ({}): Bearer {}", username, id.to_hex(), token),
            Err(e) => warn!("Could not mint a demo token for '{}': {}", username, e),
        }
    }
}
