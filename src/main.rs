// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cycle rental API server.

use cycle_rental::{config::Config, db::Store, services::BlobStore, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting cycle rental API");

    let store = match &config.gcp_project_id {
        Some(project_id) => {
            let store = Store::firestore(project_id).await?;
            tracing::info!(project = %project_id, "Firestore store initialized");
            store
        }
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory store");
            Store::in_memory()
        }
    };

    let blob_store = match &config.cloudinary {
        Some(cloudinary) => {
            tracing::info!(cloud = %cloudinary.cloud_name, "Cloudinary image store initialized");
            BlobStore::new(cloudinary.clone())
        }
        None => {
            tracing::warn!("Cloudinary not configured, using in-memory image store");
            BlobStore::new_mock()
        }
    };

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::new(config, store, blob_store));

    // Build router
    let app = cycle_rental::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cycle_rental=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
