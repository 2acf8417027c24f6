// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Guardian-Tracker daemon
//!
//! Polls the Bungie API for a single Destiny 2 account on a fixed cadence
//! and serves the latest snapshot to the host automation platform.

use guardian_tracker::{
    config::Config,
    models::{guardian::membership_type_name, Guardian, OAuthToken},
    services::{BungieClient, ManifestCache, TokenStore, UpdateCoordinator},
    AppState,
};
use chrono::Utc;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Guardian-Tracker");

    // Bungie API client shared by the token store, manifest cache, and
    // coordinator
    let client = Arc::new(BungieClient::new(
        config.bungie_api_key.clone(),
        config.bungie_client_id.clone(),
        config.bungie_client_secret.clone(),
    ));

    // Seed the token store with the credentials from the authorization
    // handshake (supplied by the host's secret store)
    let initial_token = OAuthToken::new(
        config.access_token.clone(),
        config.refresh_token.clone(),
        config.token_expires_in,
        Utc::now(),
    );
    let tokens = Arc::new(TokenStore::new(client.clone(), initial_token));

    let manifest = ManifestCache::new(client.clone());

    let guardian = Guardian {
        bungie_name: config.bungie_name.clone(),
        display_name: config.display_name.clone(),
        membership_id: config.membership_id.clone(),
        membership_type: config.membership_type,
        membership_type_name: membership_type_name(config.membership_type).to_string(),
    };

    let coordinator = Arc::new(UpdateCoordinator::new(client, tokens, manifest, guardian));

    // Poll loop: drives run_cycle on the configured cadence. The first
    // tick fires immediately so sensors come up populated.
    let interval = std::time::Duration::from_secs(config.update_interval_minutes * 60);
    tracing::info!(
        interval_minutes = config.update_interval_minutes,
        "Starting update cycle"
    );
    let poller = coordinator.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = poller.run_cycle(Utc::now()).await;
            tracing::debug!(?outcome, "Update cycle finished");
        }
    });

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        coordinator,
    });

    // Build router
    let app = guardian_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guardian_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
