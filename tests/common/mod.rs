// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: a fake Bungie server with switchable failure
//! modes and call counters, plus constructors for the pieces under test.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use guardian_tracker::config::Config;
use guardian_tracker::models::{guardian::membership_type_name, Guardian, OAuthToken};
use guardian_tracker::routes::create_router;
use guardian_tracker::services::{BungieClient, ManifestCache, TokenStore, UpdateCoordinator};
use guardian_tracker::AppState;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Behavior switch for the fake Bungie server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(dead_code)]
pub enum ServerMode {
    /// Everything succeeds
    Ok,
    /// Game-data endpoints return 401
    Unauthorized,
    /// Game-data endpoints return 429
    RateLimited,
    /// Game-data and token endpoints return 500
    ServerError,
    /// Token endpoint returns 400 invalid_grant
    RejectRefresh,
}

/// Fake Bungie backend state shared with the handlers.
pub struct FakeBungie {
    mode: Mutex<ServerMode>,
    pub refresh_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub milestone_calls: AtomicUsize,
    /// Items reported in the profile inventory
    pub vault_count: AtomicUsize,
    /// Postmaster items on the single test character
    pub postmaster_count: AtomicUsize,
    /// Artificial latency for single-flight and coalescing tests
    pub refresh_delay_ms: AtomicUsize,
    pub profile_delay_ms: AtomicUsize,
}

impl FakeBungie {
    #[allow(dead_code)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(ServerMode::Ok),
            refresh_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            milestone_calls: AtomicUsize::new(0),
            vault_count: AtomicUsize::new(450),
            postmaster_count: AtomicUsize::new(3),
            refresh_delay_ms: AtomicUsize::new(0),
            profile_delay_ms: AtomicUsize::new(0),
        })
    }

    #[allow(dead_code)]
    pub fn set_mode(&self, mode: ServerMode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn mode(&self) -> ServerMode {
        *self.mode.lock().unwrap()
    }
}

/// Season end date served by the fake milestones endpoint.
#[allow(dead_code)]
pub const SEASON_END_RFC3339: &str = "2031-02-03T17:00:00Z";

fn game_data_failure(mode: ServerMode) -> Option<StatusCode> {
    match mode {
        ServerMode::Unauthorized => Some(StatusCode::UNAUTHORIZED),
        ServerMode::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS),
        ServerMode::ServerError => Some(StatusCode::INTERNAL_SERVER_ERROR),
        ServerMode::Ok | ServerMode::RejectRefresh => None,
    }
}

async fn token_endpoint(State(fake): State<Arc<FakeBungie>>) -> axum::response::Response {
    let call = fake.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let delay = fake.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay as u64)).await;
    }

    match fake.mode() {
        ServerMode::RejectRefresh => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response(),
        ServerMode::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => Json(json!({
            "access_token": format!("access-{call}"),
            "refresh_token": format!("refresh-{call}"),
            "token_type": "Bearer",
            "expires_in": 3600,
        }))
        .into_response(),
    }
}

async fn milestones_endpoint(State(fake): State<Arc<FakeBungie>>) -> axum::response::Response {
    fake.milestone_calls.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = game_data_failure(fake.mode()) {
        return status.into_response();
    }

    Json(json!({
        "Response": {
            // Featured raid with a Master difficulty and the season end date
            "526718853": {
                "activities": [
                    {"activityHash": 1374392663u64},
                    {"activityHash": 2964135793u64},
                ],
                "endDate": SEASON_END_RFC3339,
            },
            // Recurring weekly milestone with no end date, skipped by the decoder
            "3448738070": {
                "activities": [],
            },
        }
    }))
    .into_response()
}

async fn profile_endpoint(
    State(fake): State<Arc<FakeBungie>>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    fake.profile_calls.fetch_add(1, Ordering::SeqCst);
    let delay = fake.profile_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay as u64)).await;
    }

    if let Some(status) = game_data_failure(fake.mode()) {
        return status.into_response();
    }

    let components = params.get("components").map(String::as_str).unwrap_or("");
    if components == "102" {
        let count = fake.vault_count.load(Ordering::SeqCst);
        let items: Vec<_> = (0..count)
            .map(|i| json!({"itemHash": i, "bucketHash": 138197802u64}))
            .collect();
        Json(json!({
            "Response": {"profileInventory": {"data": {"items": items}}}
        }))
        .into_response()
    } else {
        let postmaster = fake.postmaster_count.load(Ordering::SeqCst);
        let items: Vec<_> = (0..postmaster)
            .map(|_| json!({"bucketHash": 215593132u64}))
            .collect();
        Json(json!({
            "Response": {
                "characters": {"data": {"2305843009301042425": {
                    "classHash": 671679327u64,
                    "raceHash": 2803282938u64,
                    "genderHash": 3111576190u64,
                    "light": 2010,
                    "dateLastPlayed": "2026-08-01T12:00:00Z",
                }}},
                "characterInventories": {"data": {"2305843009301042425": {"items": items}}},
            }
        }))
        .into_response()
    }
}

async fn manifest_endpoint(
    Path((_definition_type, hash)): Path<(String, String)>,
) -> Json<serde_json::Value> {
    let name = match hash.as_str() {
        "526718853" => "King's Fall",
        "1374392663" => "King's Fall: Standard",
        "2964135793" => "King's Fall: Master",
        "671679327" => "Hunter",
        "2803282938" => "Awoken",
        "3111576190" => "Male",
        _ => "Unknown Definition",
    };
    Json(json!({"Response": {"displayProperties": {"name": name}}}))
}

/// Spawn the fake server on an ephemeral port; returns its origin URL.
#[allow(dead_code)]
pub async fn spawn_fake_bungie(fake: Arc<FakeBungie>) -> String {
    let app = Router::new()
        .route("/Platform/App/OAuth/Token/", post(token_endpoint))
        .route("/Platform/Destiny2/Milestones/", get(milestones_endpoint))
        .route(
            "/Platform/Destiny2/{membership_type}/Profile/{membership_id}/",
            get(profile_endpoint),
        )
        .route(
            "/Platform/Destiny2/Manifest/{definition_type}/{hash}/",
            get(manifest_endpoint),
        )
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake Bungie server");
    let addr = listener.local_addr().expect("fake server address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake Bungie server");
    });

    format!("http://{}", addr)
}

/// Client pointed at the fake server.
#[allow(dead_code)]
pub fn test_client(origin: &str) -> Arc<BungieClient> {
    Arc::new(
        BungieClient::new(
            "test-api-key".to_string(),
            "test-client-id".to_string(),
            "test-secret".to_string(),
        )
        .with_base_url(origin),
    )
}

/// Token with a full day of headroom.
#[allow(dead_code)]
pub fn fresh_token() -> OAuthToken {
    OAuthToken::new(
        "seed-access".to_string(),
        "seed-refresh".to_string(),
        86_400,
        Utc::now(),
    )
}

/// Token issued two hours ago with a one-hour lifetime.
#[allow(dead_code)]
pub fn expired_token() -> OAuthToken {
    OAuthToken::new(
        "seed-access".to_string(),
        "seed-refresh".to_string(),
        3600,
        Utc::now() - Duration::hours(2),
    )
}

#[allow(dead_code)]
pub fn test_guardian() -> Guardian {
    Guardian {
        bungie_name: "TestGuardian#1234".to_string(),
        display_name: "TestGuardian".to_string(),
        membership_id: "4611686018467260757".to_string(),
        membership_type: 3,
        membership_type_name: membership_type_name(3).to_string(),
    }
}

/// Coordinator wired to the fake server.
#[allow(dead_code)]
pub fn build_coordinator(
    client: Arc<BungieClient>,
    initial_token: OAuthToken,
) -> Arc<UpdateCoordinator> {
    let tokens = Arc::new(TokenStore::new(client.clone(), initial_token));
    let manifest = ManifestCache::new(client.clone());
    Arc::new(UpdateCoordinator::new(
        client,
        tokens,
        manifest,
        test_guardian(),
    ))
}

/// Router over a coordinator, for route tests.
#[allow(dead_code)]
pub fn create_test_app(coordinator: Arc<UpdateCoordinator>) -> axum::Router {
    let state = Arc::new(AppState {
        config: Config::test_default(),
        coordinator,
    });
    create_router(state)
}
