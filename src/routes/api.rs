// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only API routes exposing the coordinator's state.

use crate::error::{AppError, Result};
use crate::models::AccountSnapshot;
use crate::resets::{self, ResetSchedule};
use crate::services::CoordinatorState;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/resets", get(get_resets))
        .route("/api/status", get(get_status))
}

// ─── Snapshot ────────────────────────────────────────────────

/// Last published snapshot plus vault derivations.
#[derive(Serialize)]
pub struct SnapshotResponse {
    pub snapshot: AccountSnapshot,
    pub remaining_space: Option<u32>,
    pub percent_full: Option<f64>,
}

/// Last published account snapshot (503 until the first cycle lands).
async fn get_snapshot(State(state): State<Arc<AppState>>) -> Result<Json<SnapshotResponse>> {
    let snapshot = state
        .coordinator
        .current_snapshot()
        .ok_or(AppError::NotReady)?;

    Ok(Json(SnapshotResponse {
        remaining_space: snapshot.remaining_space(),
        percent_full: snapshot.percent_full(),
        snapshot: (*snapshot).clone(),
    }))
}

// ─── Resets ──────────────────────────────────────────────────

/// Reset schedule, recomputed per request.
#[derive(Serialize)]
pub struct ResetsResponse {
    pub daily_reset: DateTime<Utc>,
    pub weekly_reset: DateTime<Utc>,
    pub computed_at: DateTime<Utc>,
    pub days_until_weekly: i64,
    pub season_end: Option<DateTime<Utc>>,
    pub days_until_season_end: Option<i64>,
}

/// Reset timers. No network involved; always current.
async fn get_resets(State(state): State<Arc<AppState>>) -> Json<ResetsResponse> {
    let now = Utc::now();
    let schedule = ResetSchedule::compute(now);
    let season_end = state
        .coordinator
        .current_snapshot()
        .and_then(|snapshot| snapshot.season_end);

    Json(ResetsResponse {
        daily_reset: schedule.daily_reset,
        weekly_reset: schedule.weekly_reset,
        computed_at: schedule.computed_at,
        days_until_weekly: resets::days_until(schedule.weekly_reset, now),
        season_end,
        days_until_season_end: season_end.map(|end| resets::days_until(end, now)),
    })
}

// ─── Status ──────────────────────────────────────────────────

/// Coordinator status for the host's health checks and re-auth flow.
#[derive(Serialize)]
pub struct StatusResponse {
    pub state: CoordinatorState,
    pub auth_required: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub update_interval_minutes: u64,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let last_fetched_at = state
        .coordinator
        .current_snapshot()
        .and_then(|snapshot| snapshot.fetched_at);

    Json(StatusResponse {
        state: state.coordinator.state(),
        auth_required: state.coordinator.auth_required(),
        last_fetched_at,
        update_interval_minutes: state.config.update_interval_minutes,
    })
}
