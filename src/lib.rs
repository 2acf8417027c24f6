// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Guardian-Tracker: Destiny 2 account metrics for home automation
//!
//! This crate polls the Bungie.net API for a single player account and
//! publishes read-only game-state metrics (reset timers, season expiry,
//! vault utilization, character status) over a small HTTP surface.

pub mod config;
pub mod error;
pub mod models;
pub mod resets;
pub mod routes;
pub mod services;

use config::Config;
use services::UpdateCoordinator;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub coordinator: Arc<UpdateCoordinator>,
}
