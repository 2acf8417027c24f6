// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The published account snapshot.

use super::{CharacterRoster, Guardian, Rotators};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Destiny 2 vault capacity. Fixed by the game, not fetched.
pub const VAULT_MAX_CAPACITY: u32 = 600;

/// Freshness of a published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// Built from a successful fetch this cycle
    Ok,
    /// Carrying data from an earlier cycle after a transient failure
    Stale,
    /// Authentication failed; re-authorization required
    Error,
}

/// Immutable view of the latest known account state.
///
/// A new snapshot is built each cycle and atomically replaces its
/// predecessor; readers never observe a partially updated one. Reset
/// times are recomputed locally every cycle and are current even when
/// the data fields are stale.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    pub guardian: Guardian,
    pub vault_item_count: Option<u32>,
    pub vault_max_capacity: u32,
    pub season_end: Option<DateTime<Utc>>,
    pub weekly_reset: DateTime<Utc>,
    pub daily_reset: DateTime<Utc>,
    pub characters: Option<CharacterRoster>,
    pub rotators: Rotators,
    /// When the data fields were last fetched successfully
    pub fetched_at: Option<DateTime<Utc>>,
    pub status: SnapshotStatus,
}

impl AccountSnapshot {
    /// Free slots left in the vault.
    pub fn remaining_space(&self) -> Option<u32> {
        self.vault_item_count
            .map(|count| VAULT_MAX_CAPACITY.saturating_sub(count))
    }

    /// Vault utilization as a percentage, one decimal place.
    pub fn percent_full(&self) -> Option<f64> {
        self.vault_item_count
            .map(|count| (f64::from(count) / f64::from(VAULT_MAX_CAPACITY) * 1000.0).round() / 10.0)
    }
}
