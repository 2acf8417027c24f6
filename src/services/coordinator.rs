// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Update coordinator: the polling and publishing core.
//!
//! Each cycle ensures the OAuth token is valid, fetches account data from
//! Bungie, merges it with locally computed reset times, and atomically
//! publishes a fresh [`AccountSnapshot`]. Transient failures keep the
//! previous snapshot's data fields and mark it stale; only a dead refresh
//! token surfaces as a hard error requiring host re-authorization.

use crate::error::AppError;
use crate::models::{
    guardian::Guardian, AccountSnapshot, CharacterRoster, CharacterSummary, OAuthToken, Rotator,
    Rotators, SnapshotStatus, VAULT_MAX_CAPACITY,
};
use crate::resets::ResetSchedule;
use crate::services::bungie::{BungieClient, CharactersResponse, MilestoneEntry, BUCKET_POSTMASTER};
use crate::services::manifest::{self, ManifestCache};
use crate::services::TokenStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// A character whose postmaster holds this many items is about to lose
/// loot (capacity is 21).
const POSTMASTER_CRITICAL_THRESHOLD: u32 = 18;

/// Known raid names for rotator categorization.
const RAID_KEYWORDS: &[&str] = &[
    "last wish",
    "garden of salvation",
    "deep stone crypt",
    "vault of glass",
    "vow of the disciple",
    "king's fall",
    "root of nightmares",
    "crota's end",
    "salvation's edge",
];

/// Known dungeon names.
const DUNGEON_KEYWORDS: &[&str] = &[
    "shattered throne",
    "pit of heresy",
    "prophecy",
    "grasp of avarice",
    "duality",
    "spire of the watcher",
    "ghosts of the deep",
    "warlord's ruin",
    "vesper's host",
    "desert perpetual",
];

/// Coordinator lifecycle state, observable by collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No cycle has run yet
    Idle,
    TokenCheck,
    Fetching,
    Merging,
    /// Last cycle published a fresh snapshot
    Published,
    /// Last cycle hit a transient failure; snapshot is stale
    Degraded,
    /// Refresh token rejected; waiting on host re-authorization
    AuthFailed,
}

/// Outcome of a single `run_cycle` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published,
    Degraded,
    AuthFailed,
    /// A previous cycle was still running; this tick was coalesced
    Skipped,
}

/// Everything fetched from Bungie in one cycle, before merging.
struct RawAccountPayload {
    vault_count: u32,
    season_end: Option<DateTime<Utc>>,
    rotators: Rotators,
    roster: CharacterRoster,
}

/// Coordinator managing periodic Destiny 2 data updates.
pub struct UpdateCoordinator {
    client: Arc<BungieClient>,
    tokens: Arc<TokenStore>,
    manifest: ManifestCache,
    guardian: Guardian,
    /// Last published snapshot; `send_replace` makes publishing atomic
    /// and readers never see a partially built value.
    snapshot_tx: watch::Sender<Option<Arc<AccountSnapshot>>>,
    /// Raised when the host must re-run the authorization flow.
    auth_tx: watch::Sender<bool>,
    state: std::sync::RwLock<CoordinatorState>,
    /// Mutual exclusion around `run_cycle`; overlapping ticks coalesce.
    cycle_lock: tokio::sync::Mutex<()>,
}

impl UpdateCoordinator {
    pub fn new(
        client: Arc<BungieClient>,
        tokens: Arc<TokenStore>,
        manifest: ManifestCache,
        guardian: Guardian,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (auth_tx, _) = watch::channel(false);
        Self {
            client,
            tokens,
            manifest,
            guardian,
            snapshot_tx,
            auth_tx,
            state: std::sync::RwLock::new(CoordinatorState::Idle),
            cycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Last published snapshot, non-blocking.
    pub fn current_snapshot(&self) -> Option<Arc<AccountSnapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot replacements.
    pub fn snapshot_updates(&self) -> watch::Receiver<Option<Arc<AccountSnapshot>>> {
        self.snapshot_tx.subscribe()
    }

    /// Whether the host needs to re-run the authorization flow.
    pub fn auth_required(&self) -> bool {
        *self.auth_tx.borrow()
    }

    /// Subscribe to the re-authorization signal.
    pub fn auth_updates(&self) -> watch::Receiver<bool> {
        self.auth_tx.subscribe()
    }

    pub fn state(&self) -> CoordinatorState {
        *self.state.read().expect("state lock poisoned")
    }

    fn set_state(&self, state: CoordinatorState) {
        *self.state.write().expect("state lock poisoned") = state;
    }

    /// Run one update cycle at `now`.
    ///
    /// Called by the scheduler every poll interval. If the previous
    /// cycle is still in flight the tick is coalesced, never queued.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::debug!("Previous cycle still running, tick coalesced");
            return CycleOutcome::Skipped;
        };

        self.set_state(CoordinatorState::TokenCheck);

        // Computed locally every cycle; current even when the fetch fails.
        let schedule = ResetSchedule::compute(now);

        let token = match self.tokens.ensure_valid(now).await {
            Ok(token) => token,
            Err(AppError::AuthExpired) => {
                tracing::error!("Refresh token rejected, re-authorization required");
                self.publish_carry_over(&schedule, SnapshotStatus::Error);
                self.set_state(CoordinatorState::AuthFailed);
                self.auth_tx.send_replace(true);
                return CycleOutcome::AuthFailed;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh failed, keeping last snapshot");
                self.publish_carry_over(&schedule, SnapshotStatus::Stale);
                self.set_state(CoordinatorState::Degraded);
                return CycleOutcome::Degraded;
            }
        };

        self.set_state(CoordinatorState::Fetching);

        match self.fetch_account_data(&token).await {
            Ok(payload) => {
                self.set_state(CoordinatorState::Merging);
                let snapshot = AccountSnapshot {
                    guardian: self.guardian.clone(),
                    vault_item_count: Some(payload.vault_count),
                    vault_max_capacity: VAULT_MAX_CAPACITY,
                    season_end: payload.season_end,
                    weekly_reset: schedule.weekly_reset,
                    daily_reset: schedule.daily_reset,
                    characters: Some(payload.roster),
                    rotators: payload.rotators,
                    fetched_at: Some(now),
                    status: SnapshotStatus::Ok,
                };
                self.snapshot_tx.send_replace(Some(Arc::new(snapshot)));
                self.auth_tx.send_replace(false);
                self.set_state(CoordinatorState::Published);
                tracing::debug!(
                    manifest_entries = self.manifest.len(),
                    "Cycle published fresh snapshot"
                );
                CycleOutcome::Published
            }
            Err(AppError::Unauthorized) => {
                // The server disagrees with our local expiry judgment;
                // force a refresh on the next cycle and degrade this one.
                tracing::warn!("Access token rejected upstream, forcing refresh next cycle");
                self.tokens.invalidate().await;
                self.publish_carry_over(&schedule, SnapshotStatus::Stale);
                self.set_state(CoordinatorState::Degraded);
                CycleOutcome::Degraded
            }
            Err(err) => {
                tracing::warn!(error = %err, "Account fetch failed, keeping last snapshot");
                self.publish_carry_over(&schedule, SnapshotStatus::Stale);
                self.set_state(CoordinatorState::Degraded);
                CycleOutcome::Degraded
            }
        }
    }

    /// Publish a snapshot that carries the previous cycle's data fields
    /// but fresh reset times. `fetched_at` is left untouched: the data is
    /// exactly as old as it was.
    fn publish_carry_over(&self, schedule: &ResetSchedule, status: SnapshotStatus) {
        let previous = self.snapshot_tx.borrow().clone();
        let snapshot = match previous {
            Some(previous) => AccountSnapshot {
                weekly_reset: schedule.weekly_reset,
                daily_reset: schedule.daily_reset,
                status,
                ..(*previous).clone()
            },
            None => AccountSnapshot {
                guardian: self.guardian.clone(),
                vault_item_count: None,
                vault_max_capacity: VAULT_MAX_CAPACITY,
                season_end: None,
                weekly_reset: schedule.weekly_reset,
                daily_reset: schedule.daily_reset,
                characters: None,
                rotators: Rotators::default(),
                fetched_at: None,
                status,
            },
        };
        self.snapshot_tx.send_replace(Some(Arc::new(snapshot)));
    }

    /// Fetch everything the snapshot needs in one pass. Any endpoint
    /// failure fails the whole fetch; the cycle then degrades as a unit.
    async fn fetch_account_data(&self, token: &OAuthToken) -> Result<RawAccountPayload, AppError> {
        let access = token.access_token.as_str();
        let membership_type = self.guardian.membership_type;
        let membership_id = self.guardian.membership_id.as_str();

        let (milestones, vault_count, characters) = tokio::try_join!(
            self.client.fetch_milestones(access),
            self.client
                .fetch_vault_count(access, membership_type, membership_id),
            self.client
                .fetch_characters(access, membership_type, membership_id),
        )?;

        let (season_end, rotators) = self.decode_milestones(milestones).await;
        let roster = self.decode_characters(characters).await;

        Ok(RawAccountPayload {
            vault_count,
            season_end,
            rotators,
            roster,
        })
    }

    /// Decode the milestone map into categorized rotators and the season
    /// end (latest milestone end date).
    async fn decode_milestones(
        &self,
        milestones: HashMap<String, MilestoneEntry>,
    ) -> (Option<DateTime<Utc>>, Rotators) {
        let mut rotators = Rotators::default();
        let mut season_end: Option<DateTime<Utc>> = None;

        for (milestone_hash, entry) in milestones {
            let name = self
                .manifest
                .display_name(manifest::DEF_MILESTONE, &milestone_hash)
                .await;

            let mut activity_name = None;
            let mut has_master = false;
            for activity in &entry.activities {
                if let Some(hash) = activity.activity_hash {
                    let act_name = self
                        .manifest
                        .display_name(manifest::DEF_ACTIVITY, &hash.to_string())
                        .await;
                    if act_name.contains("Master") {
                        has_master = true;
                    }
                    if activity_name.is_none() {
                        activity_name = Some(act_name);
                    }
                }
            }

            if let Some(end) = entry.end_date {
                season_end = Some(match season_end {
                    Some(current) if current >= end => current,
                    _ => end,
                });
            }

            let name_lower = name.to_lowercase();
            let rotator = Rotator {
                name,
                activity: activity_name,
                has_master,
                end_date: entry.end_date,
            };

            if RAID_KEYWORDS.iter().any(|kw| name_lower.contains(kw)) {
                rotators.raids.push(rotator);
            } else if DUNGEON_KEYWORDS.iter().any(|kw| name_lower.contains(kw)) {
                rotators.dungeons.push(rotator);
            } else if rotator.activity.is_some() && rotator.end_date.is_some() {
                rotators.other.push(rotator);
            }
        }

        (season_end, rotators)
    }

    /// Decode characters, count postmaster items, sort most recently
    /// played first.
    async fn decode_characters(&self, response: CharactersResponse) -> CharacterRoster {
        let characters_data = response
            .characters
            .and_then(|component| component.data)
            .unwrap_or_default();
        let inventories = response
            .character_inventories
            .and_then(|component| component.data)
            .unwrap_or_default();

        let mut characters = Vec::with_capacity(characters_data.len());
        let mut postmaster_critical = false;

        for (character_id, info) in characters_data {
            let class_name = self.hash_name(manifest::DEF_CLASS, info.class_hash).await;
            let race_name = self.hash_name(manifest::DEF_RACE, info.race_hash).await;
            let gender_name = self.hash_name(manifest::DEF_GENDER, info.gender_hash).await;

            let postmaster_count = inventories
                .get(&character_id)
                .map(|inventory| {
                    inventory
                        .items
                        .iter()
                        .filter(|item| item.bucket_hash == Some(BUCKET_POSTMASTER))
                        .count() as u32
                })
                .unwrap_or(0);

            if postmaster_count >= POSTMASTER_CRITICAL_THRESHOLD {
                postmaster_critical = true;
            }

            characters.push(CharacterSummary {
                character_id,
                class_name,
                race_name,
                gender_name,
                light: info.light,
                postmaster_count,
                last_played: info.date_last_played,
            });
        }

        characters.sort_by(|a, b| b.last_played.cmp(&a.last_played));

        CharacterRoster {
            count: characters.len(),
            postmaster_critical,
            characters,
        }
    }

    async fn hash_name(&self, definition_type: &str, hash: Option<u64>) -> String {
        match hash {
            Some(hash) => {
                self.manifest
                    .display_name(definition_type, &hash.to_string())
                    .await
            }
            None => "Unknown".to_string(),
        }
    }
}
