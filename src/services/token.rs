// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle management.
//!
//! Holds the single live token pair and refreshes it proactively before
//! expiry. Refresh is single-flight: concurrent callers serialize on one
//! lock and pick up the token installed by whichever task refreshed
//! first, so one expiry produces exactly one network refresh.

use crate::error::AppError;
use crate::models::OAuthToken;
use crate::services::BungieClient;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Owner of the current OAuth token.
///
/// The token lives in a single-writer/multi-reader cell and is replaced
/// by atomic swap; a failed refresh-token grant empties the cell, and
/// every later call fails fast with `AuthExpired` until the host
/// installs fresh credentials via [`TokenStore::replace`].
pub struct TokenStore {
    client: Arc<BungieClient>,
    current: RwLock<Option<Arc<OAuthToken>>>,
    /// Serializes refresh attempts (at most one in flight).
    refresh_lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(client: Arc<BungieClient>, initial: OAuthToken) -> Self {
        Self {
            client,
            current: RwLock::new(Some(Arc::new(initial))),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return a token guaranteed usable at `now`, refreshing if the
    /// current one is inside the safety margin.
    ///
    /// No retry happens here; a transient refresh failure is reported
    /// upward and the stale token is kept for the next attempt.
    pub async fn ensure_valid(&self, now: DateTime<Utc>) -> Result<Arc<OAuthToken>, AppError> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        // Fast path: current token still has headroom, no network call.
        match self.current.read().await.as_ref() {
            Some(token) if token.is_valid_at(now, margin) => return Ok(token.clone()),
            Some(_) => {}
            None => return Err(AppError::AuthExpired),
        }

        // Single-flight: one task refreshes, the rest wait here and pick
        // up the installed token on the re-check.
        let _guard = self.refresh_lock.lock().await;

        let stale = match self.current.read().await.as_ref() {
            Some(token) if token.is_valid_at(now, margin) => return Ok(token.clone()),
            Some(token) => token.clone(),
            None => return Err(AppError::AuthExpired),
        };

        tracing::info!("Access token expired, refreshing");

        let refreshed = match self.client.refresh_token(&stale.refresh_token).await {
            Ok(response) => response,
            Err(AppError::AuthExpired) => {
                // The refresh token itself is dead; drop the pair so the
                // host is asked to re-authorize.
                *self.current.write().await = None;
                return Err(AppError::AuthExpired);
            }
            Err(err) => return Err(err),
        };

        let refresh_token = refreshed
            .refresh_token
            .unwrap_or_else(|| stale.refresh_token.clone());
        let token = Arc::new(OAuthToken::new(
            refreshed.access_token,
            refresh_token,
            refreshed.expires_in,
            now,
        ));
        *self.current.write().await = Some(token.clone());

        tracing::info!("Token refreshed");
        Ok(token)
    }

    /// Force the current token to be treated as expired so the next
    /// `ensure_valid` refreshes.
    ///
    /// Used when the remote API rejects an access token that still looks
    /// valid locally (clock skew between us and the server).
    pub async fn invalidate(&self) {
        let mut guard = self.current.write().await;
        if let Some(token) = guard.as_ref() {
            let mut stale = (**token).clone();
            stale.expires_at = DateTime::<Utc>::UNIX_EPOCH;
            *guard = Some(Arc::new(stale));
        }
    }

    /// Install fresh credentials after the host re-runs the
    /// authorization flow.
    pub async fn replace(&self, token: OAuthToken) {
        *self.current.write().await = Some(Arc::new(token));
    }
}
