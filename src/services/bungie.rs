// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bungie.net API client.
//!
//! Handles:
//! - Profile, vault, and milestone fetching
//! - Manifest definition lookups
//! - OAuth2 token refresh
//! - Auth and rate limit error classification
//!
//! Every method performs exactly one request attempt and reports the
//! outcome verbatim; retry timing belongs to the update coordinator.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Bound on every request so a hung endpoint cannot stall the poll cadence.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Inventory bucket holding postmaster ("lost") items.
pub const BUCKET_POSTMASTER: u64 = 215_593_132;

/// Bungie API client.
#[derive(Clone)]
pub struct BungieClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    api_key: String,
    client_id: String,
    client_secret: String,
}

impl BungieClient {
    /// Create a new Bungie client with API key and OAuth credentials.
    pub fn new(api_key: String, client_id: String, client_secret: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("HTTP client construction with static options");

        Self {
            http,
            base_url: "https://www.bungie.net/Platform".to_string(),
            token_url: "https://www.bungie.net/Platform/App/OAuth/Token/".to_string(),
            api_key,
            client_id,
            client_secret,
        }
    }

    /// Point both endpoints at a different origin (tests use a local
    /// stand-in server).
    pub fn with_base_url(mut self, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        self.base_url = format!("{origin}/Platform");
        self.token_url = format!("{origin}/Platform/App/OAuth/Token/");
        self
    }

    /// Refresh an expired access token (OAuth2 refresh-token grant).
    ///
    /// Rejection by the authorization server means the refresh token
    /// itself is dead and surfaces as `AuthExpired`; transport failures
    /// stay transient.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token refresh rejected");
            return Err(AppError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Unreachable(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MalformedResponse(format!("token response: {}", e)))
    }

    /// Fetch the current milestone map (season end and rotator source).
    pub async fn fetch_milestones(
        &self,
        access_token: &str,
    ) -> Result<HashMap<String, MilestoneEntry>, AppError> {
        let url = format!("{}/Destiny2/Milestones/", self.base_url);
        self.get_json(&url, access_token).await
    }

    /// Count items in the account vault (profile inventory, component 102).
    pub async fn fetch_vault_count(
        &self,
        access_token: &str,
        membership_type: i32,
        membership_id: &str,
    ) -> Result<u32, AppError> {
        let url = format!(
            "{}/Destiny2/{}/Profile/{}/?components=102",
            self.base_url, membership_type, membership_id
        );
        let profile: ProfileInventoryResponse = self.get_json(&url, access_token).await?;

        let items = profile
            .profile_inventory
            .and_then(|component| component.data)
            .map(|inventory| inventory.items)
            .ok_or_else(|| {
                AppError::MalformedResponse("profile inventory missing from response".to_string())
            })?;

        Ok(items.len() as u32)
    }

    /// Fetch characters and their inventories (components 200,201).
    pub async fn fetch_characters(
        &self,
        access_token: &str,
        membership_type: i32,
        membership_id: &str,
    ) -> Result<CharactersResponse, AppError> {
        let url = format!(
            "{}/Destiny2/{}/Profile/{}/?components=200,201",
            self.base_url, membership_type, membership_id
        );
        self.get_json(&url, access_token).await
    }

    /// Look up a manifest definition by hash. Manifest endpoints only
    /// need the API key, not a bearer token.
    pub async fn get_manifest_definition(
        &self,
        definition_type: &str,
        hash: &str,
    ) -> Result<ManifestDefinition, AppError> {
        let url = format!(
            "{}/Destiny2/Manifest/{}/{}/",
            self.base_url, definition_type, hash
        );
        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(request_error)?;

        self.check_response_json(response).await
    }

    /// Generic authenticated GET with envelope unwrapping.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .header("X-API-Key", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(request_error)?;

        self.check_response_json(response).await
    }

    /// Check status and unwrap the Bungie `Response` envelope.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Bungie rate limit hit (429)");
                return Err(AppError::RateLimited);
            }

            if status.as_u16() == 401 {
                return Err(AppError::Unauthorized);
            }

            return Err(AppError::Unreachable(format!("HTTP {}: {}", status, body)));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| AppError::MalformedResponse(format!("JSON parse error: {}", e)))?;

        envelope
            .response
            .ok_or_else(|| AppError::MalformedResponse("missing Response envelope".to_string()))
    }
}

/// Classify a transport-level failure. Timeouts and connection errors
/// are indistinguishable from an unreachable endpoint.
fn request_error(err: reqwest::Error) -> AppError {
    AppError::Unreachable(err.to_string())
}

/// Token refresh response from the Bungie OAuth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    /// Bungie may omit this on renewal; the caller keeps the old one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Standard Bungie envelope: payloads live under `Response`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "Response")]
    response: Option<T>,
}

/// One milestone from the milestones map.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneEntry {
    #[serde(default)]
    pub activities: Vec<MilestoneActivity>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneActivity {
    pub activity_hash: Option<u64>,
}

/// Profile response, component 102 (profile inventory).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileInventoryResponse {
    profile_inventory: Option<ComponentData<ItemList>>,
}

/// Bungie component wrapper; `data` may be withheld by privacy settings.
#[derive(Debug, Deserialize)]
pub struct ComponentData<T> {
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemList {
    #[serde(default)]
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub bucket_hash: Option<u64>,
}

/// Profile response, components 200,201 (characters + inventories).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharactersResponse {
    pub characters: Option<ComponentData<HashMap<String, CharacterData>>>,
    pub character_inventories: Option<ComponentData<HashMap<String, ItemList>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterData {
    pub class_hash: Option<u64>,
    pub race_hash: Option<u64>,
    pub gender_hash: Option<u64>,
    #[serde(default)]
    pub light: u32,
    pub date_last_played: Option<DateTime<Utc>>,
}

/// Manifest definition payload; only the display name is consumed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDefinition {
    pub display_properties: Option<DisplayProperties>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayProperties {
    pub name: Option<String>,
}
