//! OAuth token model.

use chrono::{DateTime, Duration, Utc};

/// A Bungie OAuth2 token pair with its computed expiry.
///
/// Owned exclusively by the token store and replaced wholesale on
/// refresh, never mutated field-by-field. Deliberately not serializable.
#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Instant the access token stops being usable
    /// (issuance + server-declared lifetime).
    pub expires_at: DateTime<Utc>,
}

impl OAuthToken {
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in_secs: i64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: issued_at + Duration::seconds(expires_in_secs),
        }
    }

    /// Whether the token is still usable at `now` with `margin` of
    /// headroom left before expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}
