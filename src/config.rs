//! Application configuration loaded from environment variables.
//!
//! Credentials (API key, OAuth client pair, stored tokens) are supplied by
//! the host's secret store as environment variables and read once at
//! startup.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Bungie application credentials ---
    /// Bungie API key (sent as X-API-Key on every request)
    pub bungie_api_key: String,
    /// OAuth client ID
    pub bungie_client_id: String,
    /// OAuth client secret
    pub bungie_client_secret: String,

    // --- Stored OAuth tokens from the authorization handshake ---
    /// Current access token
    pub access_token: String,
    /// Current refresh token
    pub refresh_token: String,
    /// Declared access token lifetime in seconds
    pub token_expires_in: i64,

    // --- Account identity ---
    /// Destiny membership ID scoping profile queries
    pub membership_id: String,
    /// Destiny membership type (-1 auto-resolves cross-save)
    pub membership_type: i32,
    /// Full Bungie name (Name#1234)
    pub bungie_name: String,
    /// Display name without the discriminator
    pub display_name: String,

    // --- Daemon settings ---
    /// Server port
    pub port: u16,
    /// Poll cadence in minutes
    pub update_interval_minutes: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development a `.env` file is honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            bungie_api_key: env::var("BUNGIE_API_KEY")
                .map_err(|_| ConfigError::Missing("BUNGIE_API_KEY"))?,
            bungie_client_id: env::var("BUNGIE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("BUNGIE_CLIENT_ID"))?,
            bungie_client_secret: env::var("BUNGIE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("BUNGIE_CLIENT_SECRET"))?,

            access_token: env::var("BUNGIE_ACCESS_TOKEN")
                .map_err(|_| ConfigError::Missing("BUNGIE_ACCESS_TOKEN"))?,
            refresh_token: env::var("BUNGIE_REFRESH_TOKEN")
                .map_err(|_| ConfigError::Missing("BUNGIE_REFRESH_TOKEN"))?,
            token_expires_in: env::var("BUNGIE_TOKEN_EXPIRES_IN")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("BUNGIE_TOKEN_EXPIRES_IN"))?,

            membership_id: env::var("BUNGIE_MEMBERSHIP_ID")
                .map_err(|_| ConfigError::Missing("BUNGIE_MEMBERSHIP_ID"))?,
            membership_type: env::var("BUNGIE_MEMBERSHIP_TYPE")
                .unwrap_or_else(|_| "-1".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("BUNGIE_MEMBERSHIP_TYPE"))?,
            bungie_name: env::var("BUNGIE_NAME").unwrap_or_else(|_| "Unknown".to_string()),
            display_name: env::var("BUNGIE_DISPLAY_NAME")
                .unwrap_or_else(|_| "Unknown".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            update_interval_minutes: env::var("UPDATE_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("UPDATE_INTERVAL_MINUTES"))?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            bungie_api_key: "test-api-key".to_string(),
            bungie_client_id: "test-client-id".to_string(),
            bungie_client_secret: "test-secret".to_string(),
            access_token: "test-access".to_string(),
            refresh_token: "test-refresh".to_string(),
            token_expires_in: 3600,
            membership_id: "4611686018467260757".to_string(),
            membership_type: 3,
            bungie_name: "TestGuardian#1234".to_string(),
            display_name: "TestGuardian".to_string(),
            port: 8080,
            update_interval_minutes: 15,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("BUNGIE_API_KEY", "test_key");
        env::set_var("BUNGIE_CLIENT_ID", "test_id");
        env::set_var("BUNGIE_CLIENT_SECRET", "test_secret");
        env::set_var("BUNGIE_ACCESS_TOKEN", "test_access");
        env::set_var("BUNGIE_REFRESH_TOKEN", "test_refresh");
        env::set_var("BUNGIE_MEMBERSHIP_ID", "12345");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.bungie_api_key, "test_key");
        assert_eq!(config.membership_id, "12345");
        assert_eq!(config.membership_type, -1);
        assert_eq!(config.update_interval_minutes, 15);
        assert_eq!(config.port, 8080);
    }
}
