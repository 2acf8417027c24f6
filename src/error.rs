// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The refresh token itself was rejected; the host must run the
    /// authorization flow again. The only user-visible failure kind.
    #[error("Re-authorization required")]
    AuthExpired,

    /// The access token was rejected upstream despite looking valid
    /// locally (clock skew). Recovered by refreshing on the next cycle.
    #[error("Access token rejected by Bungie")]
    Unauthorized,

    #[error("Bungie API rate limit hit")]
    RateLimited,

    #[error("Bungie API unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed Bungie response: {0}")]
    MalformedResponse(String),

    /// No snapshot has been published yet.
    #[error("No account snapshot available yet")]
    NotReady,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Transient failures degrade the current cycle to a stale snapshot
    /// and are retried on the next scheduled tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited | AppError::Unreachable(_) | AppError::MalformedResponse(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::AuthExpired => (
                StatusCode::UNAUTHORIZED,
                "reauthorization_required",
                None,
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", None),
            AppError::Unreachable(msg) => {
                (StatusCode::BAD_GATEWAY, "bungie_unreachable", Some(msg.clone()))
            }
            AppError::MalformedResponse(msg) => {
                (StatusCode::BAD_GATEWAY, "bungie_error", Some(msg.clone()))
            }
            AppError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, "not_ready", None),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
