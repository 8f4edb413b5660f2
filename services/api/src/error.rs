//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is rendered as an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use debaide_core::error::ArenaError;
use debaide_core::ports::PortError;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A rejection from the debate engine.
    #[error("{0}")]
    Arena(#[from] ArenaError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed migrations at startup.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request itself is malformed (bad multipart body, missing field).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing, unknown or expired credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Arena(err) => match err {
                ArenaError::NotFound(_) => StatusCode::NOT_FOUND,
                ArenaError::InvalidState(_) => StatusCode::CONFLICT,
                ArenaError::InvalidInput(_) | ArenaError::InvalidKind(_) => StatusCode::BAD_REQUEST,
                ArenaError::Forbidden(_) => StatusCode::FORBIDDEN,
                ArenaError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
                ArenaError::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
                ArenaError::Port(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Port(PortError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Port(PortError::Unauthorized) | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The machine-readable label sent as `error`.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Arena(err) => err.kind(),
            ApiError::Port(PortError::NotFound(_)) => "not_found",
            ApiError::Port(PortError::Conflict(_)) => "invalid_state",
            ApiError::Port(PortError::Unauthorized) | ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "invalid_input",
            _ => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the log.
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "An unexpected internal error occurred".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": self.kind(), "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_errors_map_to_distinct_statuses() {
        let cases = [
            (ArenaError::NotFound("Battle".into()), StatusCode::NOT_FOUND),
            (ArenaError::InvalidState("Current segment is rebuttal".into()), StatusCode::CONFLICT),
            (ArenaError::InvalidInput("Text cannot be empty".into()), StatusCode::BAD_REQUEST),
            (ArenaError::InvalidKind("preamble".into()), StatusCode::BAD_REQUEST),
            (ArenaError::Forbidden("not your turn".into()), StatusCode::FORBIDDEN),
            (ArenaError::UpstreamFailure("bad json".into()), StatusCode::BAD_GATEWAY),
            (ArenaError::Port(PortError::Unexpected("pool".into())), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn port_errors_keep_their_meaning() {
        assert_eq!(ApiError::from(PortError::Unauthorized).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(PortError::Conflict("taken".into())).kind(), "invalid_state");
        assert_eq!(ApiError::Internal("boom".into()).kind(), "internal");
    }

    #[test]
    fn responses_carry_the_status() {
        let response = ApiError::from(ArenaError::Forbidden("It's not your turn".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
