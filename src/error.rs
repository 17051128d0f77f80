use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Startup configuration failures. Any of these aborts `main`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("backend URL missing: set PUBLIC_SUPABASE_URL or SUPABASE_URL")]
    MissingUrl,

    #[error("backend anon key missing: set PUBLIC_SUPABASE_ANON_KEY or SUPABASE_ANON_KEY")]
    MissingAnonKey,

    #[error("PORT is not a valid port number: {0}")]
    InvalidPort(String),
}

/// BackendError
///
/// Failures talking to the hosted platform (auth, PostgREST).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no session tokens to install")]
    MissingSession,

    #[error("access token could not be decoded: {0}")]
    MalformedToken(#[from] jsonwebtoken::errors::Error),

    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend answered {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl BackendError {
    /// True when the platform refused the session itself (bad, expired or revoked
    /// tokens) as opposed to the call failing for an unrelated reason.
    pub fn is_session_rejection(&self) -> bool {
        match self {
            BackendError::MissingSession | BackendError::MalformedToken(_) => true,
            BackendError::Api { status, .. } => matches!(status, 400 | 401 | 403 | 422),
            BackendError::Transport(_) => false,
        }
    }
}

/// ApiError
///
/// Error returned by the JSON data handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Backend(e) => {
                tracing::error!(error = %e, "backend call failed");
                StatusCode::BAD_GATEWAY
            }
        };

        let message = match &self {
            // Backend details stay in the logs.
            ApiError::Backend(_) => "upstream error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
