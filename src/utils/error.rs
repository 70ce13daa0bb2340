//! Error types and handling
//!
//! Every core operation returns [`AppResult`]. The interaction layer turns an
//! error into a short user-facing message; the HTTP layer turns it into a JSON
//! error body. Neither leaks storage or platform internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Role or ownership check failed (403)
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Actor has no active session (401)
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// No such key, API key or entitlement (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate code, already redeemed, already logged in (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad duration, amount or identifier (400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation switched off for this deployment (403)
    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    /// Chat platform call failed (502)
    #[error("Platform error: {0}")]
    Platform(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_authorized(msg: impl Into<String>) -> Self {
        AppError::NotAuthorized(msg.into())
    }

    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        AppError::NotAuthenticated(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn feature_disabled(msg: impl Into<String>) -> Self {
        AppError::FeatureDisabled(msg.into())
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        AppError::Platform(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable identifier used in JSON bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotAuthorized(_) => "not_authorized",
            AppError::NotAuthenticated(_) => "not_authenticated",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::FeatureDisabled(_) => "feature_disabled",
            AppError::Platform(_) => "platform_error",
            AppError::Database(_) => "database_error",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show to the actor who triggered the operation.
    ///
    /// Domain errors carry their own wording; infrastructure errors collapse
    /// to a generic line.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotAuthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidInput(msg)
            | AppError::FeatureDisabled(msg) => msg.clone(),
            AppError::NotAuthenticated(_) => {
                "Authentication required. Use /login <apikey> with the API key you received."
                    .to_string()
            }
            AppError::Platform(_) => "The chat platform did not accept the request.".to_string(),
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                "Something went wrong. Please try again later.".to_string()
            }
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(
            self,
            AppError::Platform(_)
                | AppError::Database(_)
                | AppError::Config(_)
                | AppError::Internal(_)
        )
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotAuthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::FeatureDisabled(_) => StatusCode::FORBIDDEN,
            AppError::Platform(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if self.is_server_error() {
            error!(error = %self, error_type = self.kind(), "Request error");
        }

        let body = ErrorResponse::new(self.kind(), self.user_message());

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Repository errors arrive wrapped in anyhow context
        match err.downcast::<sqlx::Error>() {
            Ok(sqlx_err) => sqlx_err.into(),
            Err(err) => AppError::Internal(format!("{:#}", err)),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.message().contains("UNIQUE constraint failed") {
                    AppError::Conflict("Resource already exists".to_string())
                } else {
                    AppError::Database(db_err.to_string())
                }
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Platform("Platform request timed out".to_string())
        } else if err.is_connect() {
            AppError::Platform("Failed to connect to the platform API".to_string())
        } else {
            AppError::Platform(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("Malformed payload: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Result type alias for core operations and handlers
pub type AppResult<T> = Result<T, AppError>;
