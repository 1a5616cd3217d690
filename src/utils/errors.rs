//! Unified error handling for the store service.
//!
//! Two layers:
//!
//! 1. **Internal** (`StoreServiceError`): the single error type business
//!    logic returns, built with `thiserror`.
//! 2. **Public** (`ApiError`): the `{status, message}` JSON body and HTTP
//!    status code the client sees. Conversion happens in one place,
//!    `impl From<StoreServiceError> for ApiError`.
//!
//! Expected negative outcomes of the two protocols (expired token, rejected
//! payment) are NOT errors; they are enumerated results the handlers branch
//! on. Errors here are the genuinely exceptional paths: store failures,
//! bad configuration, invalid input, failed e-mail delivery.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

// =============================================================================
// INTERNAL LAYER
// =============================================================================

/// The unified error type for the whole service.
#[derive(Debug, Error)]
pub enum StoreServiceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid value for field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{field}: {message}")]
    Conflict { field: String, message: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Email delivery failed: {0}")]
    EmailDelivery(String),
}

impl StoreServiceError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        StoreServiceError::Configuration(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        StoreServiceError::Database(msg.into())
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        StoreServiceError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        StoreServiceError::NotFound {
            resource: resource.to_string(),
        }
    }

    pub fn conflict(field: &str, message: impl Into<String>) -> Self {
        StoreServiceError::Conflict {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        StoreServiceError::Forbidden(msg.into())
    }

    pub fn email(msg: impl Into<String>) -> Self {
        StoreServiceError::EmailDelivery(msg.into())
    }
}

impl From<diesel::result::Error> for StoreServiceError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => StoreServiceError::not_found("Record"),
            other => StoreServiceError::database(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for StoreServiceError {
    fn from(err: r2d2::Error) -> Self {
        StoreServiceError::database(format!("Connection pool error: {}", err))
    }
}

// =============================================================================
// PUBLIC LAYER
// =============================================================================

/// Enum for API error statuses, serialized to `snake_case` in responses.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatus {
    ValidationError,
    UniqueConstraintError,
    NotFound,
    Forbidden,
    EmailDeliveryError,
    ConfigurationError,
    InternalError,
}

/// Standardized JSON error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: ApiStatus,
    pub message: String,
}

impl ApiError {
    fn http_status(&self) -> StatusCode {
        match self.status {
            ApiStatus::ValidationError => StatusCode::BAD_REQUEST,
            ApiStatus::UniqueConstraintError => StatusCode::CONFLICT,
            ApiStatus::NotFound => StatusCode::NOT_FOUND,
            ApiStatus::Forbidden => StatusCode::FORBIDDEN,
            ApiStatus::EmailDeliveryError => StatusCode::BAD_GATEWAY,
            ApiStatus::ConfigurationError | ApiStatus::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreServiceError> for ApiError {
    fn from(err: StoreServiceError) -> Self {
        let status = match &err {
            StoreServiceError::Validation { .. } => ApiStatus::ValidationError,
            StoreServiceError::Conflict { .. } => ApiStatus::UniqueConstraintError,
            StoreServiceError::NotFound { .. } => ApiStatus::NotFound,
            StoreServiceError::Forbidden(_) => ApiStatus::Forbidden,
            StoreServiceError::EmailDelivery(_) => ApiStatus::EmailDeliveryError,
            StoreServiceError::Configuration(_) => ApiStatus::ConfigurationError,
            StoreServiceError::Database(_) => ApiStatus::InternalError,
        };

        match status {
            ApiStatus::ConfigurationError | ApiStatus::InternalError => {
                error!("{}", err);
            }
            _ => {
                warn!("{}", err);
            }
        }

        // Internal details stay in the logs, not in the response body.
        let message = match &err {
            StoreServiceError::Database(_) => "Internal server error".to_string(),
            StoreServiceError::Configuration(_) => "Service misconfigured".to_string(),
            other => other.to_string(),
        };

        ApiError { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for StoreServiceError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
