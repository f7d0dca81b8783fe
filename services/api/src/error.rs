//! Error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error type returned by the handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid login session
    #[error("Unauthorized")]
    Unauthorized,

    /// Wrong login or password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Entity missing or owned by someone else
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A payload field failed validation
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A unique value is already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl From<corkboard::Error> for ApiError {
    fn from(err: corkboard::Error) -> Self {
        use corkboard::Error;

        match err {
            Error::BoardNotFound => ApiError::NotFound("Board"),
            Error::ListNotFound => ApiError::NotFound("List"),
            Error::CardNotFound => ApiError::NotFound("Card"),
            Error::UserNotFound => ApiError::NotFound("User"),
            Error::SessionNotFound => ApiError::NotFound("Session"),
            Error::NotAuthenticated => ApiError::Unauthorized,
            Error::InvalidCredentials => ApiError::InvalidCredentials,
            Error::EmailConflict => {
                ApiError::Conflict("Email address is already registered".to_string())
            }
            Error::Conflict(index) => ApiError::Conflict(index),
            other => {
                error!("Request failed: {}", other);
                ApiError::InternalServerError
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            ApiError::Validation { field, message } => json!({
                "error": self.to_string(),
                "field": field,
                "message": message,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
