//! Custom error types for the API service

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
///
/// The `Display` text of each variant is the description returned to the
/// caller.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    #[error("Begin date is greater than end date.")]
    InvalidTimeWindow,

    #[error("Event duration cant be shorter than 15 minutes.")]
    DurationTooShort,

    #[error("Begin and end date have to be the same.")]
    CrossDayEvent,

    #[error("Invalid begin date.")]
    BeginNotInFuture,

    #[error("Invalid value for roomId parameter.")]
    RoomNotFound,

    #[error("Invalid value for eventId parameter.")]
    EventNotFound,

    #[error("{0}")]
    UserNotFound(String),

    #[error("Event date collides with an already existing event.")]
    SchedulingConflict,

    #[error("User with provided email is already assigned.")]
    AlreadyParticipant,

    /// Wrong edit secret on an event patch
    #[error("Invalid password")]
    InvalidPassword,

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed or expired credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to do this
    #[error("{0}")]
    Forbidden(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) | ApiError::Forbidden(_) => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            ApiError::Database(e) => {
                error!("Storage failure: {}", e);
                "Database error".to_string()
            }
            ApiError::Internal(e) => {
                error!("Internal failure: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::SchedulingConflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::EventNotFound.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidPassword.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Unauthorized("Invalid token.".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("nope".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let response = ApiError::Internal(anyhow::anyhow!("secret detail")).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret detail"));
        assert!(text.contains("Internal server error"));
    }
}
