//! Unified API error handling.
//!
//! Every failure leaves the API as `{success: false, message: ...}` so
//! clients can treat all errors uniformly except for message display.
//! Credential and permission failures become 401/403; only unexpected
//! upstream failures surface as 500, and never with internals beyond
//! the underlying error message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

/// The error body shape shared by every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Bad request (400)
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Unauthorized (401) - authentication required or failed
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Forbidden (403) - authenticated but not allowed
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Not found (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Conflict (409) - resource already exists
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Internal server error (500)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential(message) => ApiError::unauthorized(message),
            AuthError::InvalidCredential(message) => ApiError::unauthorized(message),
            AuthError::ExpiredCredential => ApiError::unauthorized("Token expired"),
            AuthError::MalformedCredential => ApiError::unauthorized("Invalid token"),
            AuthError::AccountInactive => ApiError::unauthorized("Account is deactivated"),
            AuthError::AccountNotFound => {
                ApiError::unauthorized("User not found or account deactivated")
            }
            AuthError::PermissionDenied => ApiError::forbidden("Insufficient permissions"),
            AuthError::Conflict(message) => ApiError::conflict(message),
            AuthError::Upstream(detail) => {
                tracing::error!("Upstream failure: {detail}");
                ApiError::internal(detail)
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {err}");
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE constraint") => {
                ApiError::conflict("A resource with this identifier already exists")
            }
            _ => ApiError::internal("A database error occurred"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        let cases = [
            (
                ApiError::from(AuthError::MissingCredential("Access token required")),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(AuthError::ExpiredCredential),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(AuthError::PermissionDenied),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::from(AuthError::Conflict("exists".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(AuthError::Upstream("db down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn body_shape_is_success_false_plus_message() {
        let err = ApiError::unauthorized("Token expired");
        let body = ErrorResponse {
            success: false,
            message: err.message().to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Token expired");
    }
}
