use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::rest::dto::MessageEnvelope;
use crate::domain::error::DomainError;

pub const MSG_INVALID_PAYLOAD: &str = "Invalid payload";
pub const MSG_EMAIL_EXISTS: &str = "Sorry. That email already exists.";
pub const MSG_USER_NOT_FOUND: &str = "User does not exist";
pub const MSG_INTERNAL: &str = "Internal server error";

/// Error returned by REST and web handlers; renders the `fail` envelope.
#[derive(Debug)]
pub enum ApiError {
    /// Body could not be read as the expected JSON document.
    InvalidPayload(String),
    Domain(DomainError),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidPayload(rejection.body_text())
    }
}

/// Map a domain error to status + public message. Internal details are
/// logged here and never sent to the client.
pub fn map_domain_error(e: &DomainError) -> (StatusCode, &'static str) {
    match e {
        DomainError::Validation { .. } => (StatusCode::BAD_REQUEST, MSG_INVALID_PAYLOAD),
        DomainError::EmailAlreadyExists { .. } => (StatusCode::BAD_REQUEST, MSG_EMAIL_EXISTS),
        DomainError::UserNotFound { .. } => (StatusCode::NOT_FOUND, MSG_USER_NOT_FOUND),
        DomainError::Database { .. } => {
            tracing::error!(error = %e, "Database error occurred");
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidPayload(reason) => {
                tracing::debug!(%reason, "Rejected request body");
                (StatusCode::BAD_REQUEST, MSG_INVALID_PAYLOAD)
            }
            ApiError::Domain(e) => map_domain_error(e),
        };

        (status, Json(MessageEnvelope::fail(message))).into_response()
    }
}
