//! HTTP error translation.
//!
//! Every service error converts into an [`ApiError`], which renders as a
//! status code plus `{"error": "<message>"}`. Internal failures are logged
//! here and answered with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::rate_limit::RateLimitError;
use crate::services::account::AccountError;
use crate::services::grant::GrantError;
use crate::services::members::MemberError;
use crate::services::organization::OrgError;
use crate::services::password_reset::ResetError;

const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "not signed in")
    }

    pub fn no_membership() -> Self {
        Self::new(StatusCode::FORBIDDEN, "no organization membership")
    }

    /// Log `err` and hide it behind a generic 500.
    pub fn internal(err: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %err, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(&err)
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidEmail
            | AccountError::PasswordTooShort
            | AccountError::PasswordMismatch
            | AccountError::NameRequired => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            AccountError::EmailTaken => Self::new(StatusCode::CONFLICT, err.to_string()),
            AccountError::InvalidCredentials | AccountError::CurrentPasswordIncorrect => {
                Self::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            AccountError::Hash(_) | AccountError::Db(_) => Self::internal(&err),
        }
    }
}

impl From<ResetError> for ApiError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::InvalidEmail | ResetError::InvalidToken => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            ResetError::Account(inner) => inner.into(),
            ResetError::Db(_) | ResetError::EmailDelivery(_) => Self::internal(&err),
        }
    }
}

impl From<OrgError> for ApiError {
    fn from(err: OrgError) -> Self {
        match err {
            OrgError::NameRequired | OrgError::InvalidInviteCode => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            OrgError::AlreadyMember => Self::new(StatusCode::CONFLICT, err.to_string()),
            OrgError::Database(_) => Self::internal(&err),
        }
    }
}

impl From<GrantError> for ApiError {
    fn from(err: GrantError) -> Self {
        match err {
            GrantError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            GrantError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "grant not found"),
            GrantError::Forbidden => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            GrantError::Database(_) => Self::internal(&err),
        }
    }
}

impl From<MemberError> for ApiError {
    fn from(err: MemberError) -> Self {
        match err {
            MemberError::Forbidden => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            MemberError::CannotModifySelf | MemberError::InvalidRole(_) => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            MemberError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "member not found"),
            MemberError::Database(_) => Self::internal(&err),
        }
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, err.to_string())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
