//! JSON error responses.
//!
//! Every failing handler answers `{ "error": "<message>" }` with a status
//! chosen from the service error. Server-side failures are logged here and
//! replaced with a generic message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::error;

use crate::services::auth::AuthError;
use crate::services::directory::DirectoryError;
use crate::services::finance::FinanceError;
use crate::services::students::StudentError;
use crate::services::users::UserAdminError;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication required")
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "you do not have access to this resource")
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "database temporarily unavailable, try again")
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

// =============================================================================
// EXTRACTOR REJECTIONS
// =============================================================================

// Malformed bodies, ids and query strings keep axum's status and message
// but use the JSON error body.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

// =============================================================================
// SERVICE ERROR MAPPING
// =============================================================================

pub(crate) fn store_error_to_api(err: StoreError) -> ApiError {
    if let StoreError::UnknownColumn { .. } = err {
        return ApiError::bad_request(err.to_string());
    }
    if err.is_unavailable() {
        error!(error = %err, "store unavailable after retries");
        return ApiError::unavailable();
    }
    if err.is_unique_violation() {
        return ApiError::new(StatusCode::CONFLICT, "a row with these values already exists");
    }
    if err.is_constraint_violation() {
        return ApiError::bad_request("referenced row does not exist or value not allowed");
    }
    error!(error = %err, "store call failed");
    ApiError::internal()
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        store_error_to_api(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        store_error_to_api(StoreError::Database(err))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            AuthError::InvalidEmail | AuthError::WeakPassword | AuthError::MissingName => Self::bad_request(err.to_string()),
            AuthError::EmailTaken => Self::new(StatusCode::CONFLICT, err.to_string()),
            AuthError::Hash(e) => {
                error!(error = %e, "password hashing failed");
                Self::internal()
            }
            AuthError::Store(e) => store_error_to_api(e),
        }
    }
}

impl From<FinanceError> for ApiError {
    fn from(err: FinanceError) -> Self {
        match err {
            FinanceError::InvalidAmount | FinanceError::MissingDescription | FinanceError::InvalidReference => {
                Self::bad_request(err.to_string())
            }
            FinanceError::AlreadyPaid => Self::new(StatusCode::CONFLICT, err.to_string()),
            FinanceError::NotFound(what) => Self::not_found(what),
            FinanceError::Store(e) => store_error_to_api(e),
        }
    }
}

impl From<StudentError> for ApiError {
    fn from(err: StudentError) -> Self {
        match err {
            StudentError::MissingField(_) | StudentError::InvalidReference => Self::bad_request(err.to_string()),
            StudentError::DuplicateStudentId => Self::new(StatusCode::CONFLICT, err.to_string()),
            StudentError::NotFound => Self::not_found("student"),
            StudentError::Store(e) => store_error_to_api(e),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::MissingField(_) | DirectoryError::InvalidReference | DirectoryError::AdviserNotTeacher => {
                Self::bad_request(err.to_string())
            }
            DirectoryError::Duplicate(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            DirectoryError::NotFound(what) => Self::not_found(what),
            DirectoryError::Store(e) => store_error_to_api(e),
        }
    }
}

impl From<UserAdminError> for ApiError {
    fn from(err: UserAdminError) -> Self {
        match err {
            UserAdminError::SelfDemotion | UserAdminError::SelfDeactivation => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            UserAdminError::MissingName => Self::bad_request(err.to_string()),
            UserAdminError::NotFound => Self::not_found("user"),
            UserAdminError::Auth(e) => e.into(),
            UserAdminError::Store(e) => store_error_to_api(e),
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
