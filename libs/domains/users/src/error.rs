use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("User not found with email: {0}")]
    EmailNotFound(String),

    #[error("Email already exists: {0}")]
    EmailTaken(String),

    /// Same message for unknown email and wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid role: {0}. Must be 'admin' or 'client'")]
    InvalidRole(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) | UserError::EmailNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            UserError::EmailTaken(_) => AppError::Conflict(err.to_string()),
            UserError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            UserError::InvalidRole(_) => AppError::BadRequest(err.to_string()),
            UserError::Validation(errors) => AppError::ValidationError(errors),
            UserError::StoreUnavailable(_) => AppError::ServiceUnavailable(err.to_string()),
            UserError::Store(_) | UserError::Hashing(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
