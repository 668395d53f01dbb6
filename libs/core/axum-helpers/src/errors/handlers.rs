use axum::response::{IntoResponse, Response};

use super::{ErrorCode, ErrorResponse};

/// Fallback for unmatched routes, rendered with the shared error envelope.
pub async fn not_found() -> Response {
    ErrorResponse::new(ErrorCode::NotFound, "The requested resource was not found")
        .into_response_with(ErrorCode::NotFound)
}
