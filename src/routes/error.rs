//! HTTP mapping for mutation errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::event::ErrorCode;
use crate::services::mutation::MutationError;

/// Handler error: a `MutationError` rendered as `{code, message, retryable}`.
#[derive(Debug)]
pub struct ApiError(pub MutationError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    retryable: bool,
}

impl From<MutationError> for ApiError {
    fn from(err: MutationError) -> Self {
        Self(err)
    }
}

pub(crate) fn error_to_status(err: &MutationError) -> StatusCode {
    match err {
        MutationError::NotFound { .. } => StatusCode::NOT_FOUND,
        MutationError::Forbidden(_) => StatusCode::FORBIDDEN,
        MutationError::Position(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MutationError::Validation(_) => StatusCode::BAD_REQUEST,
        MutationError::Conflict(_) => StatusCode::CONFLICT,
        MutationError::Contention(_) => StatusCode::SERVICE_UNAVAILABLE,
        MutationError::Database(_) if err.retryable() => StatusCode::SERVICE_UNAVAILABLE,
        MutationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = error_to_status(&self.0);
        if status.is_server_error() {
            error!(code = self.0.error_code(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            code: self.0.error_code(),
            message: self.0.to_string(),
            retryable: self.0.retryable(),
        };
        (status, Json(body)).into_response()
    }
}
