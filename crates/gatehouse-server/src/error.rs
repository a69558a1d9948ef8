//! JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gatehouse_auth::AuthError;
use gatehouse_identity::IdentityError;
use serde_json::json;

/// Error returned by handlers and the gate middleware.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub AuthError);

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        ApiError(AuthError::Identity(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        } else {
            tracing::debug!(error = %err, status = status.as_u16(), "Request rejected");
        }

        let body = Json(json!({
            "error": err.error_code(),
            "message": err.public_message(),
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
