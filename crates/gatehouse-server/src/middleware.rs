use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::AppState;

/// Middleware that admits only requests with a valid session token.
///
/// On success the resolved `AuthenticatedUser` is stored in the request
/// extensions for handlers to extract.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // A header that is not valid UTF-8 cannot carry a bearer token.
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().unwrap_or("invalid")),
        None => None,
    };

    let authenticated = state.gate.authorize(header).await?;
    request.extensions_mut().insert(authenticated);

    Ok(next.run(request).await)
}
