//! OAuth login routes.
//!
//! `GET /auth/:provider` records a fresh PKCE state and redirects to the
//! provider. `GET /auth/:provider/callback` consumes that state, finishes
//! the code exchange and answers with the session token.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use gatehouse_auth::{AuthError, LoginResponse, OAuthState};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters the provider sends back to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn unknown_provider(name: &str) -> ApiError {
    ApiError(AuthError::UnknownProvider(name.to_string()))
}

/// GET /auth/:provider - Start a login
async fn start_login(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> ApiResult<Redirect> {
    let client = state.provider(&provider).ok_or_else(|| unknown_provider(&provider))?;

    let oauth_state = OAuthState::with_pkce(provider.as_str());
    let url = client.authorization_url(&oauth_state)?;
    state.remember_state(oauth_state).await;

    info!(provider = %provider, "Redirecting to provider");
    Ok(Redirect::to(&url))
}

/// GET /auth/:provider/callback - Finish a login
async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Json<LoginResponse>> {
    let client = state.provider(&provider).ok_or_else(|| unknown_provider(&provider))?;

    if let Some(error) = query.error {
        warn!(provider = %provider, error = %error, "Provider denied the login");
        return Err(AuthError::OAuthError(error).into());
    }

    let (code, state_value) = match (query.code, query.state) {
        (Some(code), Some(s)) => (code, s),
        _ => return Err(AuthError::InvalidState.into()),
    };

    let oauth_state = state
        .take_state(&state_value)
        .await
        .ok_or(AuthError::InvalidState)?;

    let response = state
        .login
        .complete_oauth_callback(client.as_ref(), &code, &oauth_state)
        .await?;

    Ok(Json(response))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/:provider", get(start_login))
        .route("/auth/:provider/callback", get(callback))
        .with_state(state)
}
