//! Routes behind the session gate.

use std::sync::Arc;

use axum::{extract::State, middleware, routing::get, Extension, Json, Router};
use gatehouse_auth::AuthenticatedUser;
use gatehouse_identity::{IdentityError, ProfileData, User};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::middleware::require_session;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    pub message: String,
    pub users: Vec<User>,
}

/// GET /api/profile - The caller's own user row
async fn profile(Extension(ctx): Extension<AuthenticatedUser>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        message: "You have accessed a protected route!".to_string(),
        user: ctx.user,
    })
}

/// GET /api/users - Every user, by id
async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<UsersResponse>> {
    let users = state.store.list_all().await?;

    Ok(Json(UsersResponse {
        message: "Successfully fetched all users!".to_string(),
        users,
    }))
}

/// GET /api/profile/data - The caller's stored profile document
async fn get_profile_data(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ProfileData>> {
    state
        .store
        .profile_data(ctx.user.id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            let what = format!("profile data for user {}", ctx.user.id);
            ApiError::from(IdentityError::NotFound(what))
        })
}

/// PUT /api/profile/data - Replace the caller's profile document
async fn put_profile_data(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthenticatedUser>,
    Json(data): Json<serde_json::Value>,
) -> ApiResult<Json<ProfileData>> {
    let saved = state.store.save_profile_data(ctx.user.id, data).await?;
    Ok(Json(saved))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/profile", get(profile))
        .route("/profile/data", get(get_profile_data).put(put_profile_data))
        .route("/users", get(list_users))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
        .with_state(state)
}
