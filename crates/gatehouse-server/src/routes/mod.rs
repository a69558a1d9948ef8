//! HTTP routes.
//!
//! - `/` lists the enabled login providers
//! - `/auth/:provider` and `/auth/:provider/callback` run the OAuth flow
//! - `/api/*` is behind the session gate

pub mod api;
pub mod auth;
pub mod home;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(home::router(state.clone()))
        .merge(auth::router(state.clone()))
        .nest("/api", api::router(state))
        .layer(TraceLayer::new_for_http())
}
