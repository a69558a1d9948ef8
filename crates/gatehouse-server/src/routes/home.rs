use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Login entry point for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderLink {
    pub name: String,
    pub login_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeResponse {
    pub message: String,
    pub providers: Vec<ProviderLink>,
}

/// GET / - List login providers
async fn home(State(state): State<Arc<AppState>>) -> Json<HomeResponse> {
    let mut providers: Vec<ProviderLink> = state
        .providers
        .values()
        .map(|p| ProviderLink {
            name: p.descriptor().name.clone(),
            login_path: p.descriptor().login_path(),
        })
        .collect();
    providers.sort_by(|a, b| a.name.cmp(&b.name));

    Json(HomeResponse {
        message: "Please log in to continue.".to_string(),
        providers,
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/", get(home)).with_state(state)
}
