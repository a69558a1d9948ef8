//! Completing a provider login
//!
//! Whatever provider a login came from, the verified profile goes through
//! the same path: reconcile to a local user, then issue a session token.

use crate::error::{AuthError, AuthResult};
use crate::jwt::JwtService;
use crate::oauth::{OAuthProviderClient, OAuthState};
use gatehouse_identity::{ExternalProfile, Reconciler, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Message returned with every successful login.
pub const LOGIN_SUCCESS_MESSAGE: &str = "Authentication successful!";

/// Response body for a completed login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

/// Turns provider profiles into sessions.
#[derive(Debug, Clone)]
pub struct LoginService {
    reconciler: Reconciler,
    tokens: Arc<JwtService>,
}

impl LoginService {
    pub fn new(reconciler: Reconciler, tokens: Arc<JwtService>) -> Self {
        Self { reconciler, tokens }
    }

    /// Get the reconciler.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Get the token service.
    pub fn tokens(&self) -> &Arc<JwtService> {
        &self.tokens
    }

    /// Reconcile a verified profile and issue a session token for it.
    #[instrument(skip_all, fields(provider = %profile.provider))]
    pub async fn complete_login(&self, profile: &ExternalProfile) -> AuthResult<LoginResponse> {
        let user = self.reconciler.find_or_create(profile).await?;
        let token = self.tokens.issue(&user)?;

        info!(user_id = user.id, "Login completed");

        Ok(LoginResponse {
            message: LOGIN_SUCCESS_MESSAGE.to_string(),
            token,
            user,
        })
    }

    /// Finish an OAuth callback: exchange the code, fetch the profile and
    /// complete the login.
    ///
    /// The caller is responsible for having consumed `state` from its
    /// pending-state table; this only checks it belongs to `client`.
    #[instrument(skip_all, fields(provider = %client.descriptor().name))]
    pub async fn complete_oauth_callback(
        &self,
        client: &dyn OAuthProviderClient,
        code: &str,
        state: &OAuthState,
    ) -> AuthResult<LoginResponse> {
        if state.provider != client.descriptor().name || state.is_expired() {
            return Err(AuthError::InvalidState);
        }

        let access_token = client.exchange_code(code, state).await?;
        let mut profile = client.fetch_profile(&access_token).await?;
        // The route name is authoritative for the stored provider.
        profile.provider = client.descriptor().name.clone();

        self.complete_login(&profile).await
    }
}
