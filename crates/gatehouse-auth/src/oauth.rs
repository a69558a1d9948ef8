//! OAuth 2.0 provider configuration
//!
//! Providers are described once at startup by a [`ProviderDescriptor`]
//! (client credentials, endpoints, callback path, scopes). Every provider
//! hands its callback result to the same reconciliation path through the
//! [`OAuthProviderClient`] trait, so no process-wide strategy registry is
//! needed.

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use gatehouse_identity::ExternalProfile;
use serde::{Deserialize, Serialize};

/// Lifetime of a pending OAuth state, in seconds.
pub const STATE_TTL_SECS: i64 = 600;

/// Supported OAuth providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    /// Google OAuth
    Google,
    /// GitHub OAuth
    GitHub,
    /// Custom provider exposing an OIDC-style userinfo endpoint
    Custom,
}

impl OAuthProvider {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::GitHub => "github",
            OAuthProvider::Custom => "custom",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(OAuthProvider::Google),
            "github" => Some(OAuthProvider::GitHub),
            "custom" => Some(OAuthProvider::Custom),
            _ => None,
        }
    }

    /// Get the default authorization URL for the provider.
    pub fn auth_url(&self) -> Option<&'static str> {
        match self {
            OAuthProvider::Google => Some("https://accounts.google.com/o/oauth2/v2/auth"),
            OAuthProvider::GitHub => Some("https://github.com/login/oauth/authorize"),
            OAuthProvider::Custom => None,
        }
    }

    /// Get the default token URL for the provider.
    pub fn token_url(&self) -> Option<&'static str> {
        match self {
            OAuthProvider::Google => Some("https://oauth2.googleapis.com/token"),
            OAuthProvider::GitHub => Some("https://github.com/login/oauth/access_token"),
            OAuthProvider::Custom => None,
        }
    }

    /// Get the default profile endpoint for the provider.
    pub fn userinfo_url(&self) -> Option<&'static str> {
        match self {
            OAuthProvider::Google => Some("https://openidconnect.googleapis.com/v1/userinfo"),
            OAuthProvider::GitHub => Some("https://api.github.com/user"),
            OAuthProvider::Custom => None,
        }
    }

    /// Get default scopes for the provider.
    pub fn default_scopes(&self) -> Vec<&'static str> {
        match self {
            OAuthProvider::Google => vec!["profile", "email"],
            OAuthProvider::GitHub => vec!["user:email"],
            OAuthProvider::Custom => vec![],
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Startup-time description of one login provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Name used in routes and stored on users
    pub name: String,

    /// Provider type
    pub provider: OAuthProvider,

    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Authorization URL (optional, uses default for known providers)
    pub auth_url: Option<String>,

    /// Token URL (optional, uses default for known providers)
    pub token_url: Option<String>,

    /// Profile URL (optional, uses default for known providers)
    pub userinfo_url: Option<String>,

    /// Absolute redirect URL registered with the provider
    pub redirect_url: String,

    /// Scopes to request
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ProviderDescriptor {
    /// Create a descriptor whose callback lives under `callback_base`.
    ///
    /// The redirect URL is `{callback_base}/auth/{name}/callback`.
    pub fn new(
        provider: OAuthProvider,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_base: &str,
    ) -> Self {
        let name = provider.as_str().to_string();
        Self {
            redirect_url: format!(
                "{}{}",
                callback_base.trim_end_matches('/'),
                Self::callback_path_for(&name)
            ),
            name,
            provider,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: None,
            token_url: None,
            userinfo_url: None,
            scopes: provider
                .default_scopes()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    fn callback_path_for(name: &str) -> String {
        format!("/auth/{}/callback", name)
    }

    /// Path of the callback route.
    pub fn callback_path(&self) -> String {
        Self::callback_path_for(&self.name)
    }

    /// Path of the route that starts the login.
    pub fn login_path(&self) -> String {
        format!("/auth/{}", self.name)
    }

    /// Override the provider endpoints.
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.auth_url = Some(auth_url.into());
        self.token_url = Some(token_url.into());
        self.userinfo_url = Some(userinfo_url.into());
        self
    }

    /// Get the authorization URL.
    pub fn get_auth_url(&self) -> AuthResult<String> {
        self.auth_url
            .clone()
            .or_else(|| self.provider.auth_url().map(String::from))
            .ok_or_else(|| AuthError::ConfigError("Authorization URL not configured".to_string()))
    }

    /// Get the token URL.
    pub fn get_token_url(&self) -> AuthResult<String> {
        self.token_url
            .clone()
            .or_else(|| self.provider.token_url().map(String::from))
            .ok_or_else(|| AuthError::ConfigError("Token URL not configured".to_string()))
    }

    /// Get the profile URL.
    pub fn get_userinfo_url(&self) -> AuthResult<String> {
        self.userinfo_url
            .clone()
            .or_else(|| self.provider.userinfo_url().map(String::from))
            .ok_or_else(|| AuthError::ConfigError("Userinfo URL not configured".to_string()))
    }
}

/// OAuth state for CSRF protection and PKCE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    /// Random state value
    pub state: String,

    /// Provider the login was started for
    pub provider: String,

    /// PKCE code verifier
    pub code_verifier: Option<String>,

    /// Created timestamp
    pub created_at: i64,
}

impl OAuthState {
    /// Create a new OAuth state.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            state: random_alphanumeric(32),
            provider: provider.into(),
            code_verifier: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Create with PKCE support.
    pub fn with_pkce(provider: impl Into<String>) -> Self {
        let mut state = Self::new(provider);
        state.code_verifier = Some(random_alphanumeric(64));
        state
    }

    /// Get the PKCE code challenge (S256).
    pub fn code_challenge(&self) -> Option<String> {
        use sha2::{Digest, Sha256};

        self.code_verifier.as_ref().map(|verifier| {
            let mut hasher = Sha256::new();
            hasher.update(verifier.as_bytes());
            let hash = hasher.finalize();
            base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, hash)
        })
    }

    /// Check if the state has expired.
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now - self.created_at > STATE_TTL_SECS
    }
}

fn random_alphanumeric(len: usize) -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Trait for OAuth provider implementations.
#[async_trait]
pub trait OAuthProviderClient: Send + Sync {
    /// Get the provider descriptor.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Get the authorization URL to redirect the user to.
    fn authorization_url(&self, state: &OAuthState) -> AuthResult<String>;

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str, state: &OAuthState) -> AuthResult<String>;

    /// Fetch the user's profile with an access token.
    async fn fetch_profile(&self, access_token: &str) -> AuthResult<ExternalProfile>;
}
