//! HTTP implementation of [`OAuthProviderClient`]
//!
//! The authorization-code exchange goes through the oauth2 crate; profile
//! endpoints are read with reqwest and mapped into an [`ExternalProfile`].
//! Only verified email addresses are forwarded.

use crate::error::{AuthError, AuthResult};
use crate::oauth::{OAuthProvider, OAuthProviderClient, OAuthState, ProviderDescriptor};
use async_trait::async_trait;
use gatehouse_identity::ExternalProfile;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeVerifier, RedirectUrl,
    Scope, TokenResponse, TokenUrl,
};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

/// OIDC-style userinfo response (Google and custom providers).
#[derive(Debug, Deserialize)]
struct OidcUserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    email_verified: Option<bool>,
}

/// GitHub `/user` response.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
}

/// GitHub `/user/emails` entry.
#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// OAuth provider client speaking HTTP to the provider.
pub struct HttpProviderClient {
    descriptor: ProviderDescriptor,
    oauth: BasicClient,
    http: reqwest::Client,
}

impl std::fmt::Debug for HttpProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProviderClient")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

fn config_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::ConfigError(e.to_string())
}

fn provider_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::OAuthError(e.to_string())
}

impl HttpProviderClient {
    /// Create a client for a provider descriptor.
    pub fn new(descriptor: ProviderDescriptor) -> AuthResult<Self> {
        let oauth = BasicClient::new(
            ClientId::new(descriptor.client_id.clone()),
            Some(ClientSecret::new(descriptor.client_secret.clone())),
            AuthUrl::new(descriptor.get_auth_url()?).map_err(config_error)?,
            Some(TokenUrl::new(descriptor.get_token_url()?).map_err(config_error)?),
        )
        .set_redirect_uri(RedirectUrl::new(descriptor.redirect_url.clone()).map_err(config_error)?);

        // Fail at startup rather than on the first callback.
        descriptor.get_userinfo_url()?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("gatehouse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(config_error)?;

        Ok(Self {
            descriptor,
            oauth,
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, access_token: &str) -> AuthResult<T> {
        self.http
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)
    }

    async fn fetch_oidc_profile(&self, url: &str, access_token: &str) -> AuthResult<ExternalProfile> {
        let info: OidcUserInfo = self.get_json(url, access_token).await?;

        Ok(ExternalProfile {
            provider: self.descriptor.name.clone(),
            subject_id: info.sub,
            display_name: info.name,
            emails: info
                .email
                .filter(|_| info.email_verified.unwrap_or(false))
                .into_iter()
                .collect(),
        })
    }

    async fn fetch_github_profile(&self, url: &str, access_token: &str) -> AuthResult<ExternalProfile> {
        let user: GitHubUser = self.get_json(url, access_token).await?;
        let emails_url = format!("{}/emails", url.trim_end_matches('/'));
        let mut emails: Vec<GitHubEmail> = self.get_json(&emails_url, access_token).await?;

        emails.retain(|e| e.verified);
        emails.sort_by_key(|e| !e.primary);

        Ok(ExternalProfile {
            provider: self.descriptor.name.clone(),
            subject_id: user.id.to_string(),
            display_name: user.name.or(Some(user.login)),
            emails: emails.into_iter().map(|e| e.email).collect(),
        })
    }
}

#[async_trait]
impl OAuthProviderClient for HttpProviderClient {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn authorization_url(&self, state: &OAuthState) -> AuthResult<String> {
        let csrf = state.state.clone();
        let mut request = self.oauth.authorize_url(move || CsrfToken::new(csrf));
        for scope in &self.descriptor.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        if let Some(challenge) = state.code_challenge() {
            request = request
                .add_extra_param("code_challenge", challenge)
                .add_extra_param("code_challenge_method", "S256");
        }

        let (url, _) = request.url();
        Ok(url.to_string())
    }

    #[instrument(skip_all, fields(provider = %self.descriptor.name))]
    async fn exchange_code(&self, code: &str, state: &OAuthState) -> AuthResult<String> {
        let mut request = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()));
        if let Some(verifier) = &state.code_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.clone()));
        }

        let token = request
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::OAuthError(format!("Token exchange failed: {}", e)))?;

        debug!("Exchanged authorization code");
        Ok(token.access_token().secret().clone())
    }

    #[instrument(skip_all, fields(provider = %self.descriptor.name))]
    async fn fetch_profile(&self, access_token: &str) -> AuthResult<ExternalProfile> {
        let url = self.descriptor.get_userinfo_url()?;
        match self.descriptor.provider {
            OAuthProvider::GitHub => self.fetch_github_profile(&url, access_token).await,
            OAuthProvider::Google | OAuthProvider::Custom => {
                self.fetch_oidc_profile(&url, access_token).await
            }
        }
    }
}
