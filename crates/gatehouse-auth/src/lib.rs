//! # Gatehouse Auth
//!
//! Session tokens, OAuth provider login and request authorization.
//!
//! ## Overview
//!
//! - **Session tokens**: HMAC-signed JWTs carrying only the internal user id
//!   ([`JwtService`], [`SessionClaims`])
//! - **Providers**: startup-time [`ProviderDescriptor`]s and the
//!   [`OAuthProviderClient`] trait, with an HTTP implementation for Google,
//!   GitHub and OIDC-style custom providers
//! - **Login**: [`LoginService`] reconciles a verified profile to a local
//!   user and issues a token
//! - **Authorization gate**: [`AuthorizationGate`] admits a request only if
//!   its bearer token verifies and still refers to an existing user
//!
//! ## Features
//!
//! - `jwt` (default): token issuance, the gate and the login service
//! - `oauth` (default): [`HttpProviderClient`] using oauth2 and reqwest
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gatehouse_auth::{AuthorizationGate, JwtService};
//! use gatehouse_identity::MemoryIdentityStore;
//! use std::sync::Arc;
//!
//! async fn check(header: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
//!     let tokens = Arc::new(JwtService::with_secret("your-secret-key")?);
//!     let gate = AuthorizationGate::new(tokens, Arc::new(MemoryIdentityStore::new()));
//!
//!     let ctx = gate.authorize(header).await?;
//!     println!("request from user {}", ctx.user.id);
//!     Ok(())
//! }
//! ```

pub mod claims;
pub mod error;
pub mod oauth;

#[cfg(feature = "jwt")]
pub mod gate;
#[cfg(feature = "jwt")]
pub mod jwt;
#[cfg(feature = "jwt")]
pub mod login;
#[cfg(feature = "oauth")]
pub mod provider;

// Re-export main types
pub use claims::SessionClaims;
pub use error::{AuthError, AuthResult, VerificationError};
pub use oauth::{
    OAuthProvider, OAuthProviderClient, OAuthState, ProviderDescriptor, STATE_TTL_SECS,
};

#[cfg(feature = "jwt")]
pub use gate::{bearer_token, AuthenticatedUser, AuthorizationGate};
#[cfg(feature = "jwt")]
pub use jwt::{JwtAlgorithm, JwtConfig, JwtService};
#[cfg(feature = "jwt")]
pub use login::{LoginResponse, LoginService, LOGIN_SUCCESS_MESSAGE};
#[cfg(feature = "oauth")]
pub use provider::HttpProviderClient;
