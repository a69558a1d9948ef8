//! Authorization gate for protected routes
//!
//! Every protected request goes through [`AuthorizationGate::authorize`]:
//!
//! - no bearer token → [`AuthError::Unauthorized`] (401)
//! - token fails verification → [`AuthError::Forbidden`] (403)
//! - token verifies but its user is gone → [`AuthError::UserNotFound`] (404)
//! - otherwise the live user row is loaded and returned
//!
//! The gate keeps no state between requests; the user row is read from the
//! store on every call.

use crate::claims::SessionClaims;
use crate::error::{AuthError, AuthResult, VerificationError};
use crate::jwt::JwtService;
use gatehouse_identity::{IdentityStore, User};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Identity attached to an admitted request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// User row as read during this request
    pub user: User,

    /// Verified token claims
    pub claims: SessionClaims,
}

/// Verifies bearer tokens and resolves them to live users.
#[derive(Clone)]
pub struct AuthorizationGate {
    tokens: Arc<JwtService>,
    store: Arc<dyn IdentityStore>,
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

/// Extract the token from an `Authorization` header value.
///
/// A missing or blank header is `Unauthorized`; anything other than
/// `Bearer <token>` is a malformed credential.
pub fn bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let header = match header.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return Err(AuthError::Unauthorized),
    };

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(VerificationError::Malformed("expected `Bearer <token>`".to_string()).into()),
    }
}

impl AuthorizationGate {
    /// Create a gate over a token service and an identity store.
    pub fn new(tokens: Arc<JwtService>, store: Arc<dyn IdentityStore>) -> Self {
        Self { tokens, store }
    }

    /// Authorize a request given its raw `Authorization` header.
    #[instrument(skip_all)]
    pub async fn authorize(&self, authorization: Option<&str>) -> AuthResult<AuthenticatedUser> {
        let token = bearer_token(authorization).map_err(|e| {
            if let AuthError::Forbidden(reason) = &e {
                debug!(reason = %reason, "Rejected malformed authorization header");
            }
            e
        })?;

        let claims = self.tokens.verify(token).map_err(|e| {
            match &e {
                VerificationError::Malformed(detail) => {
                    debug!(detail = %detail, "Rejected malformed token")
                }
                other => info!(reason = other.error_code(), "Rejected token"),
            }
            AuthError::Forbidden(e)
        })?;

        let user_id = claims.user_id().ok_or_else(|| {
            debug!(sub = %claims.sub, "Token subject is not a user id");
            AuthError::Forbidden(VerificationError::Malformed("invalid subject".to_string()))
        })?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| {
                info!(user_id, "Token refers to a missing user");
                AuthError::UserNotFound(user_id.to_string())
            })?;

        Ok(AuthenticatedUser { user, claims })
    }
}

#[cfg(all(test, feature = "jwt"))]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use gatehouse_identity::{MemoryIdentityStore, NewUser};

    async fn setup() -> (MemoryIdentityStore, Arc<JwtService>, AuthorizationGate, User) {
        let store = MemoryIdentityStore::new();
        let tokens = Arc::new(
            JwtService::with_secret("test-secret-key-for-jwt-signing-minimum-32-chars").unwrap(),
        );
        let gate = AuthorizationGate::new(tokens.clone(), Arc::new(store.clone()));
        let user = store
            .insert(NewUser {
                provider: "google".into(),
                provider_subject_id: "42".into(),
                display_name: "Ada".into(),
                email: Some("ada@x.com".into()),
            })
            .await
            .unwrap();
        (store, tokens, gate, user)
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(Some("bearer   abc ")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AuthError::Unauthorized)));
        assert!(matches!(bearer_token(Some("  ")), Err(AuthError::Unauthorized)));
        assert!(matches!(bearer_token(Some("Bearer")), Err(AuthError::Forbidden(_))));
        assert!(matches!(bearer_token(Some("Basic abc")), Err(AuthError::Forbidden(_))));
        assert!(matches!(bearer_token(Some("Bearer a b")), Err(AuthError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admits_valid_token() {
        let (_, tokens, gate, user) = setup().await;
        let header = format!("Bearer {}", tokens.issue(&user).unwrap());

        let ctx = gate.authorize(Some(&header)).await.unwrap();
        assert_eq!(ctx.user, user);
        assert_eq!(ctx.claims.user_id(), Some(user.id));
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let (_, _, gate, _) = setup().await;

        let err = gate.authorize(None).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_bad_tokens_are_forbidden() {
        let (_, tokens, gate, user) = setup().await;

        let expired = tokens
            .issue_at(&user, Utc::now() - Duration::hours(2))
            .unwrap();
        let err = gate
            .authorize(Some(&format!("Bearer {}", expired)))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(VerificationError::Expired)));
        assert_eq!(err.status_code(), 403);

        let err = gate.authorize(Some("Bearer not.a.jwt")).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_deleted_user_is_not_found() {
        let (store, tokens, gate, user) = setup().await;
        let header = format!("Bearer {}", tokens.issue(&user).unwrap());

        store.delete(user.id).await.unwrap();

        let err = gate.authorize(Some(&header)).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_non_numeric_subject_is_forbidden() {
        let (_, tokens, gate, user) = setup().await;
        let mut claims = SessionClaims::new(&user, "gatehouse", Utc::now(), Duration::hours(1));
        claims.sub = "admin".to_string();
        let token = tokens.encode_claims(&claims).unwrap();

        let err = gate
            .authorize(Some(&format!("Bearer {}", token)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
