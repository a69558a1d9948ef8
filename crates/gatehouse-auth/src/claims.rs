//! Session token claims
//!
//! Claims identify a user by internal id only. Display name and email are
//! deliberately absent: the authorization gate always re-reads the user
//! row, so nothing mutable is trusted from the token.

use chrono::{DateTime, Duration, Utc};
use gatehouse_identity::{User, UserId};
use serde::{Deserialize, Serialize};

/// Claims carried by a session token.
///
/// # Example
///
/// ```rust,no_run
/// use gatehouse_auth::claims::SessionClaims;
///
/// # fn example(user: &gatehouse_identity::User) {
/// let claims = SessionClaims::new(user, "gatehouse", chrono::Utc::now(), chrono::Duration::hours(1));
/// assert_eq!(claims.user_id(), Some(user.id));
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (internal user id)
    pub sub: String,

    /// Provider the user signed in with
    pub provider: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Create claims for a user, valid for `ttl` from `now`.
    pub fn new(user: &User, issuer: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user.id.to_string(),
            provider: user.provider.clone(),
            iss: issuer.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Get the user id, if the subject is a valid id.
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }

    /// Get issue time as DateTime.
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Check if the token is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }

    /// Seconds of validity left at `now`, never negative.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.exp - now.timestamp()).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            provider: "github".to_string(),
            provider_subject_id: "1234".to_string(),
            display_name: "Mona".to_string(),
            email: Some("mona@x.com".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_claims_creation() {
        let now = Utc::now();
        let claims = SessionClaims::new(&user(), "gatehouse", now, Duration::hours(1));

        assert_eq!(claims.user_id(), Some(7));
        assert_eq!(claims.provider, "github");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.issued_at().timestamp(), now.timestamp());
        assert!(!claims.is_expired_at(now));
        assert_eq!(claims.remaining_secs(now), 3600);
    }

    #[test]
    fn test_claims_expiration() {
        let now = Utc::now();
        let claims = SessionClaims::new(&user(), "gatehouse", now, Duration::hours(1));

        assert!(claims.is_expired_at(now + Duration::hours(2)));
        assert_eq!(claims.remaining_secs(now + Duration::hours(2)), 0);
    }

    #[test]
    fn test_claims_carry_no_profile_fields() {
        let claims = SessionClaims::new(&user(), "gatehouse", Utc::now(), Duration::hours(1));
        let json = serde_json::to_value(&claims).unwrap();

        assert!(json.get("email").is_none());
        assert!(json.get("display_name").is_none());
    }

    #[test]
    fn test_non_numeric_subject() {
        let mut claims = SessionClaims::new(&user(), "gatehouse", Utc::now(), Duration::hours(1));
        claims.sub = "not-a-number".to_string();
        assert_eq!(claims.user_id(), None);
    }
}
