//! Error types for identity store and reconciliation operations

use thiserror::Error;

/// The uniqueness constraint an insert collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictTarget {
    /// `(provider, provider_subject_id)` already belongs to a user
    ProviderIdentity,
    /// `email` already belongs to a user
    Email,
}

impl ConflictTarget {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictTarget::ProviderIdentity => "provider_identity",
            ConflictTarget::Email => "email",
        }
    }
}

impl std::fmt::Display for ConflictTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity error types.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Insert violated a uniqueness constraint
    #[error("Unique constraint violated: {0}")]
    Conflict(ConflictTarget),

    /// Backing store could not be reached or the query failed
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// External profile is missing its provider or subject id
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Email belongs to another account and linking is disabled
    #[error("Email {0} is already registered to another account")]
    EmailInUse(String),

    /// A conflict was reported but no row could be found afterwards
    #[error("Identity {provider}/{subject_id} could not be resolved after a conflict")]
    Unresolved {
        /// Provider name
        provider: String,
        /// Provider subject id
        subject_id: String,
    },
}

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

impl IdentityError {
    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            IdentityError::Unavailable(_) | IdentityError::Unresolved { .. }
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            IdentityError::Conflict(_) | IdentityError::EmailInUse(_) => 409,
            IdentityError::NotFound(_) => 404,
            IdentityError::InvalidProfile(_) => 400,
            IdentityError::Unavailable(_) => 503,
            IdentityError::Unresolved { .. } => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            IdentityError::Conflict(_) => "CONFLICT",
            IdentityError::Unavailable(_) => "STORE_UNAVAILABLE",
            IdentityError::NotFound(_) => "NOT_FOUND",
            IdentityError::InvalidProfile(_) => "INVALID_PROFILE",
            IdentityError::EmailInUse(_) => "EMAIL_IN_USE",
            IdentityError::Unresolved { .. } => "IDENTITY_UNRESOLVED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(IdentityError::Conflict(ConflictTarget::Email).status_code(), 409);
        assert_eq!(IdentityError::NotFound("user 1".into()).status_code(), 404);
        assert_eq!(IdentityError::Unavailable("down".into()).status_code(), 503);
        assert!(IdentityError::Unavailable("down".into()).is_server_error());
        assert!(!IdentityError::EmailInUse("a@x.com".into()).is_server_error());
    }
}
