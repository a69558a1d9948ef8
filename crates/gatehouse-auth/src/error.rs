//! Error types for authentication operations
//!
//! This module defines the errors that can occur while issuing and
//! verifying session tokens, talking to OAuth providers, and admitting
//! requests through the authorization gate.

use gatehouse_identity::IdentityError;
use thiserror::Error;

/// Why a session token failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Token could not be parsed
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signature does not match the token contents
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token is past its expiry
    #[error("Token has expired")]
    Expired,
}

impl VerificationError {
    /// Get error code for logs and API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            VerificationError::Malformed(_) => "MALFORMED_TOKEN",
            VerificationError::InvalidSignature => "INVALID_SIGNATURE",
            VerificationError::Expired => "TOKEN_EXPIRED",
        }
    }
}

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token was presented
    #[error("Unauthorized: no bearer token")]
    Unauthorized,

    /// The presented token was rejected
    #[error("Forbidden: {0}")]
    Forbidden(#[from] VerificationError),

    /// The token refers to a user that no longer exists
    #[error("User {0} not found")]
    UserNotFound(String),

    /// Identity store or reconciliation failure
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// OAuth provider error
    #[error("OAuth error: {0}")]
    OAuthError(String),

    /// No provider is configured under this name
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// OAuth state is unknown, expired or already used
    #[error("Invalid OAuth state")]
    InvalidState,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Rejected tokens and unknown users are expected outcomes and
    /// should not be logged as errors.
    pub fn is_server_error(&self) -> bool {
        match self {
            AuthError::Identity(e) => e.is_server_error(),
            AuthError::OAuthError(_) | AuthError::ConfigError(_) | AuthError::Internal(_) => true,
            _ => false,
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Unauthorized => 401,
            AuthError::Forbidden(_) => 403,
            AuthError::UserNotFound(_) | AuthError::UnknownProvider(_) => 404,
            AuthError::Identity(e) => e.status_code(),
            AuthError::InvalidState => 400,
            AuthError::OAuthError(_) => 502,
            AuthError::ConfigError(_) | AuthError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    ///
    /// Every verification failure maps to the same `FORBIDDEN` code; the
    /// specific reason is only logged.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::Forbidden(_) => "FORBIDDEN",
            AuthError::UserNotFound(_) => "NOT_FOUND",
            AuthError::Identity(e) => e.error_code(),
            AuthError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            AuthError::OAuthError(_) => "OAUTH_ERROR",
            AuthError::InvalidState => "INVALID_STATE",
            AuthError::ConfigError(_) => "CONFIG_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to API clients.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Forbidden(_) => "Forbidden".to_string(),
            e if e.is_server_error() => "Internal server error".to_string(),
            e => e.to_string(),
        }
    }
}
