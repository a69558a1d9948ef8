//! User records
//!
//! A [`User`] is created once per external identity and is never updated by
//! the login path. Arbitrary profile data lives in a side table
//! ([`ProfileData`]) keyed by user id so it can change without touching the
//! identity columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned user identifier.
pub type UserId = i64;

/// Local user record bound to one external identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal identifier, assigned by the store
    pub id: UserId,

    /// Issuing OAuth provider (e.g. `google`, `github`)
    pub provider: String,

    /// Opaque identifier of the user at the provider
    pub provider_subject_id: String,

    /// Human readable name
    pub display_name: String,

    /// Email address, unique across all users when present
    pub email: Option<String>,

    /// Insertion timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Check whether this user belongs to the given external identity.
    pub fn matches_identity(&self, provider: &str, subject_id: &str) -> bool {
        self.provider == provider && self.provider_subject_id == subject_id
    }
}

/// Values for a user row that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub provider: String,
    pub provider_subject_id: String,
    pub display_name: String,
    pub email: Option<String>,
}

/// Auxiliary per-user profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    /// Owning user
    pub user_id: UserId,

    /// Free-form JSON document
    pub data: serde_json::Value,

    /// Last upsert timestamp
    pub updated_at: DateTime<Utc>,
}
