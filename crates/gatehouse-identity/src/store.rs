//! Identity store abstraction
//!
//! The store owns the `users` relation and enforces both uniqueness
//! invariants: `(provider, provider_subject_id)` and non-null `email`.
//! Constraint violations are reported as [`IdentityError::Conflict`] so the
//! reconciler can arbitrate races without any in-process locking.
//!
//! [`IdentityError::Conflict`]: crate::error::IdentityError::Conflict

use crate::error::IdentityResult;
use crate::user::{NewUser, ProfileData, User, UserId};
use async_trait::async_trait;

/// Persistent relation of external identities to local users.
///
/// Every operation is atomic for a single row. Lookups return `Ok(None)`
/// only when the row genuinely does not exist; backend failures are
/// errors.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find a user by internal id.
    async fn find_by_id(&self, id: UserId) -> IdentityResult<Option<User>>;

    /// Find a user by external identity.
    async fn find_by_provider_identity(
        &self,
        provider: &str,
        subject_id: &str,
    ) -> IdentityResult<Option<User>>;

    /// Find a user by email.
    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<User>>;

    /// Insert a new user.
    ///
    /// Fails with `Conflict(ProviderIdentity)` or `Conflict(Email)` when the
    /// row would break a uniqueness invariant. When both would be broken,
    /// backends may report either one.
    async fn insert(&self, new_user: NewUser) -> IdentityResult<User>;

    /// List all users in ascending id order.
    async fn list_all(&self) -> IdentityResult<Vec<User>>;

    /// Delete a user and its profile data. Returns whether a row existed.
    async fn delete(&self, id: UserId) -> IdentityResult<bool>;

    /// Insert or replace the profile document of a user.
    async fn save_profile_data(
        &self,
        user_id: UserId,
        data: serde_json::Value,
    ) -> IdentityResult<ProfileData>;

    /// Get the profile document of a user.
    async fn profile_data(&self, user_id: UserId) -> IdentityResult<Option<ProfileData>>;
}
