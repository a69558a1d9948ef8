//! Find-or-create reconciliation of external identities
//!
//! [`Reconciler::find_or_create`] maps an [`ExternalProfile`] to exactly one
//! local [`User`]. The common case is a returning user found by provider
//! identity. For a first login the reconciler inserts and lets the store's
//! unique constraints arbitrate races:
//!
//! 1. Look up `(provider, subject_id)`; return the row if it exists.
//! 2. Insert the normalized profile.
//! 3. On `Conflict(ProviderIdentity)` a concurrent login won the race, so
//!    the identity lookup is repeated and its row returned.
//! 4. On `Conflict(Email)` the identity lookup is repeated first (identity
//!    always wins over email), then the [`EmailConflictPolicy`] decides.
//!
//! No in-process lock is taken, so the same guarantees hold across several
//! server processes sharing one store.

use crate::error::{ConflictTarget, IdentityError, IdentityResult};
use crate::profile::ExternalProfile;
use crate::store::IdentityStore;
use crate::user::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What to do when a first login carries an email that already belongs to
/// a user of a different identity.
///
/// `LinkToExisting` returns the existing account without proving that the
/// caller controls that email at the new provider. Only choose it when
/// every configured provider returns verified addresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmailConflictPolicy {
    /// Resolve the login to the account that already owns the email
    LinkToExisting,
    /// Refuse the login with [`IdentityError::EmailInUse`]
    Reject,
}

impl EmailConflictPolicy {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailConflictPolicy::LinkToExisting => "link",
            EmailConflictPolicy::Reject => "reject",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "link" | "link_to_existing" => Some(EmailConflictPolicy::LinkToExisting),
            "reject" => Some(EmailConflictPolicy::Reject),
            _ => None,
        }
    }
}

/// Maps external profiles to local users.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn IdentityStore>,
    email_policy: EmailConflictPolicy,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("email_policy", &self.email_policy)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler over a store with an explicit email policy.
    pub fn new(store: Arc<dyn IdentityStore>, email_policy: EmailConflictPolicy) -> Self {
        Self {
            store,
            email_policy,
        }
    }

    /// Get the configured email policy.
    pub fn email_policy(&self) -> EmailConflictPolicy {
        self.email_policy
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Resolve a profile to its user, creating the user on first login.
    #[instrument(
        skip(self, profile),
        fields(provider = %profile.provider, subject_id = %profile.subject_id)
    )]
    pub async fn find_or_create(&self, profile: &ExternalProfile) -> IdentityResult<User> {
        let new_user = profile.normalize()?;
        let provider = new_user.provider.clone();
        let subject_id = new_user.provider_subject_id.clone();

        if let Some(user) = self
            .store
            .find_by_provider_identity(&provider, &subject_id)
            .await?
        {
            debug!(user_id = user.id, "Returning user");
            return Ok(user);
        }

        let email = new_user.email.clone();
        match self.store.insert(new_user).await {
            Ok(user) => {
                info!(user_id = user.id, "Created user");
                Ok(user)
            }
            Err(IdentityError::Conflict(ConflictTarget::ProviderIdentity)) => {
                debug!("Lost first-login race, re-reading identity");
                self.resolve_identity(&provider, &subject_id).await
            }
            Err(IdentityError::Conflict(ConflictTarget::Email)) => {
                if let Some(user) = self
                    .store
                    .find_by_provider_identity(&provider, &subject_id)
                    .await?
                {
                    debug!(user_id = user.id, "Identity inserted concurrently");
                    return Ok(user);
                }
                let email = email.ok_or_else(|| unresolved(&provider, &subject_id))?;
                self.resolve_email_conflict(&provider, &subject_id, email).await
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_identity(&self, provider: &str, subject_id: &str) -> IdentityResult<User> {
        self.store
            .find_by_provider_identity(provider, subject_id)
            .await?
            .ok_or_else(|| unresolved(provider, subject_id))
    }

    async fn resolve_email_conflict(
        &self,
        provider: &str,
        subject_id: &str,
        email: String,
    ) -> IdentityResult<User> {
        match self.email_policy {
            EmailConflictPolicy::Reject => {
                warn!(email = %email, "Email belongs to another account, rejecting login");
                Err(IdentityError::EmailInUse(email))
            }
            EmailConflictPolicy::LinkToExisting => {
                let user = self
                    .store
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| unresolved(provider, subject_id))?;
                warn!(
                    user_id = user.id,
                    existing_provider = %user.provider,
                    email = %email,
                    "Resolved login to existing account by email"
                );
                Ok(user)
            }
        }
    }
}

fn unresolved(provider: &str, subject_id: &str) -> IdentityError {
    IdentityError::Unresolved {
        provider: provider.to_string(),
        subject_id: subject_id.to_string(),
    }
}
