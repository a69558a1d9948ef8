//! In-memory identity store
//!
//! Suitable for tests and single-process deployments. Data is lost when the
//! process exits; use the SQLite backend for anything persistent.

use crate::error::{ConflictTarget, IdentityError, IdentityResult};
use crate::store::IdentityStore;
use crate::user::{NewUser, ProfileData, User, UserId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    by_identity: HashMap<(String, String), UserId>,
    by_email: HashMap<String, UserId>,
    profiles: HashMap<UserId, ProfileData>,
    last_id: UserId,
}

/// In-memory identity store.
///
/// A single write lock covers both uniqueness checks and the insert, so
/// concurrent inserts are serialized the same way a database unique index
/// would serialize them.
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
}

impl std::fmt::Debug for MemoryIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIdentityStore").finish_non_exhaustive()
    }
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Check whether the store has no users.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_id(&self, id: UserId) -> IdentityResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_provider_identity(
        &self,
        provider: &str,
        subject_id: &str,
    ) -> IdentityResult<Option<User>> {
        let tables = self.tables.read().await;
        let key = (provider.to_string(), subject_id.to_string());
        Ok(tables
            .by_identity
            .get(&key)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn insert(&self, new_user: NewUser) -> IdentityResult<User> {
        let mut tables = self.tables.write().await;

        let identity_key = (
            new_user.provider.clone(),
            new_user.provider_subject_id.clone(),
        );
        if tables.by_identity.contains_key(&identity_key) {
            return Err(IdentityError::Conflict(ConflictTarget::ProviderIdentity));
        }
        if let Some(email) = &new_user.email {
            if tables.by_email.contains_key(email) {
                return Err(IdentityError::Conflict(ConflictTarget::Email));
            }
        }

        tables.last_id += 1;
        let user = User {
            id: tables.last_id,
            provider: new_user.provider,
            provider_subject_id: new_user.provider_subject_id,
            display_name: new_user.display_name,
            email: new_user.email,
            created_at: Utc::now(),
        };

        tables.by_identity.insert(identity_key, user.id);
        if let Some(email) = &user.email {
            tables.by_email.insert(email.clone(), user.id);
        }
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn list_all(&self) -> IdentityResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn delete(&self, id: UserId) -> IdentityResult<bool> {
        let mut tables = self.tables.write().await;

        let Some(user) = tables.users.remove(&id) else {
            return Ok(false);
        };
        tables
            .by_identity
            .remove(&(user.provider, user.provider_subject_id));
        if let Some(email) = user.email {
            tables.by_email.remove(&email);
        }
        tables.profiles.remove(&id);

        Ok(true)
    }

    async fn save_profile_data(
        &self,
        user_id: UserId,
        data: serde_json::Value,
    ) -> IdentityResult<ProfileData> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(IdentityError::NotFound(format!("user {}", user_id)));
        }

        let profile = ProfileData {
            user_id,
            data,
            updated_at: Utc::now(),
        };
        tables.profiles.insert(user_id, profile.clone());

        Ok(profile)
    }

    async fn profile_data(&self, user_id: UserId) -> IdentityResult<Option<ProfileData>> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(provider: &str, subject_id: &str, email: Option<&str>) -> NewUser {
        NewUser {
            provider: provider.to_string(),
            provider_subject_id: subject_id.to_string(),
            display_name: subject_id.to_string(),
            email: email.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = MemoryIdentityStore::new();

        let user = store
            .insert(new_user("google", "42", Some("a@x.com")))
            .await
            .unwrap();
        assert_eq!(user.id, 1);

        let by_id = store.find_by_id(user.id).await.unwrap();
        let by_identity = store.find_by_provider_identity("google", "42").await.unwrap();
        let by_email = store.find_by_email("a@x.com").await.unwrap();

        assert_eq!(by_id.as_ref(), Some(&user));
        assert_eq!(by_identity.as_ref(), Some(&user));
        assert_eq!(by_email.as_ref(), Some(&user));
        assert!(store.find_by_provider_identity("github", "42").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identity_conflict() {
        let store = MemoryIdentityStore::new();
        store.insert(new_user("google", "42", None)).await.unwrap();

        let result = store.insert(new_user("google", "42", Some("b@x.com"))).await;
        assert!(matches!(
            result,
            Err(IdentityError::Conflict(ConflictTarget::ProviderIdentity))
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_email_conflict() {
        let store = MemoryIdentityStore::new();
        store
            .insert(new_user("google", "42", Some("a@x.com")))
            .await
            .unwrap();

        let result = store.insert(new_user("github", "7", Some("a@x.com"))).await;
        assert!(matches!(
            result,
            Err(IdentityError::Conflict(ConflictTarget::Email))
        ));
    }

    #[tokio::test]
    async fn test_null_emails_do_not_conflict() {
        let store = MemoryIdentityStore::new();
        store.insert(new_user("google", "1", None)).await.unwrap();
        store.insert(new_user("google", "2", None)).await.unwrap();

        let users = store.list_all().await.unwrap();
        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_delete_releases_constraints() {
        let store = MemoryIdentityStore::new();
        let user = store
            .insert(new_user("google", "42", Some("a@x.com")))
            .await
            .unwrap();

        assert!(store.delete(user.id).await.unwrap());
        assert!(!store.delete(user.id).await.unwrap());
        assert!(store.is_empty().await);

        let again = store
            .insert(new_user("google", "42", Some("a@x.com")))
            .await
            .unwrap();
        assert_ne!(again.id, user.id);
    }

    #[tokio::test]
    async fn test_profile_data_upsert() {
        let store = MemoryIdentityStore::new();
        let user = store.insert(new_user("google", "42", None)).await.unwrap();

        store
            .save_profile_data(user.id, serde_json::json!({"theme": "dark"}))
            .await
            .unwrap();
        store
            .save_profile_data(user.id, serde_json::json!({"theme": "light"}))
            .await
            .unwrap();

        let profile = store.profile_data(user.id).await.unwrap().unwrap();
        assert_eq!(profile.data["theme"], "light");

        let result = store.save_profile_data(99, serde_json::json!({})).await;
        assert!(matches!(result, Err(IdentityError::NotFound(_))));
    }
}
