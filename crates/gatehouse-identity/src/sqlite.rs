//! SQLite-backed identity store
//!
//! Uniqueness is enforced by the schema, not by this module: a
//! `UNIQUE(provider, provider_subject_id)` constraint and a nullable
//! `UNIQUE` email column. Constraint failures are translated into
//! [`IdentityError::Conflict`] with the violated target.

use crate::error::{ConflictTarget, IdentityError, IdentityResult};
use crate::store::IdentityStore;
use crate::user::{NewUser, ProfileData, User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    provider_subject_id TEXT NOT NULL,
    display_name TEXT NOT NULL,
    email TEXT UNIQUE,
    created_at TEXT NOT NULL,
    CONSTRAINT unique_provider_identity UNIQUE (provider, provider_subject_id)
);

CREATE TABLE IF NOT EXISTS user_profile (
    user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    profile_data TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const USER_COLUMNS: &str = "id, provider, provider_subject_id, display_name, email, created_at";

/// SQLite identity store.
pub struct SqliteIdentityStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIdentityStore").finish_non_exhaustive()
    }
}

fn unavailable(err: impl std::fmt::Display) -> IdentityError {
    IdentityError::Unavailable(err.to_string())
}

fn parse_timestamp(index: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        provider: row.get(1)?,
        provider_subject_id: row.get(2)?,
        display_name: row.get(3)?,
        email: row.get(4)?,
        created_at: parse_timestamp(5, row.get(5)?)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileData> {
    let raw: String = row.get(1)?;
    let data = serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(ProfileData {
        user_id: row.get(0)?,
        data,
        updated_at: parse_timestamp(2, row.get(2)?)?,
    })
}

/// Classify an insert failure. SQLite names the violated columns in the
/// message, e.g. `UNIQUE constraint failed: users.email`.
fn insert_error(err: rusqlite::Error) -> IdentityError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            let target = match message.as_deref() {
                Some(m) if m.contains("users.email") => ConflictTarget::Email,
                _ => ConflictTarget::ProviderIdentity,
            };
            return IdentityError::Conflict(target);
        }
    }
    unavailable(err)
}

impl SqliteIdentityStore {
    /// Open (or create) a database file and bootstrap the schema.
    ///
    /// Accepts a plain path or a `sqlite:` prefixed URL.
    pub fn open(database_url: &str) -> IdentityResult<Self> {
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(unavailable)?;
                }
            }
        }

        let conn = Connection::open(path).map_err(unavailable)?;
        let store = Self::from_connection(conn)?;
        tracing::info!(path = %path, "SQLite identity store opened");
        Ok(store)
    }

    /// Create a private in-memory database.
    pub fn in_memory() -> IdentityResult<Self> {
        Self::from_connection(Connection::open_in_memory().map_err(unavailable)?)
    }

    fn from_connection(conn: Connection) -> IdentityResult<Self> {
        conn.execute_batch(SCHEMA).map_err(unavailable)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> IdentityResult<T>,
    ) -> IdentityResult<T> {
        let conn = self.conn.lock().map_err(unavailable)?;
        f(&conn)
    }

    fn find_one(&self, clause: &str, params: impl rusqlite::Params) -> IdentityResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);
        self.with_conn(|conn| {
            conn.query_row(&sql, params, user_from_row)
                .optional()
                .map_err(unavailable)
        })
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn find_by_id(&self, id: UserId) -> IdentityResult<Option<User>> {
        self.find_one("id = ?1", params![id])
    }

    async fn find_by_provider_identity(
        &self,
        provider: &str,
        subject_id: &str,
    ) -> IdentityResult<Option<User>> {
        self.find_one(
            "provider = ?1 AND provider_subject_id = ?2",
            params![provider, subject_id],
        )
    }

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<User>> {
        self.find_one("email = ?1", params![email])
    }

    async fn insert(&self, new_user: NewUser) -> IdentityResult<User> {
        let created_at = Utc::now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (provider, provider_subject_id, display_name, email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new_user.provider,
                    new_user.provider_subject_id,
                    new_user.display_name,
                    new_user.email,
                    created_at.to_rfc3339(),
                ],
            )
            .map_err(insert_error)?;

            Ok(User {
                id: conn.last_insert_rowid(),
                provider: new_user.provider,
                provider_subject_id: new_user.provider_subject_id,
                display_name: new_user.display_name,
                email: new_user.email,
                created_at,
            })
        })
    }

    async fn list_all(&self) -> IdentityResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(unavailable)?;
            let users = stmt
                .query_map([], user_from_row)
                .map_err(unavailable)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(unavailable)?;
            Ok(users)
        })
    }

    async fn delete(&self, id: UserId) -> IdentityResult<bool> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM user_profile WHERE user_id = ?1", params![id])
                .map_err(unavailable)?;
            let removed = conn
                .execute("DELETE FROM users WHERE id = ?1", params![id])
                .map_err(unavailable)?;
            Ok(removed > 0)
        })
    }

    async fn save_profile_data(
        &self,
        user_id: UserId,
        data: serde_json::Value,
    ) -> IdentityResult<ProfileData> {
        let updated_at = Utc::now();
        let raw = serde_json::to_string(&data).map_err(unavailable)?;

        self.with_conn(|conn| {
            let exists = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", params![user_id], |_| Ok(()))
                .optional()
                .map_err(unavailable)?
                .is_some();
            if !exists {
                return Err(IdentityError::NotFound(format!("user {}", user_id)));
            }

            conn.execute(
                "INSERT INTO user_profile (user_id, profile_data, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id)
                 DO UPDATE SET profile_data = excluded.profile_data, updated_at = excluded.updated_at",
                params![user_id, raw, updated_at.to_rfc3339()],
            )
            .map_err(unavailable)?;

            Ok(ProfileData {
                user_id,
                data,
                updated_at,
            })
        })
    }

    async fn profile_data(&self, user_id: UserId) -> IdentityResult<Option<ProfileData>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, profile_data, updated_at FROM user_profile WHERE user_id = ?1",
                params![user_id],
                profile_from_row,
            )
            .optional()
            .map_err(unavailable)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(provider: &str, subject_id: &str, email: Option<&str>) -> NewUser {
        NewUser {
            provider: provider.to_string(),
            provider_subject_id: subject_id.to_string(),
            display_name: format!("{} user", provider),
            email: email.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = SqliteIdentityStore::in_memory().unwrap();

        let user = store
            .insert(new_user("google", "42", Some("a@x.com")))
            .await
            .unwrap();

        let found = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.provider, "google");
        assert_eq!(found.provider_subject_id, "42");
        assert_eq!(found.email.as_deref(), Some("a@x.com"));
        assert_eq!(found.created_at.timestamp(), user.created_at.timestamp());

        assert_eq!(
            store.find_by_provider_identity("google", "42").await.unwrap().map(|u| u.id),
            Some(user.id)
        );
        assert_eq!(
            store.find_by_email("a@x.com").await.unwrap().map(|u| u.id),
            Some(user.id)
        );
        assert!(store.find_by_id(user.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_constraint_classification() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        store
            .insert(new_user("google", "42", Some("a@x.com")))
            .await
            .unwrap();

        let identity = store.insert(new_user("google", "42", None)).await;
        assert!(matches!(
            identity,
            Err(IdentityError::Conflict(ConflictTarget::ProviderIdentity))
        ));

        let email = store.insert(new_user("github", "7", Some("a@x.com"))).await;
        assert!(matches!(
            email,
            Err(IdentityError::Conflict(ConflictTarget::Email))
        ));
    }

    #[tokio::test]
    async fn test_null_emails_and_ordering() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        let first = store.insert(new_user("google", "1", None)).await.unwrap();
        let second = store.insert(new_user("github", "1", None)).await.unwrap();

        let ids: Vec<_> = store.list_all().await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_delete_and_profile_data() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        let user = store.insert(new_user("google", "42", None)).await.unwrap();

        store
            .save_profile_data(user.id, serde_json::json!({"score": 1}))
            .await
            .unwrap();
        store
            .save_profile_data(user.id, serde_json::json!({"score": 2}))
            .await
            .unwrap();
        let profile = store.profile_data(user.id).await.unwrap().unwrap();
        assert_eq!(profile.data["score"], 2);

        assert!(store.delete(user.id).await.unwrap());
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        assert!(store.profile_data(user.id).await.unwrap().is_none());

        let result = store.save_profile_data(user.id, serde_json::json!({})).await;
        assert!(matches!(result, Err(IdentityError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = std::env::temp_dir().join(format!("gatehouse-test-{}", std::process::id()));
        let path = dir.join("identity.db");
        let url = format!("sqlite:{}", path.display());

        {
            let store = SqliteIdentityStore::open(&url).unwrap();
            store.insert(new_user("google", "42", None)).await.unwrap();
        }

        let reopened = SqliteIdentityStore::open(&url).unwrap();
        assert_eq!(reopened.list_all().await.unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(dir);
    }
}
