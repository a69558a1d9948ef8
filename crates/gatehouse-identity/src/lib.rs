//! # Gatehouse Identity
//!
//! Local user records for identities issued by OAuth providers.
//!
//! ## Overview
//!
//! - **Users**: one row per `(provider, provider_subject_id)`, with an
//!   optional globally unique email
//! - **Identity stores**: the [`IdentityStore`] trait plus in-memory and
//!   SQLite backends
//! - **Reconciliation**: [`Reconciler::find_or_create`], which is safe under
//!   concurrent first logins because the store's unique constraints, not a
//!   lock, decide the winner
//!
//! ## Features
//!
//! - `memory` (default): [`MemoryIdentityStore`]
//! - `sqlite` (default): [`SqliteIdentityStore`] using rusqlite
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gatehouse_identity::{
//!     EmailConflictPolicy, ExternalProfile, MemoryIdentityStore, Reconciler,
//! };
//! use std::sync::Arc;
//!
//! async fn login() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryIdentityStore::new());
//!     let reconciler = Reconciler::new(store, EmailConflictPolicy::Reject);
//!
//!     let profile = ExternalProfile::new("google", "42").with_email("a@x.com");
//!     let user = reconciler.find_or_create(&profile).await?;
//!     assert_eq!(user.display_name, "42");
//!     Ok(())
//! }
//! ```

pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod profile;
pub mod reconciler;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store;
pub mod user;

// Re-export main types
pub use error::{ConflictTarget, IdentityError, IdentityResult};
pub use profile::ExternalProfile;
pub use reconciler::{EmailConflictPolicy, Reconciler};
pub use store::IdentityStore;
pub use user::{NewUser, ProfileData, User, UserId};

#[cfg(feature = "memory")]
pub use memory::MemoryIdentityStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteIdentityStore;
