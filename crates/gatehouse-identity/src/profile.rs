//! External identity profiles
//!
//! An [`ExternalProfile`] is what an OAuth callback hands over once the
//! provider handshake is done: who issued the identity, the subject id, and
//! whatever naming and email data the provider returned.

use crate::error::{IdentityError, IdentityResult};
use crate::user::NewUser;
use serde::{Deserialize, Serialize};

/// Provider-agnostic profile delivered by an OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProfile {
    /// Provider name
    pub provider: String,

    /// Subject id at the provider
    pub subject_id: String,

    /// Display name, if the provider supplied one
    #[serde(default)]
    pub display_name: Option<String>,

    /// Verified email addresses, preferred address first
    #[serde(default)]
    pub emails: Vec<String>,
}

impl ExternalProfile {
    /// Create a profile with no display name and no emails.
    pub fn new(provider: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            subject_id: subject_id.into(),
            display_name: None,
            emails: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Append an email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    /// Normalize into the values of a new user row.
    ///
    /// The display name falls back to the subject id and the email is the
    /// first non-blank entry of `emails`.
    pub fn normalize(&self) -> IdentityResult<NewUser> {
        let provider = self.provider.trim();
        let subject_id = self.subject_id.trim();

        if provider.is_empty() {
            return Err(IdentityError::InvalidProfile("missing provider".to_string()));
        }
        if subject_id.is_empty() {
            return Err(IdentityError::InvalidProfile("missing subject id".to_string()));
        }

        let display_name = self
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(subject_id);

        let email = self
            .emails
            .iter()
            .map(|email| email.trim())
            .find(|email| !email.is_empty())
            .map(String::from);

        Ok(NewUser {
            provider: provider.to_string(),
            provider_subject_id: subject_id.to_string(),
            display_name: display_name.to_string(),
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_subject_id() {
        let new_user = ExternalProfile::new("google", "42")
            .with_display_name("")
            .with_email("a@x.com")
            .normalize()
            .unwrap();

        assert_eq!(new_user.provider, "google");
        assert_eq!(new_user.provider_subject_id, "42");
        assert_eq!(new_user.display_name, "42");
        assert_eq!(new_user.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_absent_display_name_and_emails() {
        let new_user = ExternalProfile::new("github", "octo").normalize().unwrap();

        assert_eq!(new_user.display_name, "octo");
        assert_eq!(new_user.email, None);
    }

    #[test]
    fn test_first_email_wins() {
        let new_user = ExternalProfile::new("github", "7")
            .with_display_name("  Mona  ")
            .with_email("first@x.com")
            .with_email("second@x.com")
            .normalize()
            .unwrap();

        assert_eq!(new_user.display_name, "Mona");
        assert_eq!(new_user.email.as_deref(), Some("first@x.com"));
    }

    #[test]
    fn test_missing_subject_is_rejected() {
        let result = ExternalProfile::new("google", "  ").normalize();
        assert!(matches!(result, Err(IdentityError::InvalidProfile(_))));

        let result = ExternalProfile::new("", "42").normalize();
        assert!(matches!(result, Err(IdentityError::InvalidProfile(_))));
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let profile: ExternalProfile =
            serde_json::from_str(r#"{"provider":"google","subject_id":"42"}"#).unwrap();

        assert_eq!(profile.display_name, None);
        assert!(profile.emails.is_empty());
    }
}
