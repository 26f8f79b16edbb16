//! Credential types shared by the login and registration endpoints.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A plain-text password as submitted by a client.
///
/// The value is zeroized on drop and never shows up in `Debug` output.
#[derive(Clone)]
pub struct Password(SecretString);

impl Password {
    pub fn new(value: String) -> Self {
        Self(SecretString::new(value.into_boxed_str()))
    }

    /// Expose the password, only for hashing and verification
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.0.expose_secret().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"********\"")
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Password::new(value))
    }
}

/// Username and password pair posted to `/login` and `/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: Password,
}

/// The account a successful login or registration resolved to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_debug_is_masked() {
        let creds: Credentials =
            serde_json::from_str(r#"{"username": "alice", "password": "hunter22"}"#).unwrap();

        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter22"));
        assert_eq!(creds.password.expose_secret(), "hunter22");
        assert_eq!(creds.password.len(), 8);
    }
}
