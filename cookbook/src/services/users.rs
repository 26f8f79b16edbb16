use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use cookbook_core::auth::{AuthenticatedUser, Credentials};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Username must not be longer than {} characters", MAX_USERNAME_LENGTH)]
    UsernameTooLong,

    #[error("Password must be at least {} characters long", MIN_PASSWORD_LENGTH)]
    PasswordTooShort,

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Could not hash password: {0}")]
    Hashing(String),
}

/// Account store consulted by the login and registration handlers
#[async_trait]
pub trait UserDirectory: Send + Sync + fmt::Debug {
    /// `None` for unknown users and wrong passwords alike
    async fn authenticate(&self, credentials: &Credentials) -> Option<AuthenticatedUser>;

    async fn register(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthenticatedUser, RegistrationError>;
}

/// Process-local accounts with bcrypt hashes.
///
/// Hashing and verification run on the blocking pool, bcrypt is slow on purpose.
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, String>>,
    hash_cost: u32,
}

impl InMemoryUserDirectory {
    pub fn new(users: HashMap<String, String>, hash_cost: u32) -> Self {
        Self {
            users: RwLock::new(users),
            hash_cost,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    fn validate(credentials: &Credentials) -> Result<String, RegistrationError> {
        let username = credentials.username.trim();
        if username.is_empty() {
            return Err(RegistrationError::EmptyUsername);
        }
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(RegistrationError::UsernameTooLong);
        }
        if credentials.password.len() < MIN_PASSWORD_LENGTH {
            return Err(RegistrationError::PasswordTooShort);
        }
        Ok(username.to_string())
    }
}

impl fmt::Debug for InMemoryUserDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryUserDirectory")
            .field("hash_cost", &self.hash_cost)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn authenticate(&self, credentials: &Credentials) -> Option<AuthenticatedUser> {
        let username = credentials.username.trim();
        let hash = self.users.read().await.get(username).cloned()?;

        let password = credentials.password.clone();
        let verified =
            tokio::task::spawn_blocking(move || bcrypt::verify(password.expose_secret(), &hash))
                .await;

        match verified {
            Ok(Ok(true)) => Some(AuthenticatedUser {
                username: username.to_string(),
            }),
            Ok(Ok(false)) => None,
            Ok(Err(e)) => {
                warn!(username = %username, "Stored password hash is invalid: {}", e);
                None
            }
            Err(e) => {
                warn!("Password verification task failed: {}", e);
                None
            }
        }
    }

    async fn register(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthenticatedUser, RegistrationError> {
        let username = Self::validate(credentials)?;
        if self.users.read().await.contains_key(&username) {
            return Err(RegistrationError::UserAlreadyExists(username));
        }

        let password = credentials.password.clone();
        let cost = self.hash_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password.expose_secret(), cost))
            .await
            .map_err(|e| RegistrationError::Hashing(e.to_string()))?
            .map_err(|e| RegistrationError::Hashing(e.to_string()))?;

        // Hashing happened without the lock, someone may have been faster.
        let mut users = self.users.write().await;
        if users.contains_key(&username) {
            debug!(username = %username, "Lost registration race");
            return Err(RegistrationError::UserAlreadyExists(username));
        }
        users.insert(username.clone(), hash);
        info!(username = %username, "Registered new user");

        Ok(AuthenticatedUser { username })
    }
}
