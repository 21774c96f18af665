//! Credential store: registration and username/password authentication.

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{password::PasswordHasher, Identity, StoreFuture};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

impl User {
    /// Identity payload copied into the session on login.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Outcome when attempting to persist a new user.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(User),
    Conflict,
}

/// Persistence for user records. Implementations must enforce username
/// uniqueness atomically and report a duplicate as `InsertOutcome::Conflict`.
pub trait UserStore: Send + Sync {
    fn insert<'a>(&'a self, user: &'a User) -> StoreFuture<'a, InsertOutcome>;
    /// Exact, case-sensitive lookup.
    fn find_by_username<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<User>>;
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("username and password are required")]
    InvalidInput,
    #[error("username is already taken")]
    UsernameTaken,
    #[error("user not found")]
    NotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CredentialError {
    /// `NotFound` and `WrongPassword` must look the same to clients.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::NotFound | Self::WrongPassword)
    }
}

/// A blank username is empty or whitespace only; a blank password is empty.
fn is_blank(username: &str, password: &SecretString) -> bool {
    username.trim().is_empty() || password.expose_secret().is_empty()
}

pub struct Credentials {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    // Checked on unknown usernames, hashed at the configured cost.
    dummy_hash: OnceCell<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self {
            store,
            hasher,
            dummy_hash: OnceCell::new(),
        }
    }

    async fn verify_on_blocking_pool(
        &self,
        password: &SecretString,
        hashed: String,
    ) -> anyhow::Result<bool> {
        let hasher = self.hasher;
        let plaintext = SecretString::from(password.expose_secret().to_owned());
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hashed))
            .await
            .context("password verification task failed")
    }

    async fn placeholder_hash(&self) -> anyhow::Result<String> {
        let hasher = self.hasher;
        self.dummy_hash
            .get_or_try_init(|| async move {
                let filler = SecretString::from(Uuid::new_v4().to_string());
                tokio::task::spawn_blocking(move || hasher.hash(&filler))
                    .await
                    .context("password hashing task failed")?
            })
            .await
            .cloned()
    }

    /// Create a user with a freshly salted password hash.
    ///
    /// # Errors
    /// `InvalidInput` for a blank username or empty password, `UsernameTaken`
    /// when the store reports a duplicate, `Storage` for backend failures.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<User, CredentialError> {
        if is_blank(username, password) {
            return Err(CredentialError::InvalidInput);
        }

        let hasher = self.hasher;
        let plaintext = SecretString::from(password.expose_secret().to_owned());
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .context("password hashing task failed")??;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
        };

        match self.store.insert(&user).await? {
            InsertOutcome::Created(user) => Ok(user),
            InsertOutcome::Conflict => {
                debug!("username is taken");
                Err(CredentialError::UsernameTaken)
            }
        }
    }

    /// Check a username/password pair.
    ///
    /// # Errors
    /// `NotFound` when no user has this exact username, `WrongPassword` when
    /// the hash does not match, `Storage` for backend failures.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<User, CredentialError> {
        if is_blank(username, password) {
            return Err(CredentialError::InvalidInput);
        }

        let Some(user) = self.store.find_by_username(username).await? else {
            let dummy = self.placeholder_hash().await?;
            self.verify_on_blocking_pool(password, dummy).await?;
            return Err(CredentialError::NotFound);
        };

        let is_valid = self
            .verify_on_blocking_pool(password, user.password_hash.clone())
            .await?;

        if is_valid {
            Ok(user)
        } else {
            Err(CredentialError::WrongPassword)
        }
    }
}
