//! Player accounts and sessions, stored next to the saves.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::engine::Engine;
use crate::persistence::{
    DocumentStore, PersistenceGateway, StoreError, CURRENT_USER_KEY, USERS_KEY,
};
use crate::world::World;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("user name and password must not be empty")]
    EmptyCredentials,

    #[error("user '{0}' already exists")]
    UserExists(String),

    #[error("no account named '{0}'")]
    UnknownUser(String),

    #[error("wrong password")]
    WrongPassword,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

/// All registered accounts, persisted as one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accounts(BTreeMap<String, AccountRecord>);

impl Accounts {
    pub fn get(&self, user: &str) -> Option<&AccountRecord> {
        self.0.get(user)
    }

    pub fn contains(&self, user: &str) -> bool {
        self.0.contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A logged-in player and the world they play in.
#[derive(Debug)]
pub struct Session {
    pub user: String,
    pub world: World,
}

pub struct AccountService<S> {
    gateway: PersistenceGateway<S>,
}

impl<S: DocumentStore> AccountService<S> {
    pub fn new(gateway: PersistenceGateway<S>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub async fn accounts(&self) -> Result<Accounts, AccountError> {
        Ok(self
            .gateway
            .load_document::<Accounts>(USERS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Registers a user and starts them on a fresh game, which is saved
    /// right away.
    pub async fn signup(
        &self,
        engine: &Engine,
        user: &str,
        password: &str,
    ) -> Result<Session, AccountError> {
        let user = self.check_available(user, password).await?;
        let mut accounts = self.accounts().await?;
        accounts.0.insert(
            user.to_string(),
            AccountRecord {
                password_digest: password_digest(user, password),
                created_at: Utc::now(),
            },
        );
        self.gateway.save_document(USERS_KEY, &accounts).await?;

        let world = engine.new_world();
        self.gateway.save_snapshot(user, &world).await?;
        self.set_current(user).await?;
        info!(user, accounts = accounts.len(), "Account created");
        Ok(Session {
            user: user.to_string(),
            world,
        })
    }

    /// Checks credentials and returns the user's saved game, or a fresh one
    /// when nothing usable is stored.
    pub async fn login(
        &self,
        engine: &Engine,
        user: &str,
        password: &str,
    ) -> Result<Session, AccountError> {
        let user = self.verify(user, password).await?;
        let world = self.load_world(engine, user).await?;
        self.set_current(user).await?;
        info!(user, tick = world.tick(), "Logged in");
        Ok(Session {
            user: user.to_string(),
            world,
        })
    }

    /// Checks that `user` could sign up, without writing anything.
    /// Returns the normalized user name.
    pub async fn check_available<'a>(
        &self,
        user: &'a str,
        password: &str,
    ) -> Result<&'a str, AccountError> {
        let user = validate(user, password)?;
        if self.accounts().await?.contains(user) {
            return Err(AccountError::UserExists(user.to_string()));
        }
        Ok(user)
    }

    /// Checks credentials without touching the session or any save.
    /// Returns the normalized user name.
    pub async fn verify<'a>(&self, user: &'a str, password: &str) -> Result<&'a str, AccountError> {
        let user = validate(user, password)?;
        let accounts = self.accounts().await?;
        let record = accounts
            .get(user)
            .ok_or_else(|| AccountError::UnknownUser(user.to_string()))?;
        if record.password_digest != password_digest(user, password) {
            return Err(AccountError::WrongPassword);
        }
        Ok(user)
    }

    pub async fn logout(&self, user: &str, world: &World) -> Result<(), AccountError> {
        self.gateway.save_snapshot(user, world).await?;
        self.gateway.delete_document(CURRENT_USER_KEY).await?;
        info!(user, "Logged out");
        Ok(())
    }

    /// The user left logged in by the last session, if any.
    pub async fn resume(&self) -> Result<Option<String>, AccountError> {
        Ok(self.gateway.load_document::<String>(CURRENT_USER_KEY).await?)
    }

    /// Picks the last session back up without asking for the password.
    pub async fn resume_session(&self, engine: &Engine) -> Result<Option<Session>, AccountError> {
        let Some(user) = self.resume().await? else {
            return Ok(None);
        };
        if !self.accounts().await?.contains(&user) {
            return Ok(None);
        }
        let world = self.load_world(engine, &user).await?;
        info!(user = %user, tick = world.tick(), "Session resumed");
        Ok(Some(Session { user, world }))
    }

    async fn load_world(&self, engine: &Engine, user: &str) -> Result<World, AccountError> {
        Ok(match self.gateway.load_snapshot(user).await? {
            Some(mut world) => {
                engine.restore(&mut world);
                world
            }
            None => engine.new_world(),
        })
    }

    async fn set_current(&self, user: &str) -> Result<(), AccountError> {
        self.gateway
            .save_document(CURRENT_USER_KEY, &user.to_string())
            .await?;
        Ok(())
    }
}

fn validate<'a>(user: &'a str, password: &str) -> Result<&'a str, AccountError> {
    let user = user.trim();
    if user.is_empty() || password.is_empty() {
        return Err(AccountError::EmptyCredentials);
    }
    Ok(user)
}

/// Hex SHA-256 of the password salted with the user name.
fn password_digest(user: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
