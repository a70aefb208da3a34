//! Save games keyed by user, over a pluggable document store.
//!
//! Two backends share the [`DocumentStore`] contract: [`LocalStore`] keeps one
//! JSON file per key on disk, [`RemoteStore`] keeps the same documents in a
//! Redis-compatible server. The [`PersistenceGateway`] owns the key layout
//! and the snapshot format and never cares which backend it talks to.

mod legacy;
mod local;
mod remote;

use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub use local::LocalStore;
pub use remote::RemoteStore;

use crate::config::PersistenceConfig;
use crate::world::World;

pub(crate) const SAVE_KEY_PREFIX: &str = "ee_idle_save_";
pub(crate) const USERS_KEY: &str = "ee_idle_users";
pub(crate) const CURRENT_USER_KEY: &str = "ee_idle_current";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("local store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("remote store error: {0}")]
    Remote(#[from] fred::error::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store configuration error: {0}")]
    Config(String),
}

/// Minimal string key-value contract, the shape of browser local storage.
pub trait DocumentStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn put(
        &self,
        key: &str,
        document: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Backend chosen at runtime from configuration.
pub enum StoreBackend {
    Local(LocalStore),
    Remote(RemoteStore),
}

impl StoreBackend {
    pub async fn connect(config: &PersistenceConfig) -> Result<Self, StoreError> {
        match config {
            PersistenceConfig::Local { dir } => Ok(StoreBackend::Local(LocalStore::new(dir))),
            PersistenceConfig::Remote { url } => {
                Ok(StoreBackend::Remote(RemoteStore::connect(url).await?))
            }
        }
    }
}

impl DocumentStore for StoreBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            StoreBackend::Local(store) => store.get(key).await,
            StoreBackend::Remote(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, document: String) -> Result<(), StoreError> {
        match self {
            StoreBackend::Local(store) => store.put(key, document).await,
            StoreBackend::Remote(store) => store.put(key, document).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            StoreBackend::Local(store) => store.delete(key).await,
            StoreBackend::Remote(store) => store.delete(key).await,
        }
    }
}

#[derive(Serialize)]
struct SavePayloadRef<'a> {
    game: &'a World,
    saved_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SavePayload {
    #[serde(default)]
    game: Option<Value>,
}

/// Reads either save layout into a world.
fn decode_game(game: Value) -> Result<World, serde_json::Error> {
    if legacy::is_legacy(&game) {
        let old: legacy::LegacyGame = serde_json::from_value(game)?;
        Ok(World::from(old))
    } else {
        serde_json::from_value(game)
    }
}

pub struct PersistenceGateway<S> {
    store: S,
}

impl<S: DocumentStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn save_snapshot(&self, user: &str, world: &World) -> Result<(), StoreError> {
        let payload = SavePayloadRef {
            game: world,
            saved_at: Utc::now(),
        };
        let document = serde_json::to_string(&payload)?;
        self.store.put(&save_key(user), document).await?;
        info!(user, tick = world.tick(), "Game saved");
        Ok(())
    }

    /// Returns `None` when there is no save or the save cannot be read; a
    /// damaged save means a fresh game, not an error.
    pub async fn load_snapshot(&self, user: &str) -> Result<Option<World>, StoreError> {
        let Some(document) = self.store.get(&save_key(user)).await? else {
            return Ok(None);
        };
        let decoded = serde_json::from_str::<SavePayload>(&document)
            .and_then(|payload| payload.game.map(decode_game).transpose());
        match decoded {
            Ok(world) => Ok(world),
            Err(err) => {
                warn!(user, %err, "Discarding unreadable save");
                Ok(None)
            }
        }
    }

    pub async fn delete_snapshot(&self, user: &str) -> Result<(), StoreError> {
        self.store.delete(&save_key(user)).await
    }

    pub(crate) async fn load_document<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let Some(document) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&document) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, %err, "Ignoring unreadable document");
                Ok(None)
            }
        }
    }

    pub(crate) async fn save_document<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_string(value)?;
        self.store.put(key, document).await
    }

    pub(crate) async fn delete_document(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await
    }
}

fn save_key(user: &str) -> String {
    format!("{SAVE_KEY_PREFIX}{user}")
}

/// Decides which ticks are due for a save. An interval of zero disables
/// autosaving.
#[derive(Debug, Clone)]
pub struct Autosave {
    interval_ticks: u64,
    last_saved_tick: u64,
}

impl Autosave {
    pub fn new(interval_ticks: u64, current_tick: u64) -> Self {
        Self {
            interval_ticks,
            last_saved_tick: current_tick,
        }
    }

    pub fn should_save(&self, current_tick: u64) -> bool {
        if self.interval_ticks == 0 {
            return false;
        }
        current_tick > self.last_saved_tick
            && current_tick - self.last_saved_tick >= self.interval_ticks
    }

    pub fn mark_saved(&mut self, tick: u64) {
        self.last_saved_tick = tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autosave_waits_for_interval() {
        let mut autosave = Autosave::new(30, 0);
        assert!(!autosave.should_save(0));
        assert!(!autosave.should_save(29));
        assert!(autosave.should_save(30));
        autosave.mark_saved(30);
        assert!(!autosave.should_save(45));
        assert!(autosave.should_save(61));
    }

    #[test]
    fn zero_interval_never_saves() {
        let autosave = Autosave::new(0, 0);
        assert!(!autosave.should_save(1_000));
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::new(LocalStore::new(dir.path()));
        let mut world = World::fresh();
        world.ledger_mut().wood = 12.5;
        world.ledger_mut().population_limit = 4;

        gateway.save_snapshot("ada", &world).await.unwrap();
        let loaded = gateway.load_snapshot("ada").await.unwrap();
        assert_eq!(loaded, Some(world));
        assert_eq!(gateway.load_snapshot("grace").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_save_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::new(LocalStore::new(dir.path()));
        gateway
            .store()
            .put(&save_key("ada"), "{not json".to_string())
            .await
            .unwrap();
        assert_eq!(gateway.load_snapshot("ada").await.unwrap(), None);
    }

    #[tokio::test]
    async fn payload_without_game_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::new(LocalStore::new(dir.path()));
        gateway
            .store()
            .put(&save_key("ada"), r#"{"saved_at":"2024-01-01T00:00:00Z"}"#.to_string())
            .await
            .unwrap();
        assert_eq!(gateway.load_snapshot("ada").await.unwrap(), None);
    }
}
