use fred::prelude::*;

use super::{DocumentStore, StoreError};

const KEY_PREFIX: &str = "homestead:";

/// Documents kept in a Redis-compatible server, one string value per key.
///
/// The URL follows the Redis scheme: `redis://host:port` or
/// `redis://host:port/db`.
#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
}

impl RemoteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("invalid remote store URL: {e}")))?;
        let client = Builder::from_config(config).build()?;
        client.init().await?;
        tracing::info!("Connected to remote store");
        Ok(Self { client })
    }
}

fn namespaced(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

impl DocumentStore for RemoteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(namespaced(key)).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, document: String) -> Result<(), StoreError> {
        let _: () = self
            .client
            .set(namespaced(key), document, None, None, false)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: u32 = self.client.del(namespaced(key)).await?;
        Ok(())
    }
}
