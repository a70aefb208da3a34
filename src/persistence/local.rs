use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::{DocumentStore, StoreError};

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Keeps file names portable: anything outside `[A-Za-z0-9_-]` is
/// percent-encoded byte by byte.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl DocumentStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(document) => Ok(Some(document)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path, err)),
        }
    }

    async fn put(&self, key: &str, document: String) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| io_error(&self.dir, err))?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, document)
            .await
            .map_err(|err| io_error(&staging, err))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|err| io_error(&path, err))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_encoded_into_safe_file_names() {
        assert_eq!(encode_key("ee_idle_save_ada"), "ee_idle_save_ada");
        assert_eq!(encode_key("../x y"), "%2E%2E%2Fx%20y");
    }

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("nested"));
        assert_eq!(store.get("k").await.unwrap(), None);
        store.put("k", "{\"a\":1}".into()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("{\"a\":1}"));
        store.put("k", "{}".into()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("{}"));
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
