use std::{io::ErrorKind, path::PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// String keyed slots, each holding one serialized value. A slot is always overwritten in full.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when nothing was ever stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// The main realization of [KeyValueStore]. Every key maps to a `<key>.json` file inside the
/// storage directory.
pub struct FileKeyValueStore {
    storage_dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(storage_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&storage_dir)?;

        Ok(Self { storage_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.storage_dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        debug!("Reading {path:?}");
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };

        file.lock_shared()?;
        let mut value = String::new();
        let result = file.read_to_string(&mut value).await;
        file.unlock_async().await?;
        result?;

        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key);
        debug!("Writing {} bytes into {path:?}", value.len());
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        // Truncate only once the lock is held, so a concurrent reader never sees a half written
        // slot.
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.write_all(value.as_bytes()).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;
        file.unlock_async().await?;
        result?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{FileKeyValueStore, KeyValueStore};

    #[tokio::test]
    async fn test_missing_key_is_none() -> Result<()> {
        let dir = tempdir()?;
        let store = FileKeyValueStore::new(dir.path().to_owned())?;

        assert_eq!(store.get("missing").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_value() -> Result<()> {
        let dir = tempdir()?;
        let store = FileKeyValueStore::new(dir.path().join("storage"))?;

        store.set("slot", "a much longer first value".into()).await?;
        store.set("slot", "short".into()).await?;

        assert_eq!(store.get("slot").await?.as_deref(), Some("short"));
        assert!(dir.path().join("storage").join("slot.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_keys_are_independent() -> Result<()> {
        let dir = tempdir()?;
        let store = FileKeyValueStore::new(dir.path().to_owned())?;

        store.set("first", "1".into()).await?;
        store.set("second", "2".into()).await?;

        assert_eq!(store.get("first").await?.as_deref(), Some("1"));
        assert_eq!(store.get("second").await?.as_deref(), Some("2"));
        Ok(())
    }
}
