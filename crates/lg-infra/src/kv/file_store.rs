//! File-based key-value store
//!
//! Persists each key as its own small file under a base directory, so the
//! two gate records never share a write. Writes go to a temporary sibling
//! first and are renamed into place, which makes each key's update atomic.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use lg_core::ports::{KeyValueStoreError, KeyValueStorePort};

pub const DEFAULT_STORE_DIR: &str = "kv";

const RECORD_EXTENSION: &str = "json";

pub struct FileKeyValueStore {
    base_dir: PathBuf,
}

impl FileKeyValueStore {
    /// Create store rooted at `base_dir`
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Create store under `<data_dir>/kv`
    pub fn with_defaults(data_dir: &Path) -> Self {
        Self {
            base_dir: data_dir.join(DEFAULT_STORE_DIR),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{RECORD_EXTENSION}", sanitize_key(key)))
    }

    async fn ensure_base_dir(&self, key: &str) -> Result<(), KeyValueStoreError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| KeyValueStoreError::io(key, format!("create dir failed: {e}")))
    }
}

/// Map a logical key onto a portable file stem.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl KeyValueStorePort for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError> {
        let path = self.record_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(KeyValueStoreError::io(key, format!("read failed: {e}"))),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(content))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KeyValueStoreError> {
        self.ensure_base_dir(key).await?;

        let path = self.record_path(key);
        let tmp_path = path.with_extension(format!("{RECORD_EXTENSION}.tmp"));

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| KeyValueStoreError::io(key, format!("create failed: {e}")))?;

        file.write_all(value.as_bytes())
            .await
            .map_err(|e| KeyValueStoreError::io(key, format!("write failed: {e}")))?;

        file.sync_all()
            .await
            .map_err(|e| KeyValueStoreError::io(key, format!("sync failed: {e}")))?;

        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| KeyValueStoreError::io(key, format!("rename failed: {e}")))?;

        debug!(key, path = %path.display(), "kv record written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KeyValueStoreError> {
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => {
                debug!(key, "kv record deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KeyValueStoreError::io(key, format!("remove failed: {e}"))),
        }
    }
}
