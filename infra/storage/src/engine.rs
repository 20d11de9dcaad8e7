//! File-backed store: one file per key under a single root directory.

use crate::builder::FileStoreBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::feed::{ContextId, StoreChange};
use crate::key::StoreKey;
use crate::maintenance::{self, TMP_MARKER};
use crate::store::{Entries, KeyValueStore};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    const fn extension(self) -> &'static str {
        match self {
            Self::None => "json",
            Self::Lz4 => "json.lz4",
        }
    }

    #[must_use]
    fn compress(self, data: Vec<u8>) -> Vec<u8> {
        match self {
            Self::None => data,
            Self::Lz4 => lz4_flex::compress_prepend_size(&data),
        }
    }

    fn decompress(self, data: Vec<u8>) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::None => Ok(data),
            Self::Lz4 => {
                lz4_flex::decompress_size_prepended(&data).context("Lz4 decompression failed")
            },
        }
    }
}

/// The internal shared state of a [`FileStore`].
#[derive(Debug)]
pub struct FileStoreInner {
    /// The canonicalized physical path where every key file lives.
    pub(crate) root: PathBuf,
    pub(crate) compression: Compression,
    /// A unique counter used to generate temporary file names.
    pub(crate) tmp_counter: AtomicU64,
    pub(crate) feed: broadcast::Sender<StoreChange>,
}

/// A thread-safe handle to a directory of JSON documents.
///
/// - **Atomic Writes**: each value goes to a unique temp file, is `fsync`ed, then renamed
///   over the target, so a crash never leaves a half-written document.
/// - **Key Sandbox**: keys are validated as [`StoreKey`]s before touching the filesystem.
/// - **Transparent Compression**: optional LZ4 block compression.
/// - **Self-Healing**: stale temp files are removed on connect.
///
/// Change notifications are in-process only: handles created with [`FileStore::fork`]
/// share one feed, separate processes do not see each other's writes.
///
/// # Example
///
/// ```rust
/// use shroud_storage::{FileStore, KeyValueStore, StorageError};
/// use serde_json::json;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let store = FileStore::builder().root(tmp.path().join("data")).connect().await?;
///
///     store.set_one("dataVersion", json!(2)).await?;
///     assert_eq!(store.get_one("dataVersion").await?, Some(json!(2)));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    pub(crate) inner: Arc<FileStoreInner>,
    pub(crate) origin: ContextId,
}

impl FileStore {
    #[must_use = "The store is not opened until you call .connect()"]
    pub fn builder() -> FileStoreBuilder {
        FileStoreBuilder::new()
    }

    /// A handle over the same directory and change feed that writes as `origin`.
    #[must_use]
    pub fn fork(&self, origin: ContextId) -> Self {
        Self { inner: Arc::clone(&self.inner), origin }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Physical path of the file holding `key`.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidKey`] if the key is not a valid [`StoreKey`].
    pub fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let key = StoreKey::try_from(key)?;
        Ok(self.inner.root.join(format!("{key}.{}", self.inner.compression.extension())))
    }

    /// Lists the keys currently present, sorted.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if the root cannot be listed.
    pub async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let suffix = format!(".{}", self.inner.compression.extension());
        let mut dir = fs::read_dir(&self.inner.root).await.context("Listing store root")?;
        let mut keys = Vec::new();

        while let Some(entry) = dir.next_entry().await.context("Listing store root")? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.contains(TMP_MARKER) {
                continue;
            }
            if let Some(stem) = name.strip_suffix(&suffix)
                && StoreKey::try_from(stem).is_ok()
            {
                keys.push(stem.to_owned());
            }
        }

        keys.sort_unstable();
        Ok(keys)
    }

    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.inner.root).await;
    }

    async fn read_key(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let resolved = self.resolve(key)?;

        let data = match fs::read(&resolved).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", resolved.display()).into()),
                });
            },
        };

        let data = self.inner.compression.decompress(data)?;
        let value = serde_json::from_slice(&data)
            .context(format!("Parsing {}", resolved.display()))?;
        Ok(Some(value))
    }

    async fn write_key(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let resolved = self.resolve(key)?;
        let temp = unique_tmp_path(&resolved, &self.inner.tmp_counter);

        let encoded = serde_json::to_vec(value).context(format!("Encoding {key}"))?;
        let final_data = self.inner.compression.compress(encoded);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(&final_data).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &resolved).await {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                fs::remove_file(&resolved)
                    .await
                    .context(format!("Failed to replace existing file: {}", resolved.display()))?;
                fs::rename(&temp, &resolved).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    resolved.display()
                ))?;
            } else {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }
        }

        Self::sync_dir(&self.inner.root).await;

        debug!(key, path = %resolved.display(), "Value saved atomically");
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StorageError> {
        let resolved = self.resolve(key)?;
        match fs::remove_file(&resolved).await {
            Ok(()) => {
                debug!(key, path = %resolved.display(), "Value deleted");
                Ok(true)
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", resolved.display()).into()),
            }),
        }
    }

    fn publish(&self, key: String) {
        let _ = self.inner.feed.send(StoreChange { key, origin: self.origin.clone() });
    }

    async fn sync_dir(path: &Path) {
        match fs::File::open(path).await {
            Ok(dir) => {
                if let Err(err) = dir.sync_all().await {
                    tracing::warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }
}

impl KeyValueStore for FileStore {
    fn origin(&self) -> &ContextId {
        &self.origin
    }

    async fn get(&self, keys: &[&str]) -> Result<Entries, StorageError> {
        let mut entries = Entries::new();
        for key in keys {
            if let Some(value) = self.read_key(key).await? {
                entries.insert((*key).to_owned(), value);
            }
        }
        Ok(entries)
    }

    async fn set(&self, entries: Entries) -> Result<(), StorageError> {
        // Reject the whole batch before the first write
        for key in entries.keys() {
            StoreKey::try_from(key.as_str())?;
        }
        for (key, value) in &entries {
            self.write_key(key, value).await?;
        }
        for (key, _) in entries {
            self.publish(key);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            if self.delete_key(key).await? {
                self.publish((*key).to_owned());
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.feed.subscribe()
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("store");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{counter}"))
}
