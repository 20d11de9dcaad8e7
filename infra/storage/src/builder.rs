use crate::engine::{Compression, FileStore, FileStoreInner};
use crate::error::{StorageError, StorageErrorExt};
use crate::feed::{ContextId, FEED_CAPACITY};
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Clone)]
struct FileStoreConfig {
    compression: Compression,
    create: bool,
    origin: ContextId,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self { compression: Compression::None, create: true, origin: ContextId::new("main") }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct FileStoreBuilder<S: Sealed = NoRoot> {
    state: S,
    config: FileStoreConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> FileStoreBuilder<S> {
    #[must_use = "Sets compression for stored values"]
    pub const fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    #[must_use = "Sets whether the root directory should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    #[must_use = "Sets the context this handle writes as"]
    pub fn origin(mut self, origin: ContextId) -> Self {
        self.config.origin = origin;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> FileStoreBuilder<N> {
        FileStoreBuilder { state, config: self.config }
    }
}

impl FileStoreBuilder<NoRoot> {
    #[must_use = "Creates a new file store builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory of the file store"]
    pub fn root(self, path: impl Into<PathBuf>) -> FileStoreBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl FileStoreBuilder<WithRoot> {
    /// Consumes the configuration and opens the store.
    ///
    /// Boot sequence:
    /// 1. **Bootstrapping**: Creates the root directory if `create(true)` was set.
    /// 2. **Canonicalization**: Resolves the root to an absolute, physical path.
    /// 3. **Self-Healing**: Removes stale temporary files left by interrupted writes.
    ///
    /// Cleanup failures are logged and do not abort the connection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root does not exist and `create` is false, or if
    /// it cannot be created or resolved.
    pub async fn connect(self) -> Result<FileStore, StorageError> {
        let root = &self.state.0;

        if self.config.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap store root: {}", root.display()))?;
            info!(path = %root.display(), "Bootstrapped store root directory");
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve store root: {}", root.display()))?;

        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        let store = FileStore {
            inner: Arc::new(FileStoreInner {
                root: canonical,
                compression: self.config.compression,
                tmp_counter: AtomicU64::new(1),
                feed,
            }),
            origin: self.config.origin,
        };

        store.purge_tmp().await;

        Ok(store)
    }
}
