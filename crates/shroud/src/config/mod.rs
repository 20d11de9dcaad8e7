//! # Config Store
//!
//! The single composite [`UserConfig`] document with selective field encryption and a
//! short-lived read cache.
//!
//! ## Caching
//!
//! A loaded document is kept for the configured TTL and handed out as a shared
//! [`Arc`], so two loads inside the TTL return the same allocation. Before the cache
//! is consulted, the change feed is drained: any foreign write to `config` (or lag on
//! the feed) drops the cached copy and the next load is a cold read.
//!
//! ## Locked fields
//!
//! A sealed field that cannot be opened (no identity, or another identity) stays blank
//! on the live document while its sibling is carried along, so a save from a locked
//! context writes the ciphertext back unchanged.

mod api_keys;
pub mod defaults;
pub mod detect;
mod rules;
mod sealing;
mod templates;

use crate::encryption::EncryptionEngine;
use crate::error::{StoreError, StoreErrorExt};
use crate::settings::StoreSettings;
use parking_lot::Mutex;
use shroud_domain::constants::CONFIG;
use shroud_domain::{Tier, UserConfig};
use shroud_storage::{ChangeReceiverExt, KeyValueStore, StoreChange};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

pub use sealing::SealMode;

struct Cached {
    config: Arc<UserConfig>,
    fetched_at: Instant,
}

struct ConfigInner<S> {
    store: S,
    engine: EncryptionEngine<S>,
    settings: Arc<StoreSettings>,
    cache: Mutex<Option<Cached>>,
    changes: Mutex<broadcast::Receiver<StoreChange>>,
}

/// Handle to the configuration document. Cheap to clone; clones share one cache.
pub struct ConfigStore<S> {
    inner: Arc<ConfigInner<S>>,
}

impl<S> Clone for ConfigStore<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S> fmt::Debug for ConfigStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("cached", &self.inner.cache.lock().is_some())
            .field("ttl_ms", &self.inner.settings.cache_ttl_ms)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> ConfigStore<S> {
    #[must_use]
    pub fn new(store: S, engine: EncryptionEngine<S>, settings: Arc<StoreSettings>) -> Self {
        let changes = Mutex::new(store.subscribe());
        Self {
            inner: Arc::new(ConfigInner { store, engine, settings, cache: Mutex::new(None), changes }),
        }
    }

    pub(crate) fn settings(&self) -> &StoreSettings {
        &self.inner.settings
    }

    /// Loads the document, decrypting every sealed field that can be opened.
    ///
    /// Returns `None` when no document has been written yet.
    ///
    /// # Errors
    /// * [`StoreError::Storage`] If the store cannot be read.
    /// * [`StoreError::Serialization`] If the stored document is not a config.
    ///
    /// Fields that fail to decrypt do not fail the load.
    pub async fn load(&self) -> Result<Option<Arc<UserConfig>>, StoreError> {
        if let Some(config) = self.cached() {
            return Ok(Some(config));
        }

        let Some(raw) = self.inner.store.get_one(CONFIG).await? else {
            debug!("No config stored");
            return Ok(None);
        };
        let mut config: UserConfig = serde_json::from_value(raw).context("Parsing stored config")?;
        sealing::unseal(&self.inner.engine, &mut config).await;

        if config.prompt_templates.is_none() {
            info!("Adding starter prompt templates to existing config");
            config.prompt_templates =
                Some(defaults::templates_config(config.tier(), shroud_kernel::time::now_millis()));
            return match self.save(config.clone()).await {
                Ok(saved) => Ok(Some(saved)),
                Err(err) if err.is_key_unavailable() => {
                    debug!("Starter templates kept in memory until an identity is available");
                    Ok(Some(self.remember(config)))
                },
                Err(err) => Err(err),
            };
        }

        Ok(Some(self.remember(config)))
    }

    /// Loads the document or fails with [`StoreError::NotFound`], returning an owned
    /// copy ready for mutation.
    pub async fn require(&self) -> Result<UserConfig, StoreError> {
        let config = self.load().await?.ok_or_else(|| StoreError::not_found("Config not initialized"))?;
        Ok(Arc::unwrap_or_clone(config))
    }

    /// Tier of the stored account; free when no config exists.
    pub async fn tier(&self) -> Result<Tier, StoreError> {
        Ok(self.load().await?.map_or(Tier::Free, |config| config.tier()))
    }

    /// Seals the sensitive fields of a copy, writes the copy and caches `config` as given.
    ///
    /// # Errors
    /// * [`StoreError::KeyUnavailable`] If a sensitive field holds data and no key exists.
    /// * [`StoreError::Storage`] If the write fails.
    pub async fn save(&self, config: UserConfig) -> Result<Arc<UserConfig>, StoreError> {
        let sanitized = sealing::seal(&self.inner.engine, config.clone(), SealMode::Replace).await?;
        let value = serde_json::to_value(&sanitized).context("Encoding config")?;
        self.inner.store.set_one(CONFIG, value).await?;
        debug!(sealed = !sanitized.sealed.is_empty(), "Config saved");

        Ok(self.remember(config))
    }

    /// Seals sensitive fields that older versions left in plaintext.
    ///
    /// Works on the raw document: existing siblings are neither opened nor replaced.
    /// Returns true when the document was rewritten. A missing key leaves everything as
    /// it was.
    pub async fn reseal_plaintext_fields(&self) -> Result<bool, StoreError> {
        let Some(raw) = self.inner.store.get_one(CONFIG).await? else {
            return Ok(false);
        };
        let config: UserConfig = serde_json::from_value(raw).context("Parsing stored config")?;
        if !sealing::has_unsealed_fields(&config) {
            return Ok(false);
        }

        let sealed = match sealing::seal(&self.inner.engine, config, SealMode::FillMissing).await {
            Ok(sealed) => sealed,
            Err(err) if err.is_key_unavailable() => {
                debug!("Plaintext config fields stay unsealed until an identity is available");
                return Ok(false);
            },
            Err(err) => return Err(err),
        };

        let value = serde_json::to_value(&sealed).context("Encoding config")?;
        self.inner.store.set_one(CONFIG, value).await?;
        self.invalidate();
        info!("Sealed plaintext config fields");
        Ok(true)
    }

    /// Drops the cached document.
    pub fn invalidate(&self) {
        *self.inner.cache.lock() = None;
    }

    fn cached(&self) -> Option<Arc<UserConfig>> {
        let drained = self.inner.changes.lock().drain();
        let mut cache = self.inner.cache.lock();

        if drained.touches(CONFIG, self.inner.store.origin()) && cache.take().is_some() {
            debug!(lagged = drained.lagged, "Config cache invalidated by another context");
        }

        let entry = cache.as_ref()?;
        if entry.fetched_at.elapsed() < self.inner.settings.cache_ttl() {
            Some(Arc::clone(&entry.config))
        } else {
            None
        }
    }

    fn remember(&self, config: UserConfig) -> Arc<UserConfig> {
        let config = Arc::new(config);
        *self.inner.cache.lock() = Some(Cached { config: Arc::clone(&config), fetched_at: Instant::now() });
        config
    }
}
