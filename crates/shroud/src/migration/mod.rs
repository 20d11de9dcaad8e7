//! # Migrations
//!
//! Two independent, idempotent migrations run at startup:
//!
//! 1. **Schema**: flat v1 `aliases` records become grouped `profiles`. Gated by
//!    `dataVersion`; profiles are written first, then the config, then the flag, so an
//!    interrupted run is simply repeated.
//! 2. **Key scheme**: blobs sealed with the locally stored legacy key are re-sealed
//!    under the identity key, and the legacy material is deleted once nothing needs it.
//!
//! Re-sealing needs an identity session. Contexts without one read legacy data but
//! never rewrite it.

pub(crate) mod key_scheme;
pub mod schema;

use crate::config::ConfigStore;
use crate::encryption::{EncryptionEngine, KeyScheme};
use crate::error::{StoreError, StoreErrorExt};
use crate::profiles::ProfileStore;
use key_scheme::{LEGACY_BOUND_KEYS, Opened};
use serde_json::Value;
use shroud_domain::constants::{ALIASES, CONFIG, CURRENT_DATA_VERSION, DATA_VERSION};
use shroud_domain::{AliasEntry, UserConfigV1};
use shroud_kernel::time::now_millis;
use shroud_storage::KeyValueStore;
use std::fmt;
use tracing::{debug, info, warn};

/// Result of a migration run, mapped by the caller onto a startup state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Success,
    /// Nothing could be decided without an identity.
    AuthRequired,
    /// A step failed; the store remains usable with what could be read.
    Degraded { reason: String },
}

impl MigrationOutcome {
    fn from_results(results: [Result<(), StoreError>; 2]) -> Self {
        let mut reasons = Vec::new();
        for result in results {
            match result {
                Ok(()) => {},
                Err(err) if err.is_key_unavailable() => return Self::AuthRequired,
                Err(err) => reasons.push(err.to_string()),
            }
        }
        if reasons.is_empty() { Self::Success } else { Self::Degraded { reason: reasons.join("; ") } }
    }
}

pub struct MigrationCoordinator<S> {
    store: S,
    engine: EncryptionEngine<S>,
    config: ConfigStore<S>,
    profiles: ProfileStore<S>,
}

impl<S> fmt::Debug for MigrationCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationCoordinator").finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> MigrationCoordinator<S> {
    #[must_use]
    pub fn new(store: S, engine: EncryptionEngine<S>, config: ConfigStore<S>, profiles: ProfileStore<S>) -> Self {
        Self { store, engine, config, profiles }
    }

    /// Runs the schema migration, then the key-scheme migration.
    pub async fn run(&self) -> MigrationOutcome {
        let schema = self.migrate_schema().await;
        let keys = self.migrate_key_scheme().await;
        let outcome = MigrationOutcome::from_results([schema, keys]);

        match &outcome {
            MigrationOutcome::Success => debug!("Migrations complete"),
            MigrationOutcome::AuthRequired => debug!("Migrations waiting for an identity"),
            MigrationOutcome::Degraded { reason } => warn!(reason = %reason, "Migrations degraded"),
        }
        outcome
    }

    /// The stored schema version; absent means version 1.
    pub async fn data_version(&self) -> Result<u64, StoreError> {
        Ok(self.store.get_one(DATA_VERSION).await?.and_then(|v| v.as_u64()).unwrap_or(1))
    }

    /// Converts v1 aliases into profiles. A no-op once `dataVersion` is current.
    ///
    /// # Errors
    /// * [`StoreError::KeyUnavailable`] If v1 data exists but cannot be opened yet.
    pub async fn migrate_schema(&self) -> Result<(), StoreError> {
        if self.data_version().await? >= u64::from(CURRENT_DATA_VERSION) {
            debug!("Schema already current");
            return Ok(());
        }

        let aliases = self.load_aliases().await?;
        if aliases.is_empty() {
            debug!("No v1 aliases, marking schema current");
            return self.mark_current().await;
        }

        let now = now_millis();
        let profiles = schema::group_v1(&aliases, now);
        self.profiles.save(&profiles).await.context("Writing migrated profiles")?;

        if let Some(old) = self.v1_config().await? {
            self.config.save(schema::upgrade_config(old, now)).await.context("Writing v2 config")?;
        }

        self.mark_current().await?;
        info!(aliases = aliases.len(), profiles = profiles.len(), "Migrated v1 aliases to profiles");
        Ok(())
    }

    async fn mark_current(&self) -> Result<(), StoreError> {
        self.store.set_one(DATA_VERSION, Value::from(CURRENT_DATA_VERSION)).await?;
        Ok(())
    }

    /// The stored config when it predates version 2.
    async fn v1_config(&self) -> Result<Option<UserConfigV1>, StoreError> {
        let Some(raw) = self.store.get_one(CONFIG).await? else {
            return Ok(None);
        };
        let version = raw.get("version").and_then(Value::as_u64).unwrap_or(1);
        if version >= 2 {
            return Ok(None);
        }
        serde_json::from_value(raw).context("Parsing v1 config").map(Some)
    }

    /// Reads the v1 `aliases` blob under either key scheme.
    ///
    /// Legacy-sealed aliases are re-sealed under the identity key when this context has
    /// a session. Unreadable aliases count as none, so the migration proceeds; only a
    /// missing identity stops it.
    pub async fn load_aliases(&self) -> Result<Vec<AliasEntry>, StoreError> {
        let Some(raw) = self.store.get_one(ALIASES).await? else {
            return Ok(Vec::new());
        };
        let Value::String(blob) = raw else {
            warn!("Aliases value is not a sealed blob, ignoring it");
            return Ok(Vec::new());
        };

        let opened = match key_scheme::open_any::<S, Vec<AliasEntry>>(&self.engine, &blob).await {
            Ok(opened) => opened,
            Err(err) if err.is_key_unavailable() => return Err(err),
            Err(err) => {
                warn!(error_kind = err.kind(), fault = ?err.decrypt_fault(), "Aliases unreadable, treating as empty");
                return Ok(Vec::new());
            },
        };

        let Opened { value: aliases, scheme } = opened;
        if scheme == KeyScheme::Legacy && self.engine.identity().has_session() {
            let sealed = self.engine.encrypt(&aliases).await?;
            self.store.set_one(ALIASES, Value::String(sealed.into_string())).await?;
            info!(count = aliases.len(), "Aliases migrated to the identity key");
        }
        Ok(aliases)
    }

    /// Re-seals every legacy-bound blob under the identity key, then retires the
    /// legacy material.
    ///
    /// # Errors
    /// * [`StoreError::KeyUnavailable`] If legacy data remains and no session exists.
    /// * [`StoreError::MigrationIncomplete`] If a blob opens under neither key.
    pub async fn migrate_key_scheme(&self) -> Result<(), StoreError> {
        if !self.engine.has_legacy_material().await? {
            return Ok(());
        }

        let entries = self.store.get(&LEGACY_BOUND_KEYS).await?;
        for (key, value) in entries {
            let Value::String(blob) = value else {
                continue;
            };

            let Opened { value, scheme } = match key_scheme::open_any::<S, Value>(&self.engine, &blob).await {
                Ok(opened) => opened,
                Err(err) if err.is_key_unavailable() => return Err(err),
                Err(err) => {
                    return Err(StoreError::MigrationIncomplete {
                        message: format!("{key} opens under neither key scheme: {err}").into(),
                        context: None,
                    });
                },
            };
            if scheme == KeyScheme::Current {
                continue;
            }
            if !self.engine.identity().has_session() {
                return Err(StoreError::key_unavailable(format!("{key} needs a signed-in identity to migrate")));
            }

            let sealed = self.engine.encrypt(&value).await?;
            self.store.set_one(&key, Value::String(sealed.into_string())).await?;
            info!(key = key.as_str(), "Blob migrated to the identity key");
        }

        key_scheme::retire_legacy_material_if_safe(&self.engine, &self.store).await?;
        Ok(())
    }
}
