//! # Profile Store
//!
//! Alias profiles persisted as one sealed JSON array under `profiles`. Every write
//! replaces the whole blob.
//!
//! Reads fall back to the legacy key scheme while legacy material exists. A context
//! with an identity session migrates the blob on the spot; other contexts return the
//! data and leave the migration to a context that can perform it.

pub mod variations;

use crate::config::ConfigStore;
use crate::encryption::{EncryptionEngine, KeyScheme};
use crate::error::{DecryptFault, StoreError};
use crate::migration::key_scheme::{self, Opened};
use crate::settings::StoreSettings;
use serde_json::Value;
use shroud_domain::constants::PROFILES;
use shroud_domain::tier::{AiService, PiiType};
use shroud_domain::{AliasProfile, IdentityData, ProfileDraft, ProfileMetadata, ProfilePatch, ProfileSettings, Variations};
use shroud_kernel::safe_nanoid;
use shroud_kernel::time::now_millis;
use shroud_storage::KeyValueStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct ProfileInner<S> {
    store: S,
    engine: EncryptionEngine<S>,
    config: ConfigStore<S>,
    settings: Arc<StoreSettings>,
}

pub struct ProfileStore<S> {
    inner: Arc<ProfileInner<S>>,
}

impl<S> Clone for ProfileStore<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S> fmt::Debug for ProfileStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileStore").finish_non_exhaustive()
    }
}

fn variations_of(real: &IdentityData, alias: &IdentityData) -> Variations {
    Variations {
        real: variations::identity_variations(real),
        alias: variations::identity_variations(alias),
    }
}

impl<S: KeyValueStore> ProfileStore<S> {
    #[must_use]
    pub fn new(
        store: S,
        engine: EncryptionEngine<S>,
        config: ConfigStore<S>,
        settings: Arc<StoreSettings>,
    ) -> Self {
        Self { inner: Arc::new(ProfileInner { store, engine, config, settings }) }
    }

    /// Decrypts all profiles. An absent blob is an empty list.
    ///
    /// # Errors
    /// * [`StoreError::KeyUnavailable`] If no identity exists and the legacy key cannot open the blob.
    /// * [`StoreError::DecryptionFailed`] If neither key opens the blob.
    pub async fn load(&self) -> Result<Vec<AliasProfile>, StoreError> {
        let Some(raw) = self.inner.store.get_one(PROFILES).await? else {
            return Ok(Vec::new());
        };
        let Value::String(blob) = raw else {
            return Err(StoreError::decryption_failed(DecryptFault::Malformed, "Profiles value is not a sealed blob"));
        };

        let Opened { value: profiles, scheme } = key_scheme::open_any::<S, Vec<AliasProfile>>(&self.inner.engine, &blob)
            .await
            .inspect_err(|err| match err {
                StoreError::KeyUnavailable { .. } => debug!("Profiles locked until an identity is available"),
                err => warn!(error_kind = err.kind(), fault = ?err.decrypt_fault(), "Profiles could not be opened"),
            })?;

        if scheme == KeyScheme::Legacy {
            self.migrate_legacy_blob(&profiles).await?;
        }
        Ok(profiles)
    }

    async fn migrate_legacy_blob(&self, profiles: &[AliasProfile]) -> Result<(), StoreError> {
        if !self.inner.engine.identity().has_session() {
            debug!("Profiles read with the legacy key; migration deferred to a signed-in context");
            return Ok(());
        }

        self.save(profiles).await?;
        info!(count = profiles.len(), "Profiles migrated to the identity key");
        key_scheme::retire_legacy_material_if_safe(&self.inner.engine, &self.inner.store).await?;
        Ok(())
    }

    /// Seals `profiles` and replaces the stored blob.
    pub async fn save(&self, profiles: &[AliasProfile]) -> Result<(), StoreError> {
        let blob = self.inner.engine.encrypt(profiles).await?;
        self.inner.store.set_one(PROFILES, Value::String(blob.into_string())).await?;
        debug!(count = profiles.len(), "Profiles saved");
        Ok(())
    }

    /// # Errors
    /// [`StoreError::FreeTierLimit`] If a free account already has its profile.
    pub async fn create_profile(&self, draft: ProfileDraft) -> Result<AliasProfile, StoreError> {
        let free = self.inner.config.tier().await?.is_free();
        let mut profiles = self.load().await?;

        let limit = self.inner.settings.free_profile_limit;
        if free && profiles.len() >= limit {
            return Err(StoreError::free_tier_limit(format!(
                "Free tier limited to {limit} profile. Upgrade to PRO for unlimited profiles."
            )));
        }

        let profile = AliasProfile {
            id: safe_nanoid!(),
            profile_name: draft.profile_name,
            description: draft.description,
            enabled: draft.enabled.unwrap_or(true),
            variations: (!free).then(|| variations_of(&draft.real, &draft.alias)),
            real: draft.real,
            alias: draft.alias,
            metadata: ProfileMetadata::new(now_millis()),
            settings: ProfileSettings { enable_variations: !free, ..ProfileSettings::default() },
        };
        profiles.push(profile.clone());
        self.save(&profiles).await?;

        info!(profile_id = %profile.id, variations = profile.variations.is_some(), "Profile created");
        Ok(profile)
    }

    /// Merges `patch` into the profile with `id`. Returns `None` if there is none.
    ///
    /// Replacing `real` or `alias` regenerates variations on paid tiers and drops them
    /// on the free tier.
    pub async fn update_profile(&self, id: &str, patch: ProfilePatch) -> Result<Option<AliasProfile>, StoreError> {
        let mut profiles = self.load().await?;
        let Some(profile) = profiles.iter_mut().find(|p| p.id == id) else {
            debug!(profile_id = id, "Profile not found, nothing to update");
            return Ok(None);
        };

        let regenerate = patch.touches_identity();
        let ProfilePatch { profile_name, description, enabled, real, alias, settings } = patch;
        if let Some(name) = profile_name {
            profile.profile_name = name;
        }
        if description.is_some() {
            profile.description = description;
        }
        if let Some(enabled) = enabled {
            profile.enabled = enabled;
        }
        if let Some(real) = real {
            profile.real = real;
        }
        if let Some(alias) = alias {
            profile.alias = alias;
        }
        if let Some(settings) = settings {
            profile.settings.merge(settings);
        }
        profile.metadata.updated_at = now_millis();

        if regenerate {
            let free = self.inner.config.tier().await?.is_free();
            profile.variations = (!free).then(|| variations_of(&profile.real, &profile.alias));
        }

        let updated = profile.clone();
        self.save(&profiles).await?;
        debug!(profile_id = id, regenerate, "Profile updated");
        Ok(Some(updated))
    }

    /// Returns false when no profile had `id`.
    pub async fn delete_profile(&self, id: &str) -> Result<bool, StoreError> {
        let mut profiles = self.load().await?;
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        if profiles.len() == before {
            return Ok(false);
        }

        self.save(&profiles).await?;
        info!(profile_id = id, "Profile deleted");
        Ok(true)
    }

    /// Flips `enabled` and returns the new state, or `None` for an unknown id.
    pub async fn toggle_profile(&self, id: &str) -> Result<Option<bool>, StoreError> {
        let Some(current) = self.get_profile(id).await? else {
            return Ok(None);
        };
        let patch = ProfilePatch { enabled: Some(!current.enabled), ..ProfilePatch::default() };
        Ok(self.update_profile(id, patch).await?.map(|p| p.enabled))
    }

    pub async fn get_profile(&self, id: &str) -> Result<Option<AliasProfile>, StoreError> {
        Ok(self.load().await?.into_iter().find(|p| p.id == id))
    }

    /// Counts one substitution made with the profile.
    ///
    /// Read-modify-write without coordination: two contexts counting at once may lose
    /// an increment. Unknown ids are ignored.
    pub async fn increment_usage(&self, id: &str, service: AiService, pii: PiiType) -> Result<(), StoreError> {
        let mut profiles = self.load().await?;
        let Some(profile) = profiles.iter_mut().find(|p| p.id == id) else {
            return Ok(());
        };

        let usage = &mut profile.metadata.usage_stats;
        usage.total_substitutions += 1;
        usage.last_used = now_millis();
        if let Some(count) = usage.by_service.get_mut(service) {
            *count += 1;
        }
        *usage.by_pii_type.get_mut(pii) += 1;

        self.save(&profiles).await
    }
}
