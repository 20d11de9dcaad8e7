//! # Tier Archive
//!
//! A downgrade parks paid-tier data in one sealed record under `_archivedProData`
//! and resets the account to a clean free state. Upgrading again within the
//! retention window restores it. Only one record exists at a time; a new archive
//! replaces the previous one.

use crate::config::{ConfigStore, defaults};
use crate::encryption::EncryptionEngine;
use crate::error::{StoreError, StoreErrorExt};
use crate::profiles::ProfileStore;
use crate::settings::StoreSettings;
use serde::{Deserialize, Serialize};
use shroud_domain::constants::ARCHIVED_PRO_DATA;
use shroud_domain::{ArchiveRecord, ArchiveStats, ArchivedPayload, CustomRulesConfig, Tier};
use shroud_kernel::time::{add_days, now_millis};
use shroud_storage::KeyValueStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What an upgrade found in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePreview {
    pub has_archive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_info: Option<ArchiveStats>,
}

pub struct TierArchive<S> {
    store: S,
    engine: EncryptionEngine<S>,
    config: ConfigStore<S>,
    profiles: ProfileStore<S>,
    settings: Arc<StoreSettings>,
}

impl<S> fmt::Debug for TierArchive<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierArchive")
            .field("retention_days", &self.settings.archive_retention_days)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> TierArchive<S> {
    #[must_use]
    pub fn new(
        store: S,
        engine: EncryptionEngine<S>,
        config: ConfigStore<S>,
        profiles: ProfileStore<S>,
        settings: Arc<StoreSettings>,
    ) -> Self {
        Self { store, engine, config, profiles, settings }
    }

    /// Seals profiles, custom templates, custom rules, settings and stats into a new
    /// record for `user_id`. Live data is left as it is.
    ///
    /// # Errors
    /// * [`StoreError::KeyUnavailable`] If no identity exists.
    pub async fn archive(&self, user_id: &str) -> Result<ArchiveRecord, StoreError> {
        let profiles = self.profiles.load().await?;
        let config = self.config.load().await?;

        let payload = match config.as_deref() {
            Some(config) => ArchivedPayload {
                profiles,
                custom_templates: config
                    .prompt_templates
                    .as_ref()
                    .map(|t| t.custom().cloned().collect())
                    .unwrap_or_default(),
                custom_rules: config.custom_rules.as_ref().map(|r| r.rules.clone()).unwrap_or_default(),
                settings: config.settings.clone(),
                stats: config.stats.clone(),
            },
            None => ArchivedPayload {
                profiles,
                custom_templates: Vec::new(),
                custom_rules: Vec::new(),
                settings: Default::default(),
                stats: Default::default(),
            },
        };

        let now = now_millis();
        let record = ArchiveRecord {
            user_id: user_id.to_owned(),
            archived_at: now,
            expires_at: add_days(now, self.settings.archive_retention_days),
            encrypted_data: self.engine.encrypt(&payload).await?.into_string(),
        };
        let value = serde_json::to_value(&record).context("Encoding archive record")?;
        self.store.set_one(ARCHIVED_PRO_DATA, value).await?;

        info!(
            profiles = payload.profiles.len(),
            templates = payload.custom_templates.len(),
            rules = payload.custom_rules.len(),
            "Paid-tier data archived"
        );
        Ok(record)
    }

    /// The record for `user_id`, if one exists and has not expired.
    ///
    /// An expired record is deleted on the way.
    pub async fn get_archived_data(&self, user_id: &str) -> Result<Option<ArchiveRecord>, StoreError> {
        let Some(raw) = self.store.get_one(ARCHIVED_PRO_DATA).await? else {
            return Ok(None);
        };
        let record: ArchiveRecord = serde_json::from_value(raw).context("Parsing archive record")?;

        if !record.belongs_to(user_id) {
            debug!("Archive belongs to another account");
            return Ok(None);
        }
        if record.is_expired(now_millis()) {
            self.clear().await?;
            info!(expired_at = record.expires_at, "Expired archive removed");
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn open(&self, record: &ArchiveRecord) -> Result<ArchivedPayload, StoreError> {
        self.engine.decrypt(&record.encrypted_data).await
    }

    /// Writes the archived data back and deletes the record.
    ///
    /// Returns false when there is nothing to restore for `user_id`.
    pub async fn restore(&self, user_id: &str) -> Result<bool, StoreError> {
        let Some(record) = self.get_archived_data(user_id).await? else {
            debug!("No archive to restore");
            return Ok(false);
        };
        let payload = self.open(&record).await?;
        let (profile_count, template_count, rule_count) =
            (payload.profiles.len(), payload.custom_templates.len(), payload.custom_rules.len());

        self.profiles.save(&payload.profiles).await?;

        if let Some(config) = self.config.load().await? {
            let mut config = Arc::unwrap_or_clone(config);
            let now = now_millis();
            let tier = config.tier();

            let templates =
                config.prompt_templates.get_or_insert_with(|| defaults::templates_config(tier, now));
            templates.templates = defaults::starter_templates(now);
            templates.templates.extend(payload.custom_templates);

            config.custom_rules = Some(CustomRulesConfig { enabled: true, rules: payload.custom_rules });
            config.sealed.custom_rules = None;
            config.settings = payload.settings;
            config.stats = payload.stats;
            config.sealed.activity_logs = None;

            self.config.save(config).await?;
        }

        self.clear().await?;
        info!(profiles = profile_count, templates = template_count, rules = rule_count, "Archive restored");
        Ok(true)
    }

    /// Counts in the archive for `user_id`, without restoring anything.
    pub async fn get_stats(&self, user_id: &str) -> Result<Option<ArchiveStats>, StoreError> {
        let Some(record) = self.get_archived_data(user_id).await? else {
            return Ok(None);
        };
        let payload = self.open(&record).await?;

        Ok(Some(ArchiveStats {
            archived_at: record.archived_at,
            expires_at: record.expires_at,
            profile_count: payload.profiles.len(),
            template_count: payload.custom_templates.len(),
            rule_count: payload.custom_rules.len(),
        }))
    }

    /// Archives paid-tier data, then resets the account to the free tier: no profiles,
    /// starter templates only, custom rules off and empty, API keys trimmed to the free
    /// cap, substitution count and activity log cleared.
    pub async fn downgrade(&self, user_id: &str) -> Result<ArchiveRecord, StoreError> {
        let record = self.archive(user_id).await?;
        self.profiles.save(&[]).await?;

        if let Some(config) = self.config.load().await? {
            let mut config = Arc::unwrap_or_clone(config);
            let now = now_millis();
            config.account.tier = Tier::Free;

            let templates = config.prompt_templates.get_or_insert_with(|| defaults::templates_config(Tier::Free, now));
            templates.templates = defaults::starter_templates(now);
            templates.max_templates = defaults::max_templates(Tier::Free);

            config.custom_rules = Some(CustomRulesConfig { enabled: false, rules: Vec::new() });
            config.sealed.custom_rules = None;

            let limit = self.settings.free_api_key_limit;
            let vault_locked = config.sealed.api_key_vault.is_some();
            match config.api_key_vault.as_mut() {
                Some(vault) if !vault_locked => vault.keys.truncate(limit),
                _ => debug!("API key vault sealed or absent, keys left untrimmed"),
            }

            config.stats.total_substitutions = 0;
            config.stats.activity_log.clear();
            config.sealed.activity_logs = None;

            self.config.save(config).await?;
        }

        info!("Account reset to the free tier");
        Ok(record)
    }

    /// Moves the account to `tier` and previews the archive available for restoration.
    pub async fn upgrade(&self, user_id: &str, tier: Tier) -> Result<UpgradePreview, StoreError> {
        if let Some(config) = self.config.load().await? {
            let mut config = Arc::unwrap_or_clone(config);
            config.account.tier = tier;
            if let Some(templates) = config.prompt_templates.as_mut() {
                templates.max_templates = defaults::max_templates(tier);
            }
            self.config.save(config).await?;
        }

        let archive_info = self.get_stats(user_id).await?;
        info!(%tier, has_archive = archive_info.is_some(), "Account upgraded");
        Ok(UpgradePreview { has_archive: archive_info.is_some(), archive_info })
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&[ARCHIVED_PRO_DATA]).await?;
        Ok(())
    }
}
