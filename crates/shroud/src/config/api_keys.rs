//! API key vault operations.

use super::ConfigStore;
use super::detect::detect_key_format;
use crate::error::StoreError;
use shroud_domain::{ApiKey, ApiKeyDraft, ApiKeyFormat, ApiKeyVault, UserConfig};
use shroud_kernel::safe_nanoid;
use shroud_kernel::time::now_millis;
use shroud_storage::KeyValueStore;
use tracing::{debug, info};

/// The vault of a loaded document, created with defaults when absent.
///
/// Fails while the sealed vault could not be opened: writing the live copy back
/// would replace the keys it holds.
fn vault_mut(config: &mut UserConfig) -> Result<&mut ApiKeyVault, StoreError> {
    if config.sealed.api_key_vault.is_some() {
        return Err(StoreError::key_unavailable("API key vault is still sealed"));
    }
    Ok(config.api_key_vault.get_or_insert_with(ApiKeyVault::default))
}

impl<S: KeyValueStore> ConfigStore<S> {
    /// Registers a key, detecting its format unless the draft names one.
    ///
    /// # Errors
    /// * [`StoreError::FreeTierLimit`] If a free account already holds the maximum.
    /// * [`StoreError::ProFeatureRequired`] If a free account adds a non-OpenAI key.
    pub async fn add_api_key(&self, draft: ApiKeyDraft) -> Result<ApiKey, StoreError> {
        let mut config = self.require().await?;
        let tier = config.tier();
        let limit = self.settings().free_api_key_limit;
        let vault = vault_mut(&mut config)?;

        let format = draft.format.unwrap_or_else(|| detect_key_format(&draft.key_value));
        if tier.is_free() {
            if vault.keys.len() >= limit {
                return Err(StoreError::free_tier_limit(format!(
                    "Free tier limited to {limit} API keys. Upgrade to PRO for unlimited keys."
                )));
            }
            if format != ApiKeyFormat::Openai {
                return Err(StoreError::pro_feature(format!(
                    "{format} keys require PRO. Free tier supports OpenAI keys only."
                )));
            }
        }

        let key = ApiKey {
            id: safe_nanoid!(),
            name: draft.name,
            key_value: draft.key_value,
            format,
            created_at: now_millis(),
            last_used: 0,
            protection_count: 0,
            enabled: true,
        };
        vault.keys.push(key.clone());

        self.save(config).await?;
        info!(key_id = %key.id, %format, "API key added");
        Ok(key)
    }

    /// Removes a key. Unknown ids are ignored.
    pub async fn remove_api_key(&self, id: &str) -> Result<(), StoreError> {
        let mut config = self.require().await?;
        let vault = vault_mut(&mut config)?;
        let before = vault.keys.len();
        vault.keys.retain(|key| key.id != id);

        if vault.keys.len() != before {
            self.save(config).await?;
            info!(key_id = id, "API key removed");
        }
        Ok(())
    }

    /// Applies `update` to the key with `id`.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] If no such key exists.
    pub async fn update_api_key(
        &self,
        id: &str,
        update: impl FnOnce(&mut ApiKey),
    ) -> Result<ApiKey, StoreError> {
        let mut config = self.require().await?;
        let key = vault_mut(&mut config)?
            .keys
            .iter_mut()
            .find(|key| key.id == id)
            .ok_or_else(|| StoreError::not_found(format!("API key {id}")))?;
        update(key);
        key.id = id.to_owned();
        let key = key.clone();

        self.save(config).await?;
        debug!(key_id = id, "API key updated");
        Ok(key)
    }

    pub async fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>, StoreError> {
        Ok(self.list_api_keys().await?.into_iter().find(|key| key.id == id))
    }

    /// Keys of the vault; empty when the vault is absent or locked.
    pub async fn list_api_keys(&self) -> Result<Vec<ApiKey>, StoreError> {
        let config = self.load().await?;
        Ok(config.and_then(|c| c.api_key_vault.as_ref().map(|v| v.keys.clone())).unwrap_or_default())
    }

    /// Counts one interception of the key and stamps its last use.
    pub async fn record_api_key_protection(&self, id: &str) -> Result<(), StoreError> {
        let now = now_millis();
        self.update_api_key(id, |key| {
            key.protection_count += 1;
            key.last_used = now;
        })
        .await
        .map(drop)
    }

    /// Applies `update` to the vault settings. The key list is kept as stored.
    pub async fn update_vault_settings(
        &self,
        update: impl FnOnce(&mut ApiKeyVault),
    ) -> Result<ApiKeyVault, StoreError> {
        let mut config = self.require().await?;
        let vault = vault_mut(&mut config)?;
        let keys = std::mem::take(&mut vault.keys);
        update(vault);
        vault.keys = keys;
        let vault = vault.clone();

        self.save(config).await?;
        debug!(mode = ?vault.mode, enabled = vault.enabled, "Vault settings updated");
        Ok(vault)
    }
}
