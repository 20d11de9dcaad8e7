//! Per-field sealing of the config document.

use crate::encryption::EncryptionEngine;
use crate::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shroud_domain::config::AccountIdentity;
use shroud_domain::{ActivityLogEntry, ApiKeyVault, CustomRulesConfig, UserConfig};
use shroud_storage::KeyValueStore;
use tracing::{debug, warn};

/// How an already present sibling is treated when sealing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealMode {
    /// Plaintext is authoritative and replaces the sibling.
    Replace,
    /// Only fields without a sibling are sealed.
    FillMissing,
}

async fn seal_field<S, T>(
    engine: &EncryptionEngine<S>,
    slot: &mut Option<String>,
    value: &T,
    field: &'static str,
) -> Result<(), StoreError>
where
    S: KeyValueStore,
    T: Serialize + ?Sized,
{
    *slot = Some(engine.encrypt(value).await?.into_string());
    debug!(field, "Sealed config field");
    Ok(())
}

/// Moves every non-empty sensitive field into its sibling and blanks the plaintext.
pub(super) async fn seal<S: KeyValueStore>(
    engine: &EncryptionEngine<S>,
    mut config: UserConfig,
    mode: SealMode,
) -> Result<UserConfig, StoreError> {
    let open = |slot: &Option<String>| mode == SealMode::Replace || slot.is_none();

    if let Some(vault) = config.api_key_vault.as_mut()
        && !vault.keys.is_empty()
        && open(&config.sealed.api_key_vault)
    {
        seal_field(engine, &mut config.sealed.api_key_vault, &*vault, "apiKeyVault").await?;
        vault.keys.clear();
    }

    if let Some(rules) = config.custom_rules.as_mut()
        && !rules.rules.is_empty()
        && open(&config.sealed.custom_rules)
    {
        seal_field(engine, &mut config.sealed.custom_rules, &*rules, "customRules").await?;
        rules.rules.clear();
    }

    if !config.stats.activity_log.is_empty() && open(&config.sealed.activity_logs) {
        seal_field(engine, &mut config.sealed.activity_logs, &config.stats.activity_log, "activityLog")
            .await?;
        config.stats.activity_log.clear();
    }

    if config.account.has_identity() && open(&config.sealed.account_data) {
        let identity = config.account.take_identity();
        seal_field(engine, &mut config.sealed.account_data, &identity, "account").await?;
    }

    Ok(config)
}

/// True when some sensitive field holds plaintext and has no sibling.
pub(super) fn has_unsealed_fields(config: &UserConfig) -> bool {
    let sealed = &config.sealed;
    (config.api_key_vault.as_ref().is_some_and(|v| !v.keys.is_empty()) && sealed.api_key_vault.is_none())
        || (config.custom_rules.as_ref().is_some_and(|r| !r.rules.is_empty())
            && sealed.custom_rules.is_none())
        || (!config.stats.activity_log.is_empty() && sealed.activity_logs.is_none())
        || (config.account.has_identity() && sealed.account_data.is_none())
}

/// Opens a sibling. On success the sibling is consumed; on failure it stays in place.
async fn open_field<S, T>(
    engine: &EncryptionEngine<S>,
    slot: &mut Option<String>,
    field: &'static str,
) -> Option<T>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    let blob = slot.as_deref()?;
    match engine.decrypt::<T>(blob).await {
        Ok(value) => {
            *slot = None;
            Some(value)
        },
        Err(err) if err.is_key_unavailable() => {
            debug!(field, "Config field locked: no identity");
            None
        },
        Err(err) => {
            warn!(field, error_kind = err.kind(), fault = ?err.decrypt_fault(), "Config field could not be decrypted");
            None
        },
    }
}

/// Decrypts every sibling that can be opened into the live fields.
pub(super) async fn unseal<S: KeyValueStore>(engine: &EncryptionEngine<S>, config: &mut UserConfig) {
    if let Some(vault) = open_field::<_, ApiKeyVault>(engine, &mut config.sealed.api_key_vault, "apiKeyVault").await
    {
        config.api_key_vault = Some(vault);
    } else if config.sealed.api_key_vault.is_none()
        && config.api_key_vault.as_ref().is_some_and(|v| !v.keys.is_empty())
    {
        warn!(field = "apiKeyVault", "Plaintext config field found; it is sealed on next save");
    }

    if let Some(rules) =
        open_field::<_, CustomRulesConfig>(engine, &mut config.sealed.custom_rules, "customRules").await
    {
        config.custom_rules = Some(rules);
    } else if config.sealed.custom_rules.is_none()
        && config.custom_rules.as_ref().is_some_and(|r| !r.rules.is_empty())
    {
        warn!(field = "customRules", "Plaintext config field found; it is sealed on next save");
    }

    if let Some(log) =
        open_field::<_, Vec<ActivityLogEntry>>(engine, &mut config.sealed.activity_logs, "activityLog").await
    {
        config.stats.activity_log = log;
    } else if config.sealed.activity_logs.is_none() && !config.stats.activity_log.is_empty() {
        warn!(field = "activityLog", "Plaintext config field found; it is sealed on next save");
    }

    if let Some(identity) =
        open_field::<_, AccountIdentity>(engine, &mut config.sealed.account_data, "account").await
    {
        config.account.restore_identity(identity);
    } else if config.sealed.account_data.is_none() && config.account.has_identity() {
        warn!(field = "account", "Plaintext config field found; it is sealed on next save");
    }
}
