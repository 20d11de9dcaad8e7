//! Reading across the current and legacy key schemes.

use crate::encryption::{EncryptionEngine, KeyScheme};
use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shroud_domain::constants::{ALIASES, PROFILES};
use shroud_storage::KeyValueStore;
use tracing::{debug, info, warn};

/// Keys whose blobs may still be sealed under the legacy scheme.
pub(crate) const LEGACY_BOUND_KEYS: [&str; 2] = [ALIASES, PROFILES];

/// A decrypted value and the scheme that opened it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Opened<T> {
    pub(crate) value: T,
    pub(crate) scheme: KeyScheme,
}

/// Opens `blob` with the current key, falling back to the legacy key.
///
/// The legacy key is only tried when legacy material is stored. When both fail, the
/// error of the current-key attempt is returned.
pub(crate) async fn open_any<S, T>(engine: &EncryptionEngine<S>, blob: &str) -> Result<Opened<T>, StoreError>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    let current_err = match engine.decrypt(blob).await {
        Ok(value) => return Ok(Opened { value, scheme: KeyScheme::Current }),
        Err(err) => err,
    };

    let legacy = match engine.derive_legacy_key().await {
        Ok(Some(cipher)) => cipher,
        Ok(None) => return Err(current_err),
        Err(err) => {
            warn!(error_kind = err.kind(), "Legacy key unavailable");
            return Err(current_err);
        },
    };

    match engine.decrypt_with_key(blob, &legacy, KeyScheme::Legacy).await {
        Ok(value) => {
            debug!("Opened blob with legacy key");
            Ok(Opened { value, scheme: KeyScheme::Legacy })
        },
        Err(legacy_err) => {
            debug!(error_kind = legacy_err.kind(), "Legacy key did not open blob either");
            Err(current_err)
        },
    }
}

/// Deletes the legacy key material once nothing depends on it.
///
/// Every sealed blob under a legacy-bound key must open with the current key first.
/// Returns true when the material was removed.
pub(crate) async fn retire_legacy_material_if_safe<S: KeyValueStore>(
    engine: &EncryptionEngine<S>,
    store: &S,
) -> Result<bool, StoreError> {
    if !engine.has_legacy_material().await? {
        return Ok(false);
    }

    let entries = store.get(&LEGACY_BOUND_KEYS).await?;
    for (key, value) in &entries {
        let Some(blob) = value.as_str() else {
            continue;
        };
        if let Err(err) = engine.decrypt::<Value>(blob).await {
            info!(key = key.as_str(), error_kind = err.kind(), "Legacy key material kept: blob not yet migrated");
            return Ok(false);
        }
    }

    engine.remove_legacy_material().await?;
    info!("Legacy key material retired");
    Ok(true)
}
