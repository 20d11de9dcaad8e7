use serde::{Deserialize, Serialize};
use shroud_domain::constants::{ARCHIVE_RETENTION_DAYS, FREE_API_KEY_LIMIT, FREE_PROFILE_LIMIT};
use shroud_vault::KdfParams;
use std::time::Duration;

/// Tunables of the store, loadable as the `store` section of the settings file.
///
/// Every default matches the persisted-data contract; only tests and diagnostics
/// should lower the work factors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// How long a loaded config is served from memory.
    pub cache_ttl_ms: u64,
    /// How long key derivation waits for an identity to appear.
    pub identity_wait_ms: u64,
    /// PBKDF2 rounds for identity-derived keys.
    pub kdf_iterations: u32,
    /// PBKDF2 rounds for the legacy key scheme.
    pub legacy_kdf_iterations: u32,
    pub archive_retention_days: i64,
    pub free_api_key_limit: usize,
    pub free_profile_limit: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 5_000,
            identity_wait_ms: 300,
            kdf_iterations: KdfParams::CURRENT.iterations,
            legacy_kdf_iterations: KdfParams::LEGACY.iterations,
            archive_retention_days: ARCHIVE_RETENTION_DAYS,
            free_api_key_limit: FREE_API_KEY_LIMIT,
            free_profile_limit: FREE_PROFILE_LIMIT,
        }
    }
}

impl StoreSettings {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    #[must_use]
    pub const fn identity_wait(&self) -> Duration {
        Duration::from_millis(self.identity_wait_ms)
    }

    #[must_use]
    pub const fn current_kdf(&self) -> KdfParams {
        KdfParams::new(self.kdf_iterations)
    }

    #[must_use]
    pub const fn legacy_kdf(&self) -> KdfParams {
        KdfParams::new(self.legacy_kdf_iterations)
    }
}
