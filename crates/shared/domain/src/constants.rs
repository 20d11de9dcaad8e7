//! Logical keys in the shared key-value store.

/// The composite configuration document.
pub const CONFIG: &str = "config";
/// Encrypted JSON array of alias profiles.
pub const PROFILES: &str = "profiles";
/// Schema version flag advanced by the grouped-profile migration.
pub const DATA_VERSION: &str = "dataVersion";
/// Flat v1 alias records, encrypted under the legacy key.
pub const ALIASES: &str = "aliases";
/// Base64 PBKDF2 salt, persisted in plaintext.
pub const ENCRYPTION_SALT: &str = "_encryptionSalt";
/// Locally stored key material of the legacy scheme.
pub const ENCRYPTION_KEY_MATERIAL: &str = "_encryptionKeyMaterial";
/// Fingerprint of the key that last sealed data under the current scheme.
pub const ENCRYPTION_KEY_CHECK: &str = "_encryptionKeyCheck";
/// Encrypted snapshot of paid-tier data taken on downgrade.
pub const ARCHIVED_PRO_DATA: &str = "_archivedProData";

/// Schema version of the grouped-profile layout.
pub const CURRENT_DATA_VERSION: u32 = 2;
/// Version stamped into [`crate::UserConfig::version`].
pub const CONFIG_VERSION: u32 = 2;

/// Free tier cap on stored API keys.
pub const FREE_API_KEY_LIMIT: usize = 10;
/// Free tier cap on profiles.
pub const FREE_PROFILE_LIMIT: usize = 1;
/// Free tier cap on prompt templates.
pub const FREE_TEMPLATE_LIMIT: i32 = 3;
/// Days an archive stays restorable.
pub const ARCHIVE_RETENTION_DAYS: i64 = 90;
