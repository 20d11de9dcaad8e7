//! # Shroud Inspect
//!
//! Read-only diagnostics over a file-backed store, plus a way to run the startup
//! migrations against it for one identity.
//!
//! Nothing this crate reports is secret: it lists which keys and sealed fields exist,
//! never their contents.
//!
//! ## Example
//! ```no_run
//! use shroud_inspect::{DataSettings, Inspector};
//! use shroud::StoreSettings;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let inspector = Inspector::open(&DataSettings::default(), StoreSettings::default()).await?;
//! let report = inspector.report().await?;
//! assert!(report.data_version >= 1);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shroud::{Shroud, StartupState, StaticIdentity, StoreSettings};
use shroud_domain::constants::{
    ARCHIVED_PRO_DATA, CONFIG, DATA_VERSION, ENCRYPTION_KEY_CHECK, ENCRYPTION_KEY_MATERIAL,
};
use shroud_domain::{AccountInfo, ArchiveRecord, Millis, Tier};
use shroud_kernel::time::now_millis;
use shroud_logger::LogSettings;
use shroud_storage::{Compression, ContextId, FileStore, KeyValueStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Live field pointer and the sibling that holds it sealed.
const SENSITIVE_FIELDS: [(&str, &str); 3] = [
    ("/apiKeyVault/keys", "_encryptedApiKeyVault"),
    ("/customRules/rules", "_encryptedCustomRules"),
    ("/stats/activityLog", "_encryptedActivityLogs"),
];

const ACCOUNT_SIBLING: &str = "_encryptedAccountData";

/// The settings file of the binary.
///
/// ```toml
/// [log]
/// level = "debug"
///
/// [data]
/// root = "/var/lib/shroud"
/// lz4 = true
///
/// [store]
/// identity_wait_ms = 1000
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    pub log: LogSettings,
    pub data: DataSettings,
    pub store: StoreSettings,
}

/// Where the file store lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub root: PathBuf,
    /// Values were written LZ4-compressed.
    pub lz4: bool,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { root: PathBuf::from("data"), lz4: false }
    }
}

/// What is in the store, without any of its secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReport {
    pub root: PathBuf,
    pub keys: Vec<String>,
    /// Absent flag reads as 1.
    pub data_version: u64,
    pub config_version: Option<u64>,
    pub tier: Option<Tier>,
    pub sealed_fields: Vec<&'static str>,
    /// Sensitive fields stored in plaintext; sealed on the next startup with an identity.
    pub plaintext_fields: Vec<&'static str>,
    pub legacy_material: bool,
    pub key_check_recorded: bool,
    pub archive: Option<ArchiveSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    pub archived_at: Millis,
    pub expires_at: Millis,
    pub expired: bool,
}

/// Result of running startup against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub state: &'static str,
    pub profiles: usize,
    pub notice: Option<String>,
    pub data_version: u64,
}

/// An open file store.
#[derive(Debug)]
pub struct Inspector {
    store: FileStore,
    settings: StoreSettings,
}

impl Inspector {
    /// Opens an existing store root.
    ///
    /// # Errors
    /// Returns an error if the root does not exist or cannot be resolved.
    pub async fn open(data: &DataSettings, settings: StoreSettings) -> Result<Self> {
        let compression = if data.lz4 { Compression::Lz4 } else { Compression::None };
        let store = FileStore::builder()
            .root(data.root.clone())
            .create(false)
            .compression(compression)
            .origin(ContextId::new("inspect"))
            .connect()
            .await
            .with_context(|| format!("Failed to open store at {}", data.root.display()))?;

        Ok(Self { store, settings })
    }

    #[must_use]
    pub const fn store(&self) -> &FileStore {
        &self.store
    }

    /// Reads the store without deriving any key.
    ///
    /// # Errors
    /// Returns an error on I/O failures or an unparsable archive record.
    pub async fn report(&self) -> Result<StoreReport> {
        let store = &self.store;
        let keys = store.keys().await?;
        let config = store.get_one(CONFIG).await?;

        let (sealed_fields, plaintext_fields) = config.as_ref().map_or_else(Default::default, sensitive_fields);

        let archive = match store.get_one(ARCHIVED_PRO_DATA).await? {
            Some(raw) => {
                let record: ArchiveRecord = serde_json::from_value(raw).context("Parsing archive record")?;
                Some(ArchiveSummary {
                    archived_at: record.archived_at,
                    expires_at: record.expires_at,
                    expired: record.is_expired(now_millis()),
                })
            },
            None => None,
        };

        Ok(StoreReport {
            root: store.root().to_path_buf(),
            keys,
            data_version: store.get_one(DATA_VERSION).await?.and_then(|v| v.as_u64()).unwrap_or(1),
            config_version: config.as_ref().and_then(|c| c.get("version")).and_then(Value::as_u64),
            tier: config
                .as_ref()
                .and_then(|c| c.pointer("/account/tier"))
                .and_then(|t| serde_json::from_value(t.clone()).ok()),
            sealed_fields,
            plaintext_fields,
            legacy_material: store
                .get_one(ENCRYPTION_KEY_MATERIAL)
                .await?
                .as_ref()
                .and_then(Value::as_str)
                .is_some_and(|m| !m.is_empty()),
            key_check_recorded: store.get_one(ENCRYPTION_KEY_CHECK).await?.is_some(),
            archive,
        })
    }

    /// Runs the startup sequence as the identity owning `secret`.
    ///
    /// # Errors
    /// Storage failures. Locked and unreadable stores are reported, not errors.
    pub async fn migrate(&self, secret: String) -> Result<MigrationSummary> {
        let shroud = Shroud::new(self.store.clone(), Arc::new(StaticIdentity::new(secret)), self.settings.clone());
        let state = shroud.initialize().await.context("Startup failed")?;
        let data_version = shroud.migrations().data_version().await?;

        let summary = match state {
            StartupState::Ready { profiles } => {
                info!(profiles = profiles.len(), data_version, "Store migrated");
                MigrationSummary { state: "ready", profiles: profiles.len(), notice: None, data_version }
            },
            StartupState::Locked => {
                warn!("No identity available, nothing migrated");
                MigrationSummary { state: "locked", profiles: 0, notice: None, data_version }
            },
            StartupState::Recovered { notice, fault } => {
                warn!(%fault, "Stored data did not open with this identity");
                MigrationSummary { state: "recovered", profiles: 0, notice: Some(notice), data_version }
            },
        };
        Ok(summary)
    }
}

fn sensitive_fields(config: &Value) -> (Vec<&'static str>, Vec<&'static str>) {
    let mut sealed = Vec::new();
    let mut plaintext = Vec::new();

    for (live, sibling) in SENSITIVE_FIELDS {
        if config.get(sibling).is_some_and(Value::is_string) {
            sealed.push(sibling);
        }
        if config.pointer(live).is_some_and(|v| !is_blank(v)) {
            plaintext.push(&live[1..]);
        }
    }

    if config.get(ACCOUNT_SIBLING).is_some_and(Value::is_string) {
        sealed.push(ACCOUNT_SIBLING);
    }
    let account = config.get("account").cloned().and_then(|a| serde_json::from_value::<AccountInfo>(a).ok());
    if account.is_some_and(|a| a.has_identity()) {
        plaintext.push("account");
    }
    (sealed, plaintext)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
