use crate::rules::CustomRulesConfig;
use crate::templates::PromptTemplatesConfig;
use crate::tier::{AiService, PerService, Tier};
use crate::vault::ApiKeyVault;
use crate::Millis;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The composite configuration document stored under [`crate::constants::CONFIG`].
///
/// Four parts of it are sensitive and persisted only in encrypted form, each in a
/// sibling field collected in [`SealedFields`]:
///
/// | Live field                   | Sibling                  |
/// |------------------------------|--------------------------|
/// | `apiKeyVault`                | `_encryptedApiKeyVault`  |
/// | `customRules`                | `_encryptedCustomRules`  |
/// | `stats.activityLog`          | `_encryptedActivityLogs` |
/// | `account` identity fields    | `_encryptedAccountData`  |
///
/// Fields this version does not know about are kept in [`UserConfig::extra`] and
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub version: u32,
    #[serde(default)]
    pub account: AccountInfo,
    #[serde(default)]
    pub settings: GlobalSettings,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_vault: Option<ApiKeyVault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rules: Option<CustomRulesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_templates: Option<PromptTemplatesConfig>,
    #[serde(flatten)]
    pub sealed: SealedFields,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserConfig {
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.account.tier
    }
}

/// Encrypted siblings of the sensitive fields.
///
/// In a persisted document a present sibling is authoritative and the matching live
/// field is blank. In a loaded document a sibling is only present when it could not be
/// opened, so that saving from a locked context writes it back instead of losing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedFields {
    #[serde(rename = "_encryptedApiKeyVault", default, skip_serializing_if = "Option::is_none")]
    pub api_key_vault: Option<String>,
    #[serde(rename = "_encryptedCustomRules", default, skip_serializing_if = "Option::is_none")]
    pub custom_rules: Option<String>,
    #[serde(rename = "_encryptedActivityLogs", default, skip_serializing_if = "Option::is_none")]
    pub activity_logs: Option<String>,
    #[serde(rename = "_encryptedAccountData", default, skip_serializing_if = "Option::is_none")]
    pub account_data: Option<String>,
}

impl SealedFields {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.api_key_vault.is_none()
            && self.custom_rules.is_none()
            && self.activity_logs.is_none()
            && self.account_data.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub email_opt_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
    pub tier: Tier,
    pub sync_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
}

impl AccountInfo {
    /// True when any field sealed into `_encryptedAccountData` holds a value.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        [&self.email, &self.display_name, &self.photo_url, &self.firebase_uid].into_iter().any(present)
    }

    /// Moves the identity fields out, leaving them blank.
    pub fn take_identity(&mut self) -> AccountIdentity {
        AccountIdentity {
            email: self.email.take(),
            display_name: self.display_name.take(),
            photo_url: self.photo_url.take(),
            firebase_uid: self.firebase_uid.take(),
        }
    }

    pub fn restore_identity(&mut self, identity: AccountIdentity) {
        self.email = identity.email;
        self.display_name = identity.display_name;
        self.photo_url = identity.photo_url;
        self.firebase_uid = identity.firebase_uid;
    }
}

/// The account fields sealed into `_encryptedAccountData`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
}

/// How a detected match is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubstitutionMode {
    #[default]
    AutoReplace,
    WarnFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalSettings {
    pub enabled: bool,
    pub default_mode: SubstitutionMode,
    pub show_notifications: bool,
    pub decode_responses: bool,
    pub theme: String,
    pub protected_domains: Vec<String>,
    pub excluded_domains: Vec<String>,
    pub strict_mode: bool,
    pub debug_mode: bool,
    pub cloud_sync: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_mode: SubstitutionMode::AutoReplace,
            show_notifications: true,
            decode_responses: false,
            theme: "classic-dark".to_owned(),
            protected_domains: [
                "chat.openai.com",
                "chatgpt.com",
                "claude.ai",
                "gemini.google.com",
                "perplexity.ai",
                "copilot.microsoft.com",
            ]
            .map(str::to_owned)
            .to_vec(),
            excluded_domains: Vec::new(),
            strict_mode: false,
            debug_mode: false,
            cloud_sync: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceCounters {
    pub requests: u64,
    pub substitutions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stats {
    pub total_substitutions: u64,
    pub total_interceptions: u64,
    pub total_warnings: u64,
    pub success_rate: f64,
    pub last_sync_timestamp: Millis,
    pub by_service: PerService<ServiceCounters>,
    pub activity_log: Vec<ActivityLogEntry>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_substitutions: 0,
            total_interceptions: 0,
            total_warnings: 0,
            success_rate: 1.0,
            last_sync_timestamp: 0,
            by_service: PerService::default(),
            activity_log: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Interception,
    Substitution,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: String,
    pub timestamp: Millis,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub service: AiService,
    pub details: ActivityDetails,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityDetails {
    pub url: String,
    pub profiles_used: Vec<String>,
    pub pii_types_found: Vec<String>,
    pub substitution_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
