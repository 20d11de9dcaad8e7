//! The API key vault: user-registered secrets to keep out of prompts.

use crate::Millis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider a key was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyFormat {
    Openai,
    Anthropic,
    Google,
    Aws,
    Github,
    Stripe,
    Generic,
    Custom,
}

impl ApiKeyFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Aws => "aws",
            Self::Github => "github",
            Self::Stripe => "stripe",
            Self::Generic => "generic",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ApiKeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub key_value: String,
    pub format: ApiKeyFormat,
    pub created_at: Millis,
    #[serde(default)]
    pub last_used: Millis,
    #[serde(default)]
    pub protection_count: u64,
    #[serde(default)]
    pub enabled: bool,
}

/// What happens when a stored key is found in outgoing text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VaultMode {
    AutoRedact,
    #[default]
    WarnFirst,
    LogOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiKeyVault {
    pub enabled: bool,
    pub mode: VaultMode,
    pub auto_detect_patterns: bool,
    pub keys: Vec<ApiKey>,
    pub custom_patterns: Vec<String>,
}

impl Default for ApiKeyVault {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: VaultMode::WarnFirst,
            auto_detect_patterns: true,
            keys: Vec::new(),
            custom_patterns: Vec::new(),
        }
    }
}

/// Input for registering a key. The format is detected when not given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiKeyDraft {
    pub name: Option<String>,
    pub key_value: String,
    pub format: Option<ApiKeyFormat>,
}

