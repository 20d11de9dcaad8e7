//! Version 1 layout: flat alias records and the config shape that went with them.
//!
//! Read only by the schema migration. Nothing writes these types.

use crate::Millis;
use serde::{Deserialize, Serialize};

/// Which identity field a v1 record substitutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasKind {
    Name,
    Email,
    Phone,
    Address,
    #[serde(other)]
    Other,
}

/// One real/alias pair from the v1 `aliases` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    pub id: String,
    pub real_value: String,
    pub alias_value: String,
    #[serde(rename = "type")]
    pub kind: AliasKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub metadata: AliasEntryMetadata,
    #[serde(default)]
    pub enabled: bool,
}

impl AliasEntry {
    /// Records sharing a key are merged into one profile.
    #[must_use]
    pub fn group_key(&self) -> String {
        match self.category.as_deref() {
            Some(category) if !category.is_empty() => category.to_owned(),
            _ => format!("profile-{}", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AliasEntryMetadata {
    pub created_at: Millis,
    pub usage_count: u64,
    pub last_used: Millis,
    pub confidence: f64,
}

/// The v1 config document. Only the parts carried into v2 are modeled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfigV1 {
    pub version: u32,
    pub settings: SettingsV1,
    pub stats: StatsV1,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsV1 {
    pub enabled: bool,
    pub auto_highlight: bool,
    pub show_notifications: bool,
    pub protected_domains: Vec<String>,
    pub excluded_domains: Vec<String>,
    pub strict_mode: bool,
}

impl Default for SettingsV1 {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_highlight: true,
            show_notifications: true,
            protected_domains: Vec::new(),
            excluded_domains: Vec::new(),
            strict_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsV1 {
    pub total_substitutions: u64,
    pub success_rate: f64,
    pub last_sync_timestamp: Millis,
}

impl Default for StatsV1 {
    fn default() -> Self {
        Self { total_substitutions: 0, success_rate: 1.0, last_sync_timestamp: 0 }
    }
}
