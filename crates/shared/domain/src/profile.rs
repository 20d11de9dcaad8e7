//! Alias profiles: one real identity paired with the alias substituted for it.

use crate::Millis;
use crate::tier::{PerPiiType, PerService};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasProfile {
    pub id: String,
    pub profile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub real: IdentityData,
    pub alias: IdentityData,
    /// Search variations of `real` and `alias`. Present only on paid tiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<Variations>,
    pub metadata: ProfileMetadata,
    #[serde(default)]
    pub settings: ProfileSettings,
}

const fn enabled_by_default() -> bool {
    true
}

/// Personal data on one side of a profile. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdentityData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,
}

/// Variations generated for each side of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variations {
    pub real: VariationSet,
    pub alias: VariationSet,
}

/// Variations per identity field. A field is absent when the source value was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VariationSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_phone: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Vec<String>>,
}

impl VariationSet {
    /// Total number of variations across all fields.
    #[must_use]
    pub fn len(&self) -> usize {
        [&self.name, &self.email, &self.phone, &self.cell_phone, &self.company, &self.address]
            .into_iter()
            .flatten()
            .map(Vec::len)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    pub created_at: Millis,
    pub updated_at: Millis,
    #[serde(default)]
    pub usage_stats: UsageStats,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

const fn full_confidence() -> f64 {
    1.0
}

impl ProfileMetadata {
    #[must_use]
    pub fn new(now: Millis) -> Self {
        Self { created_at: now, updated_at: now, usage_stats: UsageStats::default(), confidence: 1.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UsageStats {
    pub total_substitutions: u64,
    pub last_used: Millis,
    pub by_service: PerService<u64>,
    #[serde(rename = "byPIIType")]
    pub by_pii_type: PerPiiType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileSettings {
    pub auto_replace: bool,
    #[serde(rename = "highlightInUI")]
    pub highlight_in_ui: bool,
    pub active_services: Vec<String>,
    pub enable_variations: bool,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            auto_replace: true,
            highlight_in_ui: true,
            active_services: ["chatgpt", "claude", "gemini"].map(str::to_owned).to_vec(),
            enable_variations: true,
        }
    }
}

/// Input for creating a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileDraft {
    pub profile_name: String,
    pub description: Option<String>,
    pub real: IdentityData,
    pub alias: IdentityData,
    pub enabled: Option<bool>,
}

/// Partial update of a profile. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfilePatch {
    pub profile_name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub real: Option<IdentityData>,
    pub alias: Option<IdentityData>,
    pub settings: Option<ProfileSettingsPatch>,
}

impl ProfilePatch {
    /// True when the patch replaces either identity.
    #[must_use]
    pub const fn touches_identity(&self) -> bool {
        self.real.is_some() || self.alias.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileSettingsPatch {
    pub auto_replace: Option<bool>,
    #[serde(rename = "highlightInUI")]
    pub highlight_in_ui: Option<bool>,
    pub active_services: Option<Vec<String>>,
    pub enable_variations: Option<bool>,
}

impl ProfileSettings {
    pub fn merge(&mut self, patch: ProfileSettingsPatch) {
        if let Some(v) = patch.auto_replace {
            self.auto_replace = v;
        }
        if let Some(v) = patch.highlight_in_ui {
            self.highlight_in_ui = v;
        }
        if let Some(v) = patch.active_services {
            self.active_services = v;
        }
        if let Some(v) = patch.enable_variations {
            self.enable_variations = v;
        }
    }
}
