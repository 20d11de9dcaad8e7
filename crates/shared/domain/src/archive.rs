//! The tier archive: paid-tier data parked on downgrade.

use crate::Millis;
use crate::config::{GlobalSettings, Stats};
use crate::profile::AliasProfile;
use crate::rules::CustomRule;
use crate::templates::PromptTemplate;
use serde::{Deserialize, Serialize};

/// Persisted under [`crate::constants::ARCHIVED_PRO_DATA`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub user_id: String,
    pub archived_at: Millis,
    pub expires_at: Millis,
    /// Sealed [`ArchivedPayload`].
    pub encrypted_data: String,
}

impl ArchiveRecord {
    #[must_use]
    pub const fn is_expired(&self, now: Millis) -> bool {
        now > self.expires_at
    }

    #[must_use]
    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Everything a downgrade takes away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedPayload {
    #[serde(default)]
    pub profiles: Vec<AliasProfile>,
    #[serde(default)]
    pub custom_templates: Vec<PromptTemplate>,
    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,
    pub settings: GlobalSettings,
    pub stats: Stats,
}

/// Restoration preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStats {
    pub archived_at: Millis,
    pub expires_at: Millis,
    pub profile_count: usize,
    pub template_count: usize,
    pub rule_count: usize,
}
