//! Custom redaction rules (paid tiers).

use crate::Millis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Pii,
    Financial,
    Medical,
    #[default]
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTestCase {
    pub input: String,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRule {
    pub id: String,
    pub name: String,
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default)]
    pub category: RuleCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<Millis>,
    #[serde(default)]
    pub match_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_cases: Option<Vec<RuleTestCase>>,
}

/// Priority given to rules created without one.
pub const DEFAULT_RULE_PRIORITY: u32 = 50;

const fn default_priority() -> u32 {
    DEFAULT_RULE_PRIORITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomRulesConfig {
    pub enabled: bool,
    pub rules: Vec<CustomRule>,
}

impl Default for CustomRulesConfig {
    fn default() -> Self {
        Self { enabled: true, rules: Vec::new() }
    }
}

/// Input for creating a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleDraft {
    pub name: String,
    pub pattern: String,
    pub replacement: String,
    pub category: RuleCategory,
    pub description: Option<String>,
    pub priority: Option<u32>,
    pub test_cases: Option<Vec<RuleTestCase>>,
}
