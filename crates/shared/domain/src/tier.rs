//! Subscription tiers and the enumerations usage statistics are keyed by.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription tier stored in `account.tier`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AI services usage is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiService {
    Chatgpt,
    Claude,
    Gemini,
    Perplexity,
    Poe,
    Copilot,
    You,
    Unknown,
}

/// Kinds of personal data a profile substitutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PiiType {
    Name,
    Email,
    Phone,
    CellPhone,
    Address,
    Company,
    Custom,
}

/// One counter per known [`AiService`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerService<T> {
    pub chatgpt: T,
    pub claude: T,
    pub gemini: T,
    pub perplexity: T,
    pub poe: T,
    pub copilot: T,
    pub you: T,
}

impl<T> PerService<T> {
    /// The slot for `service`, or `None` for [`AiService::Unknown`].
    pub const fn get_mut(&mut self, service: AiService) -> Option<&mut T> {
        match service {
            AiService::Chatgpt => Some(&mut self.chatgpt),
            AiService::Claude => Some(&mut self.claude),
            AiService::Gemini => Some(&mut self.gemini),
            AiService::Perplexity => Some(&mut self.perplexity),
            AiService::Poe => Some(&mut self.poe),
            AiService::Copilot => Some(&mut self.copilot),
            AiService::You => Some(&mut self.you),
            AiService::Unknown => None,
        }
    }
}

/// One counter per [`PiiType`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerPiiType {
    pub name: u64,
    pub email: u64,
    pub phone: u64,
    pub cell_phone: u64,
    pub address: u64,
    pub company: u64,
    pub custom: u64,
}

impl PerPiiType {
    pub const fn get_mut(&mut self, pii: PiiType) -> &mut u64 {
        match pii {
            PiiType::Name => &mut self.name,
            PiiType::Email => &mut self.email,
            PiiType::Phone => &mut self.phone,
            PiiType::CellPhone => &mut self.cell_phone,
            PiiType::Address => &mut self.address,
            PiiType::Company => &mut self.company,
            PiiType::Custom => &mut self.custom,
        }
    }
}
