//! # Domain Models
//!
//! Pure data types for the persisted configuration document, alias profiles and the
//! tier archive. Field names follow the persisted camelCase JSON exactly, so a document
//! written by any context can be read by any other.
//!
//! Keep it lean: no I/O, no encryption, no storage access. Helpers here are limited
//! to defaults and small accessors over the data itself.

pub mod archive;
pub mod config;
pub mod constants;
pub mod legacy;
pub mod profile;
pub mod rules;
pub mod templates;
pub mod tier;
pub mod vault;

pub use archive::{ArchiveRecord, ArchiveStats, ArchivedPayload};
pub use config::{
    AccountIdentity, AccountInfo, ActivityLogEntry, GlobalSettings, SealedFields, Stats,
    SubstitutionMode, UserConfig,
};
pub use legacy::{AliasEntry, AliasKind, UserConfigV1};
pub use profile::{
    AliasProfile, IdentityData, ProfileDraft, ProfileMetadata, ProfilePatch, ProfileSettings,
    UsageStats, VariationSet, Variations,
};
pub use rules::{CustomRule, CustomRulesConfig, RuleCategory, RuleDraft};
pub use templates::{PromptTemplate, PromptTemplatesConfig, TemplateDraft};
pub use tier::{AiService, PerPiiType, PerService, PiiType, Tier};
pub use vault::{ApiKey, ApiKeyDraft, ApiKeyFormat, ApiKeyVault, VaultMode};

/// Milliseconds since the Unix epoch, as persisted in every timestamp field.
pub type Millis = i64;
