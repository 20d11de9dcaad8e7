//! # Store Errors
//!
//! [`StoreError`] is the one error type consumers of the store see. Its variants map
//! onto how a caller should react:
//!
//! - [`StoreError::KeyUnavailable`]: no identity yet. Expected; present a locked state.
//! - [`StoreError::DecryptionFailed`]: the data cannot be opened with this key.
//!   [`DecryptFault`] says why.
//! - [`StoreError::FreeTierLimit`] / [`StoreError::ProFeatureRequired`]: policy
//!   rejections. Show them verbatim; retrying will not help.

use shroud_storage::StorageError;
use shroud_vault::VaultError;
use std::borrow::Cow;
use std::fmt;

/// Why a blob could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecryptFault {
    /// Not base64, or shorter than IV plus tag.
    Malformed,
    /// The tag check failed and the stored key check belongs to another key.
    IdentityMismatch,
    /// The tag check failed under the key that sealed the data.
    Tampered,
    /// The tag check failed and no key check was ever recorded.
    Unverified,
    /// Decryption succeeded but the plaintext is not the expected JSON.
    Payload,
}

impl DecryptFault {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::IdentityMismatch => "identity-mismatch",
            Self::Tampered => "tampered",
            Self::Unverified => "unverified",
            Self::Payload => "payload",
        }
    }
}

impl fmt::Display for DecryptFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[shroud_derive::shroud_error]
pub enum StoreError {
    #[error("Encryption key unavailable{}: {message}", format_context(.context))]
    KeyUnavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Decryption failed ({fault}){}: {message}", format_context(.context))]
    DecryptionFailed {
        fault: DecryptFault,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Free tier limit reached{}: {message}", format_context(.context))]
    FreeTierLimit { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Paid tier required{}: {message}", format_context(.context))]
    ProFeatureRequired { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Migration incomplete{}: {message}", format_context(.context))]
    MigrationIncomplete { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Storage failure{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Encryption failure{}: {source}", format_context(.context))]
    Vault { source: VaultError, context: Option<Cow<'static, str>> },

    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid store configuration{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl StoreError {
    pub(crate) fn key_unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::KeyUnavailable { message: message.into(), context: None }
    }

    pub(crate) fn decryption_failed(fault: DecryptFault, message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecryptionFailed { fault, message: message.into(), context: None }
    }

    pub(crate) fn free_tier_limit(message: impl Into<Cow<'static, str>>) -> Self {
        Self::FreeTierLimit { message: message.into(), context: None }
    }

    pub(crate) fn pro_feature(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ProFeatureRequired { message: message.into(), context: None }
    }

    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    #[must_use]
    pub const fn is_key_unavailable(&self) -> bool {
        matches!(self, Self::KeyUnavailable { .. })
    }

    /// The fault of a [`StoreError::DecryptionFailed`].
    #[must_use]
    pub const fn decrypt_fault(&self) -> Option<DecryptFault> {
        match self {
            Self::DecryptionFailed { fault, .. } => Some(*fault),
            _ => None,
        }
    }
}
