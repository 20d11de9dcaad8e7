//! # Vault Errors
//!
//! This module defines the [`VaultError`] enum used throughout the vault crate for
//! reporting cryptographic, encoding, and configuration failures.

use std::borrow::Cow;

/// A specialized [`VaultError`] enum for vault-related failures.
#[shroud_derive::shroud_error]
pub enum VaultError {
    /// Failure during the encryption process.
    #[error("Encryption error{}: {message}", format_context(.context))]
    Encryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The AEAD tag did not verify.
    ///
    /// Either the key is wrong or the ciphertext was altered; the cipher alone
    /// cannot tell the two apart.
    #[error("Authentication failed{}: {message}", format_context(.context))]
    Authentication { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The blob is not valid base64 or is shorter than `IV + tag`.
    #[error("Malformed blob{}: {message}", format_context(.context))]
    MalformedBlob { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure during JSON encoding of a sealed value or decoding of an opened one.
    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// The operating system random source could not be read.
    #[error("Random source unavailable{}: {source}", format_context(.context))]
    Random { source: getrandom::Error, context: Option<Cow<'static, str>> },

    /// Failure when the cipher or the derivation is incorrectly configured.
    #[error("Invalid configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal vault error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
