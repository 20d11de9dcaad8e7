//! Authenticated encryption for identity-bound JSON blobs.
//!
//! This crate wraps AES-256-GCM behind a small [`Cipher`] handle whose key is stretched
//! from a secret with PBKDF2-HMAC-SHA256. Blobs are self-contained base64 strings that can
//! be stored verbatim in any key-value backend.
//!
//! ## Blob Format
//!
//! ```text
//! base64( [IV(12)][CIPHERTEXT(N)][TAG(16)] )
//! ```
//!
//! There is no version header: the scheme a blob was sealed under is decided by the
//! caller, which picks the secret and the [`KdfParams`] before building the cipher.
//!
//! ## Nonce Policy
//!
//! Every seal draws a **random 96-bit IV** from the operating system. Sealing the same
//! plaintext twice therefore yields different blobs.
//!
//! ## Key Fingerprints
//!
//! [`Cipher::fingerprint`] is a one-way digest of the derived key. Persisting it lets a
//! caller tell "sealed under another key" apart from "damaged in storage" when a tag
//! check fails, which AES-GCM alone cannot do.
//!
//! ## Examples
//!
//! ```rust
//! use shroud_vault::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), VaultError> {
//! let cipher = Cipher::builder()
//!     .derive("identity-secret", "bm90LWEtcmVhbC1zYWx0", KdfParams::new(1_000))?
//!     .build()?;
//!
//! let blob = json!({ "rules": [] }).seal_json(&cipher)?;
//! let back: serde_json::Value = cipher.open_json(blob.as_str())?;
//! assert_eq!(back, json!({ "rules": [] }));
//! # Ok(())
//! # }
//! ```

mod builder;
mod engine;
mod error;
pub mod extensions;
mod types;

pub use builder::CipherBuilder;
pub use engine::{Cipher, random_bytes};
pub use error::{VaultError, VaultErrorExt};
pub use types::{IV_LEN, KEY_LEN, KdfParams, KeyFingerprint, SealedBlob, TAG_LEN};

pub mod prelude {
    pub use crate::engine::{Cipher, random_bytes};
    pub use crate::error::{VaultError, VaultErrorExt};
    pub use crate::extensions::SealJsonExt;
    pub use crate::types::{KdfParams, KeyFingerprint, SealedBlob};
}
