use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the random AES-GCM initialization vector.
pub const IV_LEN: usize = 12;
/// Length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;
/// AES-256 key length.
pub const KEY_LEN: usize = 32;

const FINGERPRINT_DOMAIN: &[u8] = b"shroud.key-check.v1";

/// PBKDF2-HMAC-SHA256 work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KdfParams {
    pub iterations: u32,
}

impl KdfParams {
    /// Work factor for keys derived from the identity secret.
    pub const CURRENT: Self = Self { iterations: 600_000 };
    /// Work factor for keys derived from locally stored key material.
    pub const LEGACY: Self = Self { iterations: 210_000 };

    #[must_use]
    pub const fn new(iterations: u32) -> Self {
        Self { iterations }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Base64 text of `IV ‖ ciphertext ‖ tag`.
///
/// This is the exact form persisted in the key-value store, so it serializes as a
/// plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedBlob(String);

impl SealedBlob {
    pub(crate) fn encode(raw: &[u8]) -> Self {
        Self(STANDARD.encode(raw))
    }

    pub(crate) fn decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(text.trim())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SealedBlob {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SealedBlob {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for SealedBlob {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SealedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-reversible identifier of a derived key.
///
/// Two ciphers built from the same secret, salt and work factor produce the same
/// fingerprint. Persisting it next to ciphertexts lets a failed tag check be
/// attributed to a different key rather than to damaged data.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyFingerprint(String);

impl KeyFingerprint {
    pub(crate) fn of(key: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(key);
        Self(STANDARD.encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for KeyFingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "KeyFingerprint({short}…)")
    }
}
