use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::builder::CipherBuilder;
use crate::error::{VaultError, VaultErrorExt};
use crate::types::{IV_LEN, KeyFingerprint, SealedBlob, TAG_LEN};

pub(crate) struct CipherInner {
    pub(crate) aead: Aes256Gcm,
    pub(crate) fingerprint: KeyFingerprint,
}

/// AES-256-GCM cipher bound to one derived key.
///
/// Cheap to clone: the key schedule lives behind an [`Arc`], so a single
/// derivation can be shared across tasks.
///
/// ### Blob layout
/// ```text
/// base64( [IV(12)][CIPHERTEXT(N)][TAG(16)] )
/// ```
/// No associated data is bound. A fresh random IV is drawn for every seal.
///
/// ### Example
/// ```rust
/// use shroud_vault::prelude::*;
///
/// # fn main() -> Result<(), VaultError> {
/// let cipher = Cipher::builder()
///     .derive("identity-secret", "c2FsdA==", KdfParams::new(1_000))?
///     .build()?;
///
/// let blob = cipher.seal_bytes(b"hello")?;
/// assert_eq!(&*cipher.open_bytes(blob.as_str())?, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Cipher {
    pub(crate) inner: Arc<CipherInner>,
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").field("fingerprint", &self.inner.fingerprint).finish_non_exhaustive()
    }
}

impl Cipher {
    #[must_use]
    pub fn builder() -> CipherBuilder {
        CipherBuilder::new()
    }

    /// Fingerprint of the key this cipher was built from.
    #[must_use]
    pub fn fingerprint(&self) -> &KeyFingerprint {
        &self.inner.fingerprint
    }

    /// Encrypts raw bytes into a [`SealedBlob`].
    ///
    /// # Errors
    /// * [`VaultError::Random`] If no IV can be drawn.
    /// * [`VaultError::Encryption`] If the AEAD encryption fails.
    pub fn seal_bytes(&self, data: impl AsRef<[u8]>) -> Result<SealedBlob, VaultError> {
        let data = data.as_ref();
        let iv = random_bytes::<IV_LEN>().context("Drawing IV")?;

        let mut buf = Zeroizing::new(Vec::with_capacity(IV_LEN + data.len() + TAG_LEN));
        buf.extend_from_slice(&iv);
        buf.extend_from_slice(data);

        let tag = self
            .inner
            .aead
            .encrypt_in_place_detached(Nonce::from_slice(&iv), &[], &mut buf[IV_LEN..])
            .map_err(|_| VaultError::Encryption {
                message: "Encryption failed".into(),
                context: Some("AES-256-GCM".into()),
            })?;

        buf.extend_from_slice(tag.as_slice());
        Ok(SealedBlob::encode(&buf))
    }

    /// Decrypts a blob produced by [`Cipher::seal_bytes`].
    ///
    /// # Errors
    /// * [`VaultError::MalformedBlob`] If the text is not base64 or is shorter than `IV + tag`.
    /// * [`VaultError::Authentication`] If the tag does not verify under this key.
    pub fn open_bytes(&self, blob: &str) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let raw = SealedBlob::decode(blob).map_err(|err| VaultError::MalformedBlob {
            message: format!("Invalid base64: {err}").into(),
            context: None,
        })?;

        if raw.len() < IV_LEN + TAG_LEN {
            return Err(VaultError::MalformedBlob {
                message: format!(
                    "Blob too short ({} bytes). Expected at least {} bytes",
                    raw.len(),
                    IV_LEN + TAG_LEN
                )
                .into(),
                context: None,
            });
        }

        let (iv, rest) = raw.split_at(IV_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);

        let mut buf = Zeroizing::new(ciphertext.to_vec());
        self.inner
            .aead
            .decrypt_in_place_detached(Nonce::from_slice(iv), &[], &mut buf, Tag::from_slice(tag))
            .map_err(|_| VaultError::Authentication {
                message: "Tag verification failed".into(),
                context: None,
            })?;

        Ok(buf)
    }
}

/// Fills a fixed-size array from the operating system random source.
///
/// # Errors
/// Returns [`VaultError::Random`] if the source is unavailable.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], VaultError> {
    let mut out = [0u8; N];
    getrandom::fill(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::types::{IV_LEN, SealedBlob, TAG_LEN};

    fn cipher(secret: &str) -> Cipher {
        Cipher::builder()
            .derive(secret, "c2FsdA==", KdfParams::new(16))
            .unwrap()
            .build()
            .expect("Cipher should build with a derived key")
    }

    #[test]
    fn seal_then_open_returns_the_plaintext() {
        let cipher = cipher("secret");
        let blob = cipher.seal_bytes(b"payload").unwrap();
        assert_eq!(&**cipher.open_bytes(blob.as_str()).unwrap(), b"payload");
    }

    #[test]
    fn every_seal_draws_a_fresh_iv() {
        let cipher = cipher("secret");
        let a = cipher.seal_bytes(b"same").unwrap();
        let b = cipher.seal_bytes(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_plaintext_is_sealed_to_iv_and_tag_only() {
        let cipher = cipher("secret");
        let blob = cipher.seal_bytes(b"").unwrap();
        let raw = SealedBlob::decode(blob.as_str()).unwrap();
        assert_eq!(raw.len(), IV_LEN + TAG_LEN);
        assert!(cipher.open_bytes(blob.as_str()).unwrap().is_empty());
    }

    #[test]
    fn same_inputs_derive_the_same_fingerprint() {
        assert_eq!(cipher("a").fingerprint(), cipher("a").fingerprint());
        assert_ne!(cipher("a").fingerprint(), cipher("b").fingerprint());
    }

    #[test]
    fn random_bytes_differ_between_draws() {
        let a = random_bytes::<16>().unwrap();
        let b = random_bytes::<16>().unwrap();
        assert_ne!(a, b);
    }
}
