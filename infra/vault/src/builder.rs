use crate::engine::{Cipher, CipherInner};
use crate::error::VaultError;
use crate::types::{KEY_LEN, KdfParams, KeyFingerprint};
use aes_gcm::Aes256Gcm;
use aes_gcm::aead::KeyInit;
use private::Sealed;
use sha2::Sha256;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Default, ZeroizeOnDrop)]
pub struct NoKey;
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct WithKey {
    key: [u8; KEY_LEN],
}

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoKey {}
impl Sealed for WithKey {}

/// A builder for secure initialization of a [`Cipher`].
///
/// Implements `ZeroizeOnDrop` so raw key bytes are cleared as soon as the
/// builder is consumed or dropped.
#[allow(private_bounds)]
#[derive(Debug, Default, Zeroize, ZeroizeOnDrop)]
pub struct CipherBuilder<K: Sealed + ZeroizeOnDrop = NoKey> {
    key: K,
}

impl CipherBuilder {
    #[must_use = "Builder must be given a key with `derive` or `raw_key` before use"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stretches `secret` into an AES-256 key with PBKDF2-HMAC-SHA256.
    ///
    /// # Arguments
    /// * `secret`: Key material (identity secret or stored legacy material).
    /// * `salt`: Salt bytes. Callers pass the UTF-8 bytes of the stored base64 salt.
    /// * `params`: Work factor.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidConfiguration`] for an empty secret or a zero work factor.
    pub fn derive(
        self,
        secret: impl AsRef<[u8]>,
        salt: impl AsRef<[u8]>,
        params: KdfParams,
    ) -> Result<CipherBuilder<WithKey>, VaultError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(VaultError::InvalidConfiguration {
                message: "Key material must not be empty".into(),
                context: Some("PBKDF2".into()),
            });
        }
        if params.iterations == 0 {
            return Err(VaultError::InvalidConfiguration {
                message: "Iteration count must be positive".into(),
                context: Some("PBKDF2".into()),
            });
        }

        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt.as_ref(), params.iterations, &mut key);

        Ok(CipherBuilder { key: WithKey { key } })
    }

    /// Uses an already derived 32-byte key.
    #[must_use]
    pub fn raw_key(self, key: [u8; KEY_LEN]) -> CipherBuilder<WithKey> {
        CipherBuilder { key: WithKey { key } }
    }
}

impl CipherBuilder<WithKey> {
    /// Finalizes cipher construction and zeroes the builder.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidConfiguration`] if the AEAD rejects the key.
    pub fn build(mut self) -> Result<Cipher, VaultError> {
        let aead = Aes256Gcm::new_from_slice(&self.key.key).map_err(|_| {
            VaultError::InvalidConfiguration {
                message: format!("Invalid key length, must be {KEY_LEN} bytes").into(),
                context: Some("AES-256-GCM".into()),
            }
        })?;
        let fingerprint = KeyFingerprint::of(&self.key.key);

        self.zeroize();

        Ok(Cipher { inner: Arc::new(CipherInner { aead, fingerprint }) })
    }
}
