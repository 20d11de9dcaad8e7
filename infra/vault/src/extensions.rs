//! # Vault Extensions
//!
//! JSON sealing on top of [`Cipher`]. Every encrypted field in the store is a JSON
//! document encrypted as a whole, so these are the calls the store layer uses.

use crate::engine::Cipher;
use crate::error::{VaultError, VaultErrorExt};
use crate::types::SealedBlob;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An extension trait that seals any serializable value as JSON.
pub trait SealJsonExt: Serialize {
    /// Serializes `self` to JSON and encrypts the bytes.
    ///
    /// # Errors
    /// * [`VaultError::Serialization`] If the value cannot be encoded.
    /// * [`VaultError::Encryption`] If the AEAD cipher fails.
    fn seal_json(&self, cipher: &Cipher) -> Result<SealedBlob, VaultError> {
        cipher.seal_json(self)
    }
}

impl<T: Serialize + ?Sized> SealJsonExt for T {}

impl Cipher {
    /// Encrypts the JSON encoding of `value`.
    ///
    /// # Errors
    /// See [`SealJsonExt::seal_json`].
    pub fn seal_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<SealedBlob, VaultError> {
        let bytes = zeroize::Zeroizing::new(serde_json::to_vec(value).context("JSON encoding")?);
        self.seal_bytes(bytes.as_slice())
    }

    /// Decrypts a blob and parses the plaintext as JSON.
    ///
    /// # Errors
    /// * [`VaultError::MalformedBlob`] / [`VaultError::Authentication`] See [`Cipher::open_bytes`].
    /// * [`VaultError::Serialization`] If the plaintext is not the expected JSON.
    pub fn open_json<T: DeserializeOwned>(&self, blob: &str) -> Result<T, VaultError> {
        let bytes = self.open_bytes(blob)?;
        serde_json::from_slice(&bytes).context("JSON decoding")
    }
}
