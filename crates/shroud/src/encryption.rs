//! # Encryption Engine
//!
//! Derives the data key from the identity secret and a persisted salt, and seals or
//! opens JSON values with it.
//!
//! ## Key schemes
//!
//! | Scheme  | Secret                            | Rounds  | Used for          |
//! |---------|-----------------------------------|---------|-------------------|
//! | Current | identity secret                   | 600 000 | reads and writes  |
//! | Legacy  | stored `_encryptionKeyMaterial`   | 210 000 | migration reads   |
//!
//! Both schemes share the salt in `_encryptionSalt`. The salt is created on first use
//! and never rotated; the identity secret is never persisted.
//!
//! ## Fault classification
//!
//! A tag failure alone cannot say whether the key is wrong or the data damaged. Each
//! current-scheme seal records the key fingerprint under `_encryptionKeyCheck`, and
//! [`EncryptionEngine`] compares it against the key in use when a blob fails to open.

use crate::error::{DecryptFault, StoreError};
use crate::identity::{IdentityProvider, IdentitySecret};
use crate::settings::StoreSettings;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use shroud_domain::constants::{ENCRYPTION_KEY_CHECK, ENCRYPTION_KEY_MATERIAL, ENCRYPTION_SALT};
use shroud_storage::KeyValueStore;
use shroud_vault::{Cipher, KdfParams, KeyFingerprint, SealedBlob, VaultError, random_bytes};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SALT_LEN: usize = 16;

/// Which derivation a cipher came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScheme {
    Current,
    Legacy,
}

struct DerivedKey {
    tag: [u8; 32],
    salt: String,
    cipher: Cipher,
}

struct EngineInner<S> {
    store: S,
    identity: Arc<dyn IdentityProvider>,
    settings: Arc<StoreSettings>,
    current: Mutex<Option<DerivedKey>>,
    recorded_check: Mutex<Option<KeyFingerprint>>,
}

/// Key derivation and AEAD over the shared store. Cheap to clone.
pub struct EncryptionEngine<S> {
    inner: Arc<EngineInner<S>>,
}

impl<S> Clone for EncryptionEngine<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S> fmt::Debug for EncryptionEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionEngine")
            .field("identity", &self.inner.identity)
            .field("key_cached", &self.inner.current.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> EncryptionEngine<S> {
    #[must_use]
    pub fn new(store: S, identity: Arc<dyn IdentityProvider>, settings: Arc<StoreSettings>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                identity,
                settings,
                current: Mutex::new(None),
                recorded_check: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }

    /// The persisted salt, created on first use.
    ///
    /// The store has no compare-and-swap, so two contexts creating the salt at once can
    /// both write. Each reads back whatever landed last, which settles later
    /// derivations. It does not save a context that already sealed data under the salt
    /// it wrote before a peer replaced it: that ciphertext is orphaned. Such a lost race
    /// is logged when the key check is recorded.
    pub async fn salt(&self) -> Result<String, StoreError> {
        let store = &self.inner.store;
        if let Some(salt) = store.get_one(ENCRYPTION_SALT).await?.as_ref().and_then(Value::as_str) {
            return Ok(salt.to_owned());
        }

        let fresh = STANDARD.encode(random_bytes::<SALT_LEN>()?);
        store.set_one(ENCRYPTION_SALT, Value::String(fresh.clone())).await?;
        info!("Created encryption salt");

        Ok(store
            .get_one(ENCRYPTION_SALT)
            .await?
            .as_ref()
            .and_then(Value::as_str)
            .map_or(fresh, str::to_owned))
    }

    /// Waits up to the configured bound for an identity secret.
    async fn wait_for_secret(&self) -> Result<IdentitySecret, StoreError> {
        let identity = &self.inner.identity;
        let mut changes = identity.changes();
        if let Some(secret) = identity.current_secret() {
            return Ok(secret);
        }

        let wait = self.inner.settings.identity_wait();
        let arrived = tokio::time::timeout(wait, async {
            while changes.changed().await.is_ok() {
                if let Some(secret) = identity.current_secret() {
                    return Some(secret);
                }
            }
            None
        })
        .await
        .ok()
        .flatten();

        arrived.ok_or_else(|| {
            debug!(wait_ms = wait.as_millis(), "No identity available for key derivation");
            StoreError::key_unavailable("No identity session")
        })
    }

    /// Derives the current-scheme key, reusing the last derivation when the secret and
    /// salt have not changed.
    ///
    /// # Errors
    /// * [`StoreError::KeyUnavailable`] If no identity appears within the wait bound.
    pub async fn derive_key(&self) -> Result<Cipher, StoreError> {
        let secret = self.wait_for_secret().await?;
        let salt = self.salt().await?;
        let params = self.inner.settings.current_kdf();
        let tag = derivation_tag(secret.as_bytes(), &salt, params);

        if let Some(cached) = self.inner.current.lock().as_ref()
            && cached.tag == tag
        {
            return Ok(cached.cipher.clone());
        }

        let cipher = derive(secret, salt.clone(), params).await?;
        *self.inner.current.lock() = Some(DerivedKey { tag, salt, cipher: cipher.clone() });
        debug!(iterations = params.iterations, "Derived encryption key");
        Ok(cipher)
    }

    /// Derives the legacy-scheme key, or `None` when no legacy material is stored.
    pub async fn derive_legacy_key(&self) -> Result<Option<Cipher>, StoreError> {
        let Some(material) = self.legacy_material().await? else {
            return Ok(None);
        };
        let salt = self.salt().await?;
        let cipher = derive(material, salt, self.inner.settings.legacy_kdf()).await?;
        Ok(Some(cipher))
    }

    async fn legacy_material(&self) -> Result<Option<IdentitySecret>, StoreError> {
        let value = self.inner.store.get_one(ENCRYPTION_KEY_MATERIAL).await?;
        Ok(match value {
            Some(Value::String(material)) if !material.is_empty() => Some(IdentitySecret::new(material)),
            _ => None,
        })
    }

    pub async fn has_legacy_material(&self) -> Result<bool, StoreError> {
        Ok(self.legacy_material().await?.is_some())
    }

    pub(crate) async fn remove_legacy_material(&self) -> Result<(), StoreError> {
        self.inner.store.remove(&[ENCRYPTION_KEY_MATERIAL]).await?;
        Ok(())
    }

    /// Seals `value` under the current key.
    pub async fn encrypt<T: Serialize + ?Sized>(&self, value: &T) -> Result<SealedBlob, StoreError> {
        let cipher = self.derive_key().await?;
        let blob = cipher.seal_json(value)?;
        self.record_key_check(cipher.fingerprint()).await?;
        Ok(blob)
    }

    /// Opens a blob sealed under the current key.
    pub async fn decrypt<T: DeserializeOwned>(&self, blob: &str) -> Result<T, StoreError> {
        let cipher = self.derive_key().await?;
        self.decrypt_with_key(blob, &cipher, KeyScheme::Current).await
    }

    /// Opens a blob with an explicit key.
    pub async fn decrypt_with_key<T: DeserializeOwned>(
        &self,
        blob: &str,
        cipher: &Cipher,
        scheme: KeyScheme,
    ) -> Result<T, StoreError> {
        match cipher.open_json(blob) {
            Ok(value) => Ok(value),
            Err(err) => Err(self.classify(err, cipher, scheme).await),
        }
    }

    async fn classify(&self, err: VaultError, cipher: &Cipher, scheme: KeyScheme) -> StoreError {
        let fault = match &err {
            VaultError::MalformedBlob { .. } => DecryptFault::Malformed,
            VaultError::Serialization { .. } => DecryptFault::Payload,
            VaultError::Authentication { .. } if scheme == KeyScheme::Legacy => DecryptFault::Unverified,
            VaultError::Authentication { .. } => match self.stored_key_check().await {
                Ok(Some(stored)) if &stored == cipher.fingerprint() => DecryptFault::Tampered,
                Ok(Some(_)) => DecryptFault::IdentityMismatch,
                Ok(None) => DecryptFault::Unverified,
                Err(check_err) => {
                    warn!(error_kind = check_err.kind(), "Key check unreadable while classifying failure");
                    DecryptFault::Unverified
                },
            },
            _ => return StoreError::from(err),
        };
        StoreError::decryption_failed(fault, err.to_string())
    }

    async fn stored_key_check(&self) -> Result<Option<KeyFingerprint>, StoreError> {
        let value = self.inner.store.get_one(ENCRYPTION_KEY_CHECK).await?;
        Ok(value.and_then(|v| v.as_str().map(|s| KeyFingerprint::from(s.to_owned()))))
    }

    async fn record_key_check(&self, fingerprint: &KeyFingerprint) -> Result<(), StoreError> {
        if self.inner.recorded_check.lock().as_ref() == Some(fingerprint) {
            return Ok(());
        }
        if self.stored_key_check().await?.as_ref() != Some(fingerprint) {
            self.inner
                .store
                .set_one(ENCRYPTION_KEY_CHECK, Value::String(fingerprint.as_str().to_owned()))
                .await?;
            debug!("Recorded key check");
        }
        self.salt_replaced().await?;
        *self.inner.recorded_check.lock() = Some(fingerprint.clone());
        Ok(())
    }

    /// True when the stored salt differs from the one the cached key came from.
    async fn salt_replaced(&self) -> Result<bool, StoreError> {
        let derived_from = self.inner.current.lock().as_ref().map(|key| key.salt.clone());
        let stored = self.inner.store.get_one(ENCRYPTION_SALT).await?;

        let replaced = matches!(
            (derived_from.as_deref(), stored.as_ref().and_then(Value::as_str)),
            (Some(ours), Some(theirs)) if ours != theirs
        );
        if replaced {
            warn!("Encryption salt replaced by another context; data sealed under the previous salt is unreadable");
        }
        Ok(replaced)
    }
}

fn derivation_tag(secret: &[u8], salt: &str, params: KdfParams) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update([0u8]);
    hasher.update(salt.as_bytes());
    hasher.update(params.iterations.to_le_bytes());
    hasher.finalize().into()
}

/// PBKDF2 runs on the blocking pool so hundreds of thousands of rounds do not stall
/// the async loop.
async fn derive(secret: IdentitySecret, salt: String, params: KdfParams) -> Result<Cipher, StoreError> {
    tokio::task::spawn_blocking(move || Cipher::builder().derive(secret.as_bytes(), salt.as_bytes(), params)?.build())
        .await
        .map_err(|err| StoreError::Internal {
            message: err.to_string().into(),
            context: Some("Key derivation task".into()),
        })?
        .map_err(StoreError::from)
}
