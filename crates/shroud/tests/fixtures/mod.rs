#![allow(dead_code)]

use serde::Serialize;
use serde_json::{Value, json};
use shroud::domain::constants::{CONFIG, ENCRYPTION_KEY_MATERIAL, ENCRYPTION_SALT};
use shroud::domain::{ApiKeyDraft, Tier};
use shroud::{IdentityProvider, Shroud, StaticIdentity, StoreSettings};
use shroud_storage::{ContextId, KeyValueStore, MemoryStore};
use shroud_vault::{Cipher, KdfParams};
use std::sync::Arc;

pub const SECRET: &str = "firebase-uid-primary";
pub const OTHER_SECRET: &str = "firebase-uid-other";
pub const LEGACY_MATERIAL: &str = "bGVnYWN5LWtleS1tYXRlcmlhbA==";
pub const SALT: &str = "c2hyb3VkLXRlc3Qtc2FsdA==";

const KDF_ITERATIONS: u32 = 64;
const LEGACY_KDF_ITERATIONS: u32 = 32;

/// Cheap derivations and short waits.
#[must_use]
pub fn fast_settings() -> StoreSettings {
    StoreSettings {
        cache_ttl_ms: 150,
        identity_wait_ms: 25,
        kdf_iterations: KDF_ITERATIONS,
        legacy_kdf_iterations: LEGACY_KDF_ITERATIONS,
        ..StoreSettings::default()
    }
}

#[must_use]
pub fn shroud_with(store: MemoryStore, identity: impl IdentityProvider + 'static) -> Shroud<MemoryStore> {
    Shroud::new(store, Arc::new(identity), fast_settings())
}

/// A store context signed in as [`SECRET`].
#[must_use]
pub fn signed_in(store: &MemoryStore, context: &str) -> Shroud<MemoryStore> {
    shroud_with(store.fork(ContextId::new(context)), StaticIdentity::new(SECRET))
}

/// A store context with no identity.
#[must_use]
pub fn anonymous(store: &MemoryStore, context: &str) -> Shroud<MemoryStore> {
    shroud_with(store.fork(ContextId::new(context)), StaticIdentity::none())
}

/// A store context signed in as [`OTHER_SECRET`].
#[must_use]
pub fn other_identity(store: &MemoryStore, context: &str) -> Shroud<MemoryStore> {
    shroud_with(store.fork(ContextId::new(context)), StaticIdentity::new(OTHER_SECRET))
}

/// Initializes the store and moves the account to `tier`.
pub async fn initialized(shroud: &Shroud<MemoryStore>, tier: Tier) {
    shroud.initialize().await.expect("initialize");
    let mut config = shroud.config().require().await.expect("config");
    config.account.tier = tier;
    shroud.config().save(config).await.expect("save tier");
}

#[must_use]
pub fn openai_key(seed: char) -> ApiKeyDraft {
    ApiKeyDraft { name: None, key_value: format!("sk-{}", seed.to_string().repeat(48)), format: None }
}

/// Stores legacy key material and a known salt, as an older version would have.
pub async fn install_legacy_material(store: &MemoryStore) {
    store.set_one(ENCRYPTION_SALT, json!(SALT)).await.unwrap();
    store.set_one(ENCRYPTION_KEY_MATERIAL, json!(LEGACY_MATERIAL)).await.unwrap();
}

/// Seals `value` the way an older version did: legacy material, legacy work factor.
#[must_use]
pub fn seal_legacy<T: Serialize + ?Sized>(value: &T) -> String {
    Cipher::builder()
        .derive(LEGACY_MATERIAL, SALT, KdfParams::new(LEGACY_KDF_ITERATIONS))
        .unwrap()
        .build()
        .unwrap()
        .seal_json(value)
        .unwrap()
        .into_string()
}

/// The config document as persisted, without decryption.
pub async fn raw_config(store: &MemoryStore) -> Value {
    store.get_one(CONFIG).await.unwrap().expect("config stored")
}
