//! # Shroud
//!
//! Encrypted persistence for alias profiles and the user configuration document.
//!
//! Every component takes an explicit [`KeyValueStore`] handle and an
//! [`IdentityProvider`]. Data keys derive from the identity secret, so data written
//! under one identity stays closed to every other.
//!
//! ## Components
//! - [`EncryptionEngine`]: key derivation, sealing and fault classification.
//! - [`ConfigStore`]: the config document with per-field sealing and a short TTL cache.
//! - [`ProfileStore`]: alias profiles as one sealed array.
//! - [`MigrationCoordinator`]: v1 to v2 schema and legacy to identity key scheme.
//! - [`TierArchive`]: paid-tier data parked on downgrade, restored on upgrade.
//!
//! [`Shroud`] wires them together over one store and runs the startup sequence.
//!
//! ## Usage
//! ```rust,ignore
//! use shroud::{Shroud, StartupState, StaticIdentity, StoreSettings};
//! use shroud_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let shroud = Shroud::new(MemoryStore::default(), Arc::new(StaticIdentity::new("uid")), StoreSettings::default());
//! match shroud.initialize().await? {
//!     StartupState::Ready { profiles } => println!("{} profiles", profiles.len()),
//!     StartupState::Locked => println!("sign in to unlock"),
//!     StartupState::Recovered { notice, .. } => println!("{notice}"),
//! }
//! ```

pub mod archive;
pub mod config;
pub mod encryption;
pub mod error;
pub mod identity;
pub mod migration;
pub mod profiles;
pub mod settings;

pub use archive::{TierArchive, UpgradePreview};
pub use config::ConfigStore;
pub use encryption::{EncryptionEngine, KeyScheme};
pub use error::{DecryptFault, StoreError, StoreErrorExt};
pub use identity::{IdentityProvider, IdentitySecret, SessionIdentity, StaticIdentity};
pub use migration::{MigrationCoordinator, MigrationOutcome};
pub use profiles::ProfileStore;
pub use settings::StoreSettings;
pub use shroud_domain as domain;

use shroud_domain::constants::PROFILES;
use shroud_domain::{AliasProfile, Tier};
use shroud_kernel::time::now_millis;
use shroud_storage::KeyValueStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where startup left the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupState {
    Ready { profiles: Vec<AliasProfile> },
    /// No identity yet. Nothing was read or written that needs one.
    Locked,
    /// Stored data did not open with this identity. The application runs with no
    /// profiles; the ciphertext is left in place.
    Recovered { notice: String, fault: DecryptFault },
}

fn recovery_notice(fault: DecryptFault) -> String {
    match fault {
        DecryptFault::IdentityMismatch => {
            "Your data was encrypted by a different account. Sign in with the original account to access it.".into()
        },
        DecryptFault::Tampered | DecryptFault::Malformed | DecryptFault::Payload => {
            "Stored data is damaged and could not be opened. Starting with an empty profile set.".into()
        },
        DecryptFault::Unverified => {
            "Stored data could not be opened. Sign in with the original account to access it.".into()
        },
    }
}

/// All components over one store.
pub struct Shroud<S> {
    store: S,
    engine: EncryptionEngine<S>,
    config: ConfigStore<S>,
    profiles: ProfileStore<S>,
    archive: TierArchive<S>,
    migrations: MigrationCoordinator<S>,
}

impl<S> fmt::Debug for Shroud<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shroud")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> Shroud<S> {
    #[must_use]
    pub fn new(store: S, identity: Arc<dyn IdentityProvider>, settings: StoreSettings) -> Self {
        let settings = Arc::new(settings);
        let engine = EncryptionEngine::new(store.clone(), identity, Arc::clone(&settings));
        let config = ConfigStore::new(store.clone(), engine.clone(), Arc::clone(&settings));
        let profiles = ProfileStore::new(store.clone(), engine.clone(), config.clone(), Arc::clone(&settings));
        let archive = TierArchive::new(store.clone(), engine.clone(), config.clone(), profiles.clone(), settings);
        let migrations = MigrationCoordinator::new(store.clone(), engine.clone(), config.clone(), profiles.clone());

        Self { store, engine, config, profiles, archive, migrations }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn engine(&self) -> &EncryptionEngine<S> {
        &self.engine
    }

    pub const fn config(&self) -> &ConfigStore<S> {
        &self.config
    }

    pub const fn profiles(&self) -> &ProfileStore<S> {
        &self.profiles
    }

    pub const fn archive(&self) -> &TierArchive<S> {
        &self.archive
    }

    pub const fn migrations(&self) -> &MigrationCoordinator<S> {
        &self.migrations
    }

    /// Runs migrations, seals leftover plaintext, writes first-run defaults and opens
    /// the profiles.
    ///
    /// A missing identity and undecryptable data are states, not errors.
    ///
    /// # Errors
    /// Storage and encoding failures.
    pub async fn initialize(&self) -> Result<StartupState, StoreError> {
        match self.migrations.run().await {
            MigrationOutcome::Success => {},
            MigrationOutcome::AuthRequired => {
                info!("Store locked until an identity is available");
                return Ok(StartupState::Locked);
            },
            MigrationOutcome::Degraded { reason } => warn!(%reason, "Continuing with incomplete migrations"),
        }

        match self.prepare().await {
            Ok(profiles) => {
                info!(profiles = profiles.len(), "Store ready");
                Ok(StartupState::Ready { profiles })
            },
            Err(err) if err.is_key_unavailable() => {
                debug!("Store locked until an identity is available");
                Ok(StartupState::Locked)
            },
            Err(err) => match err.decrypt_fault() {
                Some(fault) => {
                    warn!(%fault, "Stored profiles unreadable, starting empty");
                    Ok(StartupState::Recovered { notice: recovery_notice(fault), fault })
                },
                None => Err(err),
            },
        }
    }

    async fn prepare(&self) -> Result<Vec<AliasProfile>, StoreError> {
        self.config.reseal_plaintext_fields().await?;

        if self.config.load().await?.is_none() {
            info!("Writing default config");
            self.config.save(config::defaults::default_config(Tier::Free, now_millis())).await?;
        }

        let profiles = self.profiles.load().await?;
        if profiles.is_empty() && self.store.get_one(PROFILES).await?.is_none() {
            self.profiles.save(&[]).await?;
        }
        Ok(profiles)
    }
}
