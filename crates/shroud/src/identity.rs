//! Sources of the identity secret keys are derived from.
//!
//! The secret is opaque to the store: it only needs to be stable for one user and
//! unavailable to anyone else. It is held in memory, zeroized on drop, and never
//! written to the key-value store.

use parking_lot::RwLock;
use std::fmt;
use tokio::sync::watch;
use zeroize::Zeroizing;

/// The identity secret as handed to key derivation.
pub type IdentitySecret = Zeroizing<String>;

/// Supplies the identity secret, which may be absent at any time.
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// The secret of the signed-in identity, if any.
    fn current_secret(&self) -> Option<IdentitySecret>;

    /// A counter bumped whenever the identity changes.
    fn changes(&self) -> watch::Receiver<u64>;

    /// True while an identity session exists in this context.
    fn has_session(&self) -> bool {
        self.current_secret().is_some()
    }
}

/// Identity driven by sign-in and sign-out events.
pub struct SessionIdentity {
    secret: RwLock<Option<IdentitySecret>>,
    version: watch::Sender<u64>,
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("signed_in", &self.secret.read().is_some())
            .field("version", &*self.version.borrow())
            .finish()
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdentity {
    /// Starts signed out.
    #[must_use]
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self { secret: RwLock::new(None), version }
    }

    pub fn sign_in(&self, secret: impl Into<String>) {
        *self.secret.write() = Some(Zeroizing::new(secret.into()));
        self.bump();
    }

    pub fn sign_out(&self) {
        *self.secret.write() = None;
        self.bump();
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_secret(&self) -> Option<IdentitySecret> {
        self.secret.read().clone()
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

/// A fixed identity, or a fixed absence of one.
pub struct StaticIdentity {
    secret: Option<IdentitySecret>,
    version: watch::Sender<u64>,
}

impl fmt::Debug for StaticIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticIdentity").field("present", &self.secret.is_some()).finish()
    }
}

impl StaticIdentity {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self::from_option(Some(secret.into()))
    }

    /// A context that never has an identity.
    #[must_use]
    pub fn none() -> Self {
        Self::from_option(None)
    }

    fn from_option(secret: Option<String>) -> Self {
        let (version, _) = watch::channel(0);
        Self { secret: secret.map(Zeroizing::new), version }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_secret(&self) -> Option<IdentitySecret> {
        self.secret.clone()
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_identity_notifies_on_every_change() {
        let identity = SessionIdentity::new();
        let mut changes = identity.changes();
        assert!(!identity.has_session());

        identity.sign_in("uid-1");
        assert!(changes.has_changed().unwrap());
        assert_eq!(identity.current_secret().as_deref().map(String::as_str), Some("uid-1"));
        changes.mark_unchanged();

        identity.sign_out();
        assert!(changes.has_changed().unwrap());
        assert!(identity.current_secret().is_none());
    }

    #[test]
    fn debug_output_never_contains_the_secret() {
        let session = SessionIdentity::new();
        session.sign_in("very-secret");
        let fixed = StaticIdentity::new("very-secret");

        assert!(!format!("{session:?}").contains("very-secret"));
        assert!(!format!("{fixed:?}").contains("very-secret"));
    }

    #[test]
    fn static_identity_is_constant() {
        assert!(StaticIdentity::new("x").has_session());
        assert!(!StaticIdentity::none().has_session());
    }
}
