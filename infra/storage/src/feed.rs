//! Cross-context change notifications.
//!
//! Every write or removal publishes one [`StoreChange`] per key on a broadcast channel
//! shared by all contexts attached to the same backend. Receivers decide for themselves
//! whether a change is foreign by comparing [`StoreChange::origin`] with their own
//! [`ContextId`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub(crate) const FEED_CAPACITY: usize = 256;

/// Identifies one execution context sharing a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(Arc<str>);

impl ContextId {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key was written or removed by `origin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
    pub origin: ContextId,
}

impl StoreChange {
    #[must_use]
    pub fn is_foreign_to(&self, context: &ContextId) -> bool {
        &self.origin != context
    }
}

/// Result of draining a receiver without waiting.
#[derive(Debug, Default)]
pub struct Drained {
    pub changes: Vec<StoreChange>,
    /// Messages were dropped because the receiver fell behind.
    pub lagged: bool,
}

impl Drained {
    /// True when a foreign change touched `key`, or when lag makes that unknowable.
    #[must_use]
    pub fn touches(&self, key: &str, context: &ContextId) -> bool {
        self.lagged || self.changes.iter().any(|c| c.key == key && c.is_foreign_to(context))
    }
}

/// Lag-tolerant helpers for change receivers.
pub trait ChangeReceiverExt {
    /// Waits for the next change, skipping over lag. Returns `None` when the feed is closed.
    fn recv_change(&mut self) -> impl Future<Output = Option<StoreChange>> + Send;

    /// Collects every change queued so far without waiting.
    fn drain(&mut self) -> Drained;
}

impl ChangeReceiverExt for broadcast::Receiver<StoreChange> {
    async fn recv_change(&mut self) -> Option<StoreChange> {
        let mut skipped = 0u64;

        loop {
            match self.recv().await {
                Ok(change) => {
                    if skipped > 0 {
                        warn!(skipped, "Change feed receiver lagged; continuing from latest change");
                    }
                    return Some(change);
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    skipped = skipped.saturating_add(n);
                    debug!(skipped = n, total_skipped = skipped, "Change feed receiver lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn drain(&mut self) -> Drained {
        let mut drained = Drained::default();

        loop {
            match self.try_recv() {
                Ok(change) => drained.changes.push(change),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    debug!(skipped = n, "Change feed receiver lagged while draining");
                    drained.lagged = true;
                },
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                    return drained;
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(key: &str, origin: &str) -> StoreChange {
        StoreChange { key: key.into(), origin: ContextId::new(origin) }
    }

    #[test]
    fn drain_collects_queued_changes() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(change("config", "a")).unwrap();
        tx.send(change("profiles", "b")).unwrap();

        let drained = rx.drain();
        assert_eq!(drained.changes.len(), 2);
        assert!(!drained.lagged);
        assert!(rx.drain().changes.is_empty());
    }

    #[test]
    fn own_changes_do_not_touch_a_key() {
        let me = ContextId::new("a");
        let drained = Drained { changes: vec![change("config", "a")], lagged: false };
        assert!(!drained.touches("config", &me));

        let drained = Drained { changes: vec![change("config", "b")], lagged: false };
        assert!(drained.touches("config", &me));
        assert!(!drained.touches("profiles", &me));
    }

    #[test]
    fn lag_is_reported_and_counts_as_touching() {
        let (tx, mut rx) = broadcast::channel(2);
        for i in 0..5 {
            tx.send(change(&format!("k{i}"), "b")).unwrap();
        }

        let drained = rx.drain();
        assert!(drained.lagged);
        assert!(drained.touches("anything", &ContextId::new("a")));
    }

    #[tokio::test]
    async fn recv_change_skips_lag_and_ends_on_close() {
        let (tx, mut rx) = broadcast::channel(2);
        for i in 0..5 {
            tx.send(change(&format!("k{i}"), "b")).unwrap();
        }
        drop(tx);

        assert_eq!(rx.recv_change().await.unwrap().key, "k3");
        assert_eq!(rx.recv_change().await.unwrap().key, "k4");
        assert!(rx.recv_change().await.is_none());
    }
}
