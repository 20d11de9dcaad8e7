use crate::error::StorageError;
use crate::feed::{ContextId, FEED_CAPACITY, StoreChange};
use crate::store::{Entries, KeyValueStore};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug)]
struct MemoryBackend {
    data: RwLock<FxHashMap<String, Value>>,
    feed: broadcast::Sender<StoreChange>,
}

/// In-process store.
///
/// [`MemoryStore::fork`] hands out further handles over the same data and change feed,
/// each writing as its own context. This is how several execution contexts sharing one
/// store are modeled in a single process.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    backend: Arc<MemoryBackend>,
    origin: ContextId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(ContextId::new("main"))
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new(origin: ContextId) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            backend: Arc::new(MemoryBackend { data: RwLock::new(FxHashMap::default()), feed }),
            origin,
        }
    }

    /// A handle over the same backend that writes as `origin`.
    #[must_use]
    pub fn fork(&self, origin: ContextId) -> Self {
        Self { backend: Arc::clone(&self.backend), origin }
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.data.read().len()
    }

    fn publish(&self, key: String) {
        // No receivers is fine
        let _ = self.backend.feed.send(StoreChange { key, origin: self.origin.clone() });
    }
}

impl KeyValueStore for MemoryStore {
    fn origin(&self) -> &ContextId {
        &self.origin
    }

    async fn get(&self, keys: &[&str]) -> Result<Entries, StorageError> {
        let data = self.backend.data.read();
        Ok(keys
            .iter()
            .filter_map(|key| data.get(*key).map(|value| ((*key).to_owned(), value.clone())))
            .collect())
    }

    async fn set(&self, entries: Entries) -> Result<(), StorageError> {
        let keys: Vec<String> = entries.keys().cloned().collect();
        {
            let mut data = self.backend.data.write();
            data.extend(entries);
        }
        for key in keys {
            trace!(key = %key, origin = %self.origin, "Memory store write");
            self.publish(key);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let removed: Vec<String> = {
            let mut data = self.backend.data.write();
            keys.iter().filter(|key| data.remove(**key).is_some()).map(|k| (*k).to_owned()).collect()
        };
        for key in removed {
            self.publish(key);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.backend.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ChangeReceiverExt;
    use serde_json::json;

    #[tokio::test]
    async fn absent_keys_are_omitted() {
        let store = MemoryStore::default();
        store.set_one("config", json!({ "version": 2 })).await.unwrap();

        let got = store.get(&["config", "profiles"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["config"]["version"], 2);
    }

    #[tokio::test]
    async fn forks_share_data_and_feed() {
        let a = MemoryStore::new(ContextId::new("a"));
        let b = a.fork(ContextId::new("b"));
        let mut rx = a.subscribe();

        b.set_one("config", json!(1)).await.unwrap();

        assert_eq!(a.get_one("config").await.unwrap(), Some(json!(1)));
        let drained = rx.drain();
        assert_eq!(drained.changes.len(), 1);
        assert_eq!(drained.changes[0].origin, ContextId::new("b"));
        assert!(drained.touches("config", a.origin()));
    }

    #[tokio::test]
    async fn removing_an_absent_key_publishes_nothing() {
        let store = MemoryStore::default();
        let mut rx = store.subscribe();

        store.remove(&["missing"]).await.unwrap();
        assert!(rx.drain().changes.is_empty());
    }
}
