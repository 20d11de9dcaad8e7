use crate::error::StorageError;
use crate::feed::{ContextId, StoreChange};
use serde_json::Value;
use std::future::Future;
use tokio::sync::broadcast;

/// A batch of key/value pairs as read from or written to a store.
pub type Entries = serde_json::Map<String, Value>;

/// Async string-keyed JSON store shared by several execution contexts.
///
/// Every handle belongs to exactly one context ([`KeyValueStore::origin`]). Writes and
/// removals are published on the shared change feed tagged with that context, so peers
/// can invalidate what they cached.
///
/// Missing keys are simply absent from the map returned by [`KeyValueStore::get`].
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    /// The context this handle writes as.
    fn origin(&self) -> &ContextId;

    /// Reads the given keys. Absent keys are omitted from the result.
    fn get(&self, keys: &[&str]) -> impl Future<Output = Result<Entries, StorageError>> + Send;

    /// Writes every entry, replacing previous values wholesale.
    fn set(&self, entries: Entries) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Removes the given keys. Removing an absent key is not an error.
    fn remove(&self, keys: &[&str]) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Subscribes to changes made through any handle sharing this backend.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;

    /// Reads a single key.
    fn get_one(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, StorageError>> + Send {
        async move { Ok(self.get(&[key]).await?.remove(key)) }
    }

    /// Writes a single key.
    fn set_one(
        &self,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        let mut entries = Entries::new();
        entries.insert(key.to_owned(), value);
        self.set(entries)
    }
}
