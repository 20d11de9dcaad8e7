//! Key-value storage shared by several execution contexts.
//!
//! The crate defines the [`KeyValueStore`] contract the rest of the workspace is written
//! against, plus two backends:
//!
//! - **[`MemoryStore`]**: in-process map. [`MemoryStore::fork`] creates further handles
//!   over the same data, each acting as a separate context.
//! - **[`FileStore`]**: one JSON file per key under a root directory, written atomically
//!   (temp file + `fsync` + rename), with optional LZ4 compression and temp-file
//!   self-healing on connect.
//!
//! # Change Feed
//!
//! Every write and removal is published as a [`StoreChange`] tagged with the writing
//! [`ContextId`]. Consumers holding caches subscribe and drop entries touched by other
//! contexts; [`ChangeReceiverExt`] adds lag-tolerant receive and non-blocking drain.
//!
//! # Examples
//!
//! ```rust
//! use shroud_storage::{ChangeReceiverExt, ContextId, KeyValueStore, MemoryStore};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), shroud_storage::StorageError> {
//! let popup = MemoryStore::new(ContextId::new("popup"));
//! let background = popup.fork(ContextId::new("background"));
//! let mut changes = popup.subscribe();
//!
//! background.set_one("config", json!({ "version": 2 })).await?;
//!
//! assert!(changes.drain().touches("config", popup.origin()));
//! # Ok(())
//! # }
//! ```

mod builder;
mod engine;
mod error;
mod feed;
mod key;
mod maintenance;
mod memory;
mod store;

pub use builder::FileStoreBuilder;
pub use engine::{Compression, FileStore};
pub use error::{StorageError, StorageErrorExt};
pub use feed::{ChangeReceiverExt, ContextId, Drained, StoreChange};
pub use key::StoreKey;
pub use memory::MemoryStore;
pub use store::{Entries, KeyValueStore};
