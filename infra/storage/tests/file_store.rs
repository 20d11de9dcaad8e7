use serde_json::json;
use shroud_storage::*;
use tempfile::TempDir;

async fn open(temp: &TempDir, compression: Compression) -> FileStore {
    FileStore::builder().root(temp.path().join("store")).compression(compression).connect().await.unwrap()
}

#[tokio::test]
async fn test_write_read_roundtrip_uncompressed() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp, Compression::None).await;

    let doc = json!({ "version": 2, "settings": { "theme": "classic-dark" } });
    store.set_one("config", doc.clone()).await.unwrap();

    assert_eq!(store.get_one("config").await.unwrap(), Some(doc));
    assert!(store.resolve("config").unwrap().ends_with("config.json"));
}

#[tokio::test]
async fn test_write_read_roundtrip_compressed() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp, Compression::Lz4).await;

    let blob = json!("A".repeat(4096));
    store.set_one("profiles", blob.clone()).await.unwrap();

    assert_eq!(store.get_one("profiles").await.unwrap(), Some(blob));
    let on_disk = std::fs::metadata(store.resolve("profiles").unwrap()).unwrap().len();
    assert!(on_disk < 4096);
}

#[tokio::test]
async fn test_values_survive_reconnect() {
    let temp = TempDir::new().unwrap();
    open(&temp, Compression::None).await.set_one("dataVersion", json!(2)).await.unwrap();

    let reopened = open(&temp, Compression::None).await;
    assert_eq!(reopened.get_one("dataVersion").await.unwrap(), Some(json!(2)));
    assert_eq!(reopened.keys().await.unwrap(), vec!["dataVersion".to_owned()]);
}

#[tokio::test]
async fn test_invalid_keys_are_rejected_before_writing() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp, Compression::None).await;

    let mut entries = Entries::new();
    entries.insert("config".into(), json!(1));
    entries.insert("../escape".into(), json!(2));

    let err = store.set(entries).await.unwrap_err();
    assert_eq!(err.kind(), "InvalidKey");
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_is_idempotent_and_notifies_once() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp, Compression::None).await;
    let peer = store.fork(ContextId::new("peer"));
    let mut rx = peer.subscribe();

    store.set_one("_archivedProData", json!({})).await.unwrap();
    store.remove(&["_archivedProData"]).await.unwrap();
    store.remove(&["_archivedProData"]).await.unwrap();

    let drained = rx.drain();
    assert_eq!(drained.changes.len(), 2);
    assert!(drained.changes.iter().all(|c| c.origin == ContextId::new("main")));
    assert_eq!(store.get_one("_archivedProData").await.unwrap(), None);
}

#[tokio::test]
async fn test_corrupt_file_is_a_serialization_error() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp, Compression::None).await;
    std::fs::write(store.resolve("config").unwrap(), b"{ not json").unwrap();

    let err = store.get(&["config"]).await.unwrap_err();
    assert_eq!(err.kind(), "Serialization");
}

#[tokio::test]
async fn test_connect_without_create_fails_on_missing_root() {
    let temp = TempDir::new().unwrap();
    let result = FileStore::builder().root(temp.path().join("absent")).create(false).connect().await;
    assert!(matches!(result, Err(StorageError::Io { .. })));
}
