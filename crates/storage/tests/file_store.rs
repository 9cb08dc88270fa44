//! Integration tests for the file-backed state store.

use serde::{Deserialize, Serialize};
use storage::{FileStateStore, StateStore, StateStoreExt, StorageError, keys};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Line {
    id: String,
    quantity: u32,
}

#[tokio::test]
async fn snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let store = FileStateStore::open(dir.path()).await.unwrap();
    let cart = vec![Line {
        id: "p1".to_string(),
        quantity: 2,
    }];
    store.save_state(keys::CART, &cart).await.unwrap();
    drop(store);

    let reopened = FileStateStore::open(dir.path()).await.unwrap();
    let loaded: Option<Vec<Line>> = reopened.load_state(keys::CART).await.unwrap();
    assert_eq!(loaded, Some(cart));
}

#[tokio::test]
async fn later_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let tab_a = FileStateStore::open(dir.path()).await.unwrap();
    let tab_b = FileStateStore::open(dir.path()).await.unwrap();

    tab_a.save_state(keys::LAST_COUPON, &"SAVE10").await.unwrap();
    tab_b.save_state(keys::LAST_COUPON, &"SAVE20").await.unwrap();

    let loaded: Option<String> = tab_a.load_state(keys::LAST_COUPON).await.unwrap();
    assert_eq!(loaded.as_deref(), Some("SAVE20"));
}

#[tokio::test]
async fn missing_key_loads_none_and_removes_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path().join("nested")).await.unwrap();

    assert!(store.load(keys::CHECKOUT_ADDRESS).await.unwrap().is_none());
    store.remove(keys::CHECKOUT_ADDRESS).await.unwrap();
}

#[tokio::test]
async fn corrupt_file_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();
    tokio::fs::write(dir.path().join("my_store_cart.json"), b"{not json")
        .await
        .unwrap();

    let result = store.load(keys::CART).await;
    assert!(matches!(result, Err(StorageError::Serialization(_))));
}

#[tokio::test]
async fn path_traversal_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();
    let result = store.load("../outside").await;
    assert!(matches!(result, Err(StorageError::InvalidKey(_))));
}
