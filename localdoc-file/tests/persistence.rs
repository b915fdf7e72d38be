use localdoc_core::{
    config::{DEFAULT_STORAGE_KEY, StoreConfig},
    document::{Fields, to_fields},
    storage::KeyValueStorage,
    store::SetOptions,
};
use localdoc_file::FileStorage;
use serde_json::{Value, json};
use tempfile::TempDir;

fn fields(value: Value) -> Fields {
    to_fields(&value).unwrap()
}

#[tokio::test]
async fn documents_survive_reopening() {
    let dir = TempDir::new().unwrap();
    let members = {
        let store = FileStorage::new(dir.path()).open_store().await.unwrap();
        let members = store.collection("members");
        store
            .set_doc(
                &members.doc("awa"),
                fields(json!({ "name": "Awa", "shares": 2 })),
                SetOptions::default(),
            )
            .await
            .unwrap();
        store.add_doc(&members, fields(json!({ "name": "Binta" }))).await.unwrap();
        members
    };

    let store = FileStorage::new(dir.path()).open_store().await.unwrap();
    let snapshot = store.get_docs(&members).await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(
        store.get_doc(&members.doc("awa")).await.unwrap().get("shares"),
        Some(&json!(2))
    );
}

#[tokio::test]
async fn root_directory_is_created_on_first_write() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("data");
    let storage = FileStorage::new(&root);
    let store = storage.open_store().await.unwrap();

    assert!(store.get_docs(&store.collection("members")).await.unwrap().is_empty());
    assert!(!root.exists());

    store.add_doc(&store.collection("members"), Fields::new()).await.unwrap();

    assert!(storage.item_path(DEFAULT_STORAGE_KEY).is_file());
}

#[tokio::test]
async fn blob_on_disk_is_the_database_json() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    let store = storage.open_store().await.unwrap();

    store
        .set_doc(
            &store.doc("prets", Some("p1")),
            fields(json!({ "amount": 300 })),
            SetOptions::default(),
        )
        .await
        .unwrap();

    let raw = storage.get_item(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    let on_disk: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(on_disk, json!({ "prets": { "p1": { "amount": 300 } } }));
}

#[tokio::test]
async fn keys_map_to_separate_files() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    let default = storage.open_store().await.unwrap();
    let other = storage
        .open_store_with(StoreConfig {
            storage_key: "tontine/2025".to_string(),
            ..StoreConfig::default()
        })
        .await
        .unwrap();

    default.add_doc(&default.collection("members"), Fields::new()).await.unwrap();
    other.add_doc(&other.collection("seances"), Fields::new()).await.unwrap();

    assert_eq!(default.list_collections().await.unwrap(), vec!["members".to_string()]);
    assert_eq!(other.list_collections().await.unwrap(), vec!["seances".to_string()]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn similar_keys_do_not_share_a_file() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    let open = |key: &str| {
        storage.open_store_with(StoreConfig {
            storage_key: key.to_string(),
            ..StoreConfig::default()
        })
    };
    let slashed = open("tontine/2025").await.unwrap();
    let underscored = open("tontine_2025").await.unwrap();

    slashed.add_doc(&slashed.collection("members"), Fields::new()).await.unwrap();

    assert!(underscored.list_collections().await.unwrap().is_empty());
    assert_ne!(storage.item_path("tontine/2025"), storage.item_path("tontine_2025"));
    assert!(!storage.item_path("tontine_2025").exists());
}

#[tokio::test]
async fn clear_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    let store = storage.open_store().await.unwrap();
    store.add_doc(&store.collection("members"), Fields::new()).await.unwrap();

    store.clear().await.unwrap();
    store.clear().await.unwrap();

    assert!(!storage.item_path(DEFAULT_STORAGE_KEY).exists());
    assert!(store.export().await.unwrap().is_empty());
}
