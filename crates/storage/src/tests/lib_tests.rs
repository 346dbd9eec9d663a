use super::*;

#[tokio::test]
async fn writes_reads_and_deletes_values() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.read("session").await.expect("read"), None);

    storage.write("session", "first").await.expect("write");
    assert_eq!(
        storage.read("session").await.expect("read").as_deref(),
        Some("first")
    );

    storage.write("session", "second").await.expect("overwrite");
    assert_eq!(
        storage.read("session").await.expect("read").as_deref(),
        Some("second")
    );

    storage.delete("session").await.expect("delete");
    assert_eq!(storage.read("session").await.expect("read"), None);
}

#[tokio::test]
async fn deleting_missing_key_is_not_an_error() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.delete("absent").await.expect("delete");
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("report_client_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("client.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage.write("k", "v").await.expect("write");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(reopened.read("k").await.expect("read").as_deref(), Some("v"));
    drop(reopened);

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn memory_store_round_trips_values() {
    let store = MemoryStore::new();
    store.write("a", "1").await.expect("write");
    assert_eq!(store.read("a").await.expect("read").as_deref(), Some("1"));
    store.delete("a").await.expect("delete");
    assert_eq!(store.read("a").await.expect("read"), None);
}

#[test]
fn sqlite_path_ignores_memory_and_non_sqlite_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://localhost/db"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/client.db?mode=rwc"),
        Some(PathBuf::from("./data/client.db"))
    );
}
