//! Integration tests for the SQLite snapshot storage.

use serde_json::json;
use tempfile::tempdir;

use design_interview::config::DatabaseConfig;
use design_interview::storage::{SessionRecord, SqliteStorage, Storage};

async fn test_storage(dir: &tempfile::TempDir) -> SqliteStorage {
    SqliteStorage::new(&DatabaseConfig {
        path: dir.path().join("snapshots.db"),
        max_connections: 1,
    })
    .await
    .unwrap()
}

fn record(session_id: &str, prompt: &str) -> SessionRecord {
    SessionRecord::new(session_id, prompt, json!({"tree": {}, "questionCount": 0}))
}

#[tokio::test]
async fn test_save_and_load_snapshot() {
    let dir = tempdir().unwrap();
    let storage = test_storage(&dir).await;

    storage
        .save_snapshot(&record("session-1", "Design a parking app"))
        .await
        .unwrap();

    let loaded = storage.load_snapshot("session-1").await.unwrap().unwrap();
    assert_eq!(loaded.session_id, "session-1");
    assert_eq!(loaded.design_prompt, "Design a parking app");
    assert_eq!(loaded.snapshot["questionCount"], 0);
}

#[tokio::test]
async fn test_load_missing_session_returns_none() {
    let dir = tempdir().unwrap();
    let storage = test_storage(&dir).await;

    let loaded = storage.load_snapshot("missing").await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_save_overwrites_existing_snapshot() {
    let dir = tempdir().unwrap();
    let storage = test_storage(&dir).await;

    storage
        .save_snapshot(&record("session-1", "Design a parking app"))
        .await
        .unwrap();

    let mut updated = record("session-1", "Design a parking app");
    updated.snapshot = json!({"tree": {}, "questionCount": 4});
    storage.save_snapshot(&updated).await.unwrap();

    let loaded = storage.load_snapshot("session-1").await.unwrap().unwrap();
    assert_eq!(loaded.snapshot["questionCount"], 4);
}

#[tokio::test]
async fn test_delete_session() {
    let dir = tempdir().unwrap();
    let storage = test_storage(&dir).await;

    storage
        .save_snapshot(&record("session-1", "Design a parking app"))
        .await
        .unwrap();
    storage.delete_session("session-1").await.unwrap();

    assert!(storage.load_snapshot("session-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_session_is_a_noop() {
    let dir = tempdir().unwrap();
    let storage = test_storage(&dir).await;
    assert!(storage.delete_session("missing").await.is_ok());
}

#[tokio::test]
async fn test_list_sessions_most_recent_first() {
    let dir = tempdir().unwrap();
    let storage = test_storage(&dir).await;

    let mut older = record("session-old", "Old prompt");
    older.updated_at = older.updated_at - chrono::Duration::minutes(5);
    storage.save_snapshot(&older).await.unwrap();
    storage
        .save_snapshot(&record("session-new", "New prompt"))
        .await
        .unwrap();

    let sessions = storage.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_id, "session-new");
    assert_eq!(sessions[1].session_id, "session-old");
}

#[tokio::test]
async fn test_corrupt_snapshot_is_reported() {
    let dir = tempdir().unwrap();
    let storage = test_storage(&dir).await;

    // Bypass the typed API and write a non-JSON snapshot column.
    sqlx::query("INSERT INTO sessions (id, design_prompt, snapshot, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
        .bind("session-bad")
        .bind("prompt")
        .bind("{not json")
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(storage.pool())
        .await
        .unwrap();

    let result = storage.load_snapshot("session-bad").await;
    assert!(result.is_err());
}
