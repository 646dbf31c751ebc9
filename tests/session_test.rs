//! Integration tests for the session controller: snapshot persistence,
//! restore semantics, re-answering, and restart.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use common::{question_reply, stop_reply, suggestion_reply, MemoryStorage, ScriptedOracle};
use design_interview::config::DatabaseConfig;
use design_interview::engine::TraversalMode;
use design_interview::oracle::{Oracle, OracleReply};
use design_interview::session::{InterviewSettings, SessionController};
use design_interview::storage::{SqliteStorage, Storage};

fn dfs_settings() -> InterviewSettings {
    InterviewSettings {
        mode: TraversalMode::Dfs,
        ..Default::default()
    }
}

fn as_oracle(oracle: &Arc<ScriptedOracle>) -> Arc<dyn Oracle> {
    Arc::clone(oracle) as Arc<dyn Oracle>
}

#[tokio::test]
async fn test_snapshot_round_trip_through_sqlite() {
    let dir = tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&DatabaseConfig {
            path: dir.path().join("sessions.db"),
            max_connections: 1,
        })
        .await
        .unwrap(),
    );

    let oracle = ScriptedOracle::new(vec![
        question_reply(&["Who parks here?"]),
        question_reply(&["How do they pay?"]),
    ]);
    let mut session = SessionController::begin(
        "Design a parking app",
        dfs_settings(),
        as_oracle(&oracle),
        Arc::clone(&storage),
        Vec::new(),
    )
    .await
    .unwrap();
    let session_id = session.id().to_string();

    session.submit_answer("Daily commuters").await.unwrap();
    assert_eq!(
        session.current_question().unwrap().question,
        "How do they pay?"
    );
    drop(session);

    let restored = SessionController::restore(
        &session_id,
        ScriptedOracle::new(vec![]),
        storage,
        Vec::new(),
    )
    .await
    .unwrap();

    assert_eq!(restored.design_prompt(), "Design a parking app");
    assert_eq!(restored.question_count(), 2);
    assert_eq!(restored.settings().mode, TraversalMode::Dfs);
    assert_eq!(
        restored.current_question().unwrap().question,
        "How do they pay?"
    );
    let history = restored.tree().answered_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].answer.as_deref(), Some("Daily commuters"));
}

#[tokio::test]
async fn test_restore_suppresses_previously_asked_questions() {
    let storage = MemoryStorage::new();
    let oracle = ScriptedOracle::new(vec![question_reply(&["Who parks here?"])]);
    let session = SessionController::begin(
        "Design a parking app",
        dfs_settings(),
        as_oracle(&oracle),
        Arc::clone(&storage) as Arc<dyn Storage>,
        Vec::new(),
    )
    .await
    .unwrap();
    let session_id = session.id().to_string();
    drop(session);

    // After restore, the oracle repeats the question already in the tree.
    let mut restored = SessionController::restore(
        &session_id,
        ScriptedOracle::new(vec![
            question_reply(&["Who parks here?", "Where are the garages?"]),
        ]),
        storage,
        Vec::new(),
    )
    .await
    .unwrap();

    restored.submit_answer("Daily commuters").await.unwrap();
    assert_eq!(
        restored.current_question().unwrap().question,
        "Where are the garages?"
    );
    assert_eq!(restored.tree().question_count(), 2);
}

#[tokio::test]
async fn test_restore_unknown_session_fails() {
    let storage = MemoryStorage::new();
    let result = SessionController::restore(
        "no-such-session",
        ScriptedOracle::new(vec![]),
        storage,
        Vec::new(),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_duplicate_only_reply_retries_once() {
    let storage = MemoryStorage::new();
    // Script: first question; the follow-up request only repeats it, the
    // branch falls back to a stopped top-level request, then the retry
    // produces a fresh question.
    let oracle = ScriptedOracle::new(vec![
        question_reply(&["Who parks here?"]),
        question_reply(&["who parks here?"]),
        stop_reply(),
        question_reply(&["What does parking cost?"]),
    ]);
    let mut session = SessionController::begin(
        "Design a parking app",
        dfs_settings(),
        as_oracle(&oracle),
        storage,
        Vec::new(),
    )
    .await
    .unwrap();

    let next = session.submit_answer("Daily commuters").await.unwrap();
    assert!(next.is_some());
    assert_eq!(
        session.current_question().unwrap().question,
        "What does parking cost?"
    );
    assert_eq!(session.question_count(), 2);
}

#[tokio::test]
async fn test_re_answer_keeps_descendants() {
    let storage = MemoryStorage::new();
    let oracle = ScriptedOracle::new(vec![
        question_reply(&["Who parks here?"]),
        question_reply(&["How do they pay?"]),
    ]);
    let mut session = SessionController::begin(
        "Design a parking app",
        dfs_settings(),
        as_oracle(&oracle),
        storage,
        Vec::new(),
    )
    .await
    .unwrap();

    let first_id = session.current_question().unwrap().id.clone();
    session.submit_answer("Daily commuters").await.unwrap();
    let child_id = session.current_question().unwrap().id.clone();

    session
        .re_answer(&first_id, "Commuters and weekend visitors")
        .await
        .unwrap();

    let node = session.tree().find(&first_id).unwrap();
    assert_eq!(node.answer.as_deref(), Some("Commuters and weekend visitors"));
    // The child branch survives the overwrite.
    assert!(session.tree().find(&child_id).is_some());
}

#[tokio::test]
async fn test_requirements_document_is_persisted() {
    let storage = MemoryStorage::new();
    let oracle = ScriptedOracle::new(vec![question_reply(&["Who parks here?"])]);
    let mut session = SessionController::begin(
        "Design a parking app",
        dfs_settings(),
        as_oracle(&oracle),
        Arc::clone(&storage) as Arc<dyn Storage>,
        Vec::new(),
    )
    .await
    .unwrap();
    let session_id = session.id().to_string();

    session.submit_answer("Daily commuters").await.unwrap();
    let document = session.compile_requirements().await.unwrap();
    assert_eq!(document, "# Requirements");
    drop(session);

    let restored = SessionController::restore(
        &session_id,
        ScriptedOracle::new(vec![]),
        storage,
        Vec::new(),
    )
    .await
    .unwrap();
    assert_eq!(restored.requirements_document(), Some("# Requirements"));
}

#[tokio::test]
async fn test_restart_replaces_tree() {
    let storage = MemoryStorage::new();
    let oracle = ScriptedOracle::new(vec![
        question_reply(&["Who parks here?"]),
        question_reply(&["Who reads the articles?"]),
    ]);
    let mut session = SessionController::begin(
        "Design a parking app",
        dfs_settings(),
        as_oracle(&oracle),
        storage,
        Vec::new(),
    )
    .await
    .unwrap();

    session.restart("Design a news reader").await.unwrap();

    assert_eq!(session.design_prompt(), "Design a news reader");
    assert_eq!(session.tree().question_count(), 1);
    assert_eq!(
        session.current_question().unwrap().question,
        "Who reads the articles?"
    );
    assert!(session.requirements_document().is_none());
}

#[tokio::test]
async fn test_suggestion_flow_answers_current_question() {
    let storage = MemoryStorage::new();
    let oracle = ScriptedOracle::new(vec![
        question_reply(&["Who parks here?"]),
        suggestion_reply("Daily commuters"),
    ]);
    let mut session = SessionController::begin(
        "Design a parking app",
        dfs_settings(),
        as_oracle(&oracle),
        storage,
        Vec::new(),
    )
    .await
    .unwrap();

    // The controller builds a suggest-answer request for the current node.
    let request = session.suggestion_request();
    assert!(request.is_none() == session.is_complete());

    let reply: OracleReply = oracle.request_next(request.unwrap()).await;
    session
        .submit_answer(reply.suggested_answer.unwrap())
        .await
        .unwrap();

    let history = session.tree().answered_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].answer.as_deref(), Some("Daily commuters"));
}
