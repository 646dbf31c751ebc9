//! Shared test doubles: a scripted oracle and an in-memory storage.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use design_interview::error::{AppResult, StorageResult};
use design_interview::oracle::{Oracle, OracleReply, OracleRequest, SynthesisRequest};
use design_interview::storage::{SessionRecord, SessionSummary, Storage};

/// Serves replies from a script in order; once the script runs out, every
/// further call gets a stop reply. Records the requests it received.
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<OracleReply>>,
    pub requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<OracleReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn request_next(&self, request: OracleRequest) -> OracleReply {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(stop_reply)
    }

    async fn compile_requirements(&self, _request: SynthesisRequest) -> AppResult<String> {
        Ok("# Requirements".to_string())
    }

    async fn generate_mockup(&self, _request: SynthesisRequest) -> AppResult<String> {
        Ok("A single-screen layout".to_string())
    }
}

/// Storage backed by a `HashMap`; enough for session tests that do not
/// exercise SQLite itself.
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_snapshot(&self, record: &SessionRecord) -> StorageResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn load_snapshot(&self, session_id: &str) -> StorageResult<Option<SessionRecord>> {
        Ok(self.records.lock().unwrap().get(session_id).cloned())
    }

    async fn delete_session(&self, session_id: &str) -> StorageResult<()> {
        self.records.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn list_sessions(&self) -> StorageResult<Vec<SessionSummary>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .map(|r| SessionSummary {
                session_id: r.session_id.clone(),
                design_prompt: r.design_prompt.clone(),
                updated_at: r.updated_at,
            })
            .collect())
    }
}

/// A reply carrying candidate questions.
pub fn question_reply(questions: &[&str]) -> OracleReply {
    OracleReply {
        questions: questions.iter().map(|q| q.to_string()).collect(),
        ..Default::default()
    }
}

/// A reply advising the engine to stop the branch.
pub fn stop_reply() -> OracleReply {
    OracleReply {
        should_stop: true,
        stop_reason: "branch covered".to_string(),
        ..Default::default()
    }
}

/// A suggest-answer reply.
pub fn suggestion_reply(answer: &str) -> OracleReply {
    OracleReply {
        suggested_answer: Some(answer.to_string()),
        ..Default::default()
    }
}
