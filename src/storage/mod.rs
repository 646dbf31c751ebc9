//! Storage layer for session snapshot persistence.
//!
//! The traversal engine never sees this layer: the session controller saves
//! and restores opaque snapshots through the [`Storage`] trait.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// A persisted session snapshot with its bookkeeping columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier.
    pub session_id: String,
    /// The original design prompt, duplicated out of the snapshot for
    /// listing without deserializing.
    pub design_prompt: String,
    /// The serialized [`crate::session::SessionSnapshot`].
    pub snapshot: serde_json::Value,
    /// When the session was first saved.
    pub created_at: DateTime<Utc>,
    /// When the snapshot was last written.
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a record for the first save of a session.
    pub fn new(
        session_id: impl Into<String>,
        design_prompt: impl Into<String>,
        snapshot: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            design_prompt: design_prompt.into(),
            snapshot,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Summary row for session listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub design_prompt: String,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot persistence operations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert or replace the snapshot for a session.
    async fn save_snapshot(&self, record: &SessionRecord) -> StorageResult<()>;

    /// Load a session's snapshot, if present.
    async fn load_snapshot(&self, session_id: &str) -> StorageResult<Option<SessionRecord>>;

    /// Delete a session and its snapshot.
    async fn delete_session(&self, session_id: &str) -> StorageResult<()>;

    /// List saved sessions, most recently updated first.
    async fn list_sessions(&self) -> StorageResult<Vec<SessionSummary>>;
}
