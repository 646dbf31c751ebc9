//! # Design Interview Engine
//!
//! An adaptive interview engine that turns a one-line design prompt into a
//! structured requirements conversation. Questions are generated by an
//! external LLM oracle and grown into a tree; a traversal policy (BFS or
//! DFS) decides which question to surface next, suppresses duplicates, and
//! backtracks through partially covered branches.
//!
//! ## Features
//!
//! - **Question Tree**: Root prompt with question/answer nodes, depth-capped
//!   branches, and monotonic sequence numbers
//! - **BFS / DFS Traversal**: Breadth-first level sweeps with sibling caps,
//!   or depth-first drilling with backtracking
//! - **Duplicate Suppression**: Asked-question and asked-topic sets keep the
//!   interview from circling
//! - **Auto-Answer Automation**: The oracle answers its own questions with a
//!   cancellable settle window between cycles
//! - **Synthesis**: Compile the answered history into a requirements
//!   document or a mockup description
//! - **Persistence**: Session snapshots in SQLite, restorable mid-interview
//!
//! ## Architecture
//!
//! ```text
//! CLI → Session Controller → Traversal Engine → Oracle (HTTP)
//!                 ↓
//!           SQLite (Snapshots)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use design_interview::config::Config;
//! use design_interview::oracle::OracleClient;
//! use design_interview::session::{InterviewSettings, SessionController};
//! use design_interview::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let oracle = Arc::new(OracleClient::new(&config.oracle, config.request.clone())?);
//!     let storage = Arc::new(SqliteStorage::new(&config.database).await?);
//!     let mut session = SessionController::begin(
//!         "Design a parking app",
//!         InterviewSettings::default(),
//!         oracle,
//!         storage,
//!         Vec::new(),
//!     )
//!     .await?;
//!     while let Some(node) = session.current_question() {
//!         println!("{}", node.question);
//!         session.submit_answer("...").await?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Auto-answer automation loop with cooperative cancellation.
pub mod automation;
/// Configuration management, loaded from the environment.
pub mod config;
/// Traversal engine: BFS/DFS policies over the question tree.
pub mod engine;
/// Error types and result aliases for the application.
pub mod error;
/// Oracle client and types for LLM pipe communication.
pub mod oracle;
/// System prompts for the oracle pipes.
pub mod prompts;
/// Session controller and snapshot persistence.
pub mod session;
/// SQLite storage layer for session snapshots.
pub mod storage;
/// Topic extraction and answer aspect splitting.
pub mod topics;
/// The question tree and its node types.
pub mod tree;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use session::{InterviewSettings, SessionController, SessionSnapshot};
