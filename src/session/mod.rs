//! Session controller: composes the tree, traversal engine, oracle, and
//! storage into the user-facing operations, and owns snapshot persistence.
//!
//! One controller exclusively owns one tree; every mutation funnels through
//! `&mut self`, so tree mutations are atomic relative to each call. The
//! `epoch` counter guards against late-arriving oracle results mutating a
//! tree that was replaced by a restart.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::InterviewConfig;
use crate::engine::{TraversalContext, TraversalEngine, TraversalMode};
use crate::error::{AppError, AppResult, StorageError};
use crate::oracle::{KnowledgeDoc, Oracle, OracleRequest, SynthesisRequest};
use crate::storage::{SessionRecord, Storage};
use crate::tree::{QuestionNode, QuestionTree};

/// Per-session interview settings, persisted in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSettings {
    pub mode: TraversalMode,
    pub max_depth: usize,
    pub max_questions: Option<usize>,
    /// Settle delay between an accepted suggestion and applying it, in
    /// automation mode.
    pub auto_settle_ms: u64,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            mode: TraversalMode::Bfs,
            max_depth: 5,
            max_questions: None,
            auto_settle_ms: 1500,
        }
    }
}

impl InterviewSettings {
    /// Build settings from the configured interview limits.
    pub fn from_config(mode: TraversalMode, config: &InterviewConfig) -> Self {
        Self {
            mode,
            max_depth: config.max_depth,
            max_questions: config.max_questions,
            auto_settle_ms: config.auto_settle_ms,
        }
    }
}

/// The persisted session state. Opaque to the traversal engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub tree: QuestionTree,
    pub current_node_id: Option<String>,
    pub question_count: usize,
    pub design_prompt: String,
    pub settings: InterviewSettings,
    pub requirements_document: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// Orchestrates one interview session.
pub struct SessionController {
    id: String,
    design_prompt: String,
    tree: QuestionTree,
    ctx: TraversalContext,
    engine: TraversalEngine,
    oracle: Arc<dyn Oracle>,
    storage: Arc<dyn Storage>,
    settings: InterviewSettings,
    knowledge: Vec<KnowledgeDoc>,
    current: Option<String>,
    requirements: Option<String>,
    epoch: u64,
    in_flight: bool,
}

impl SessionController {
    /// Start a fresh session: create the root, surface the first question,
    /// and persist the initial snapshot.
    pub async fn begin(
        design_prompt: impl Into<String>,
        settings: InterviewSettings,
        oracle: Arc<dyn Oracle>,
        storage: Arc<dyn Storage>,
        knowledge: Vec<KnowledgeDoc>,
    ) -> AppResult<Self> {
        let design_prompt = design_prompt.into();
        let tree = QuestionTree::new(&design_prompt);
        let ctx = build_context(&settings);
        let engine = TraversalEngine::new(Arc::clone(&oracle), &design_prompt)
            .with_knowledge(knowledge.clone());

        let mut session = Self {
            id: Uuid::new_v4().to_string(),
            design_prompt,
            tree,
            ctx,
            engine,
            oracle,
            storage,
            settings,
            knowledge,
            current: None,
            requirements: None,
            epoch: 0,
            in_flight: false,
        };

        session.current = session
            .engine
            .advance(&mut session.tree, &mut session.ctx, None)
            .await?;
        session.save().await?;

        info!(
            session_id = %session.id,
            mode = %session.settings.mode,
            "Interview session started"
        );
        Ok(session)
    }

    /// Restore a session from its persisted snapshot. The asked sets are
    /// rebuilt by walking the restored tree before traversal resumes.
    pub async fn restore(
        session_id: &str,
        oracle: Arc<dyn Oracle>,
        storage: Arc<dyn Storage>,
        knowledge: Vec<KnowledgeDoc>,
    ) -> AppResult<Self> {
        let record = storage
            .load_snapshot(session_id)
            .await?
            .ok_or_else(|| StorageError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        let snapshot: SessionSnapshot =
            serde_json::from_value(record.snapshot).map_err(|e| StorageError::SnapshotCorrupt {
                session_id: session_id.to_string(),
                message: e.to_string(),
            })?;

        let mut ctx = build_context(&snapshot.settings);
        ctx.rebuild_from_tree(&snapshot.tree);

        // A current pointer at a node the snapshot does not contain means the
        // snapshot is internally inconsistent.
        if let Some(current) = &snapshot.current_node_id {
            if snapshot.tree.find(current).is_none() {
                return Err(AppError::invariant(format!(
                    "snapshot current node {} is not in the tree",
                    current
                )));
            }
        }

        let engine = TraversalEngine::new(Arc::clone(&oracle), &snapshot.design_prompt)
            .with_knowledge(knowledge.clone());

        info!(session_id = %session_id, "Interview session restored");
        Ok(Self {
            id: session_id.to_string(),
            design_prompt: snapshot.design_prompt,
            tree: snapshot.tree,
            ctx,
            engine,
            oracle,
            storage,
            settings: snapshot.settings,
            knowledge,
            current: snapshot.current_node_id,
            requirements: snapshot.requirements_document,
            epoch: 0,
            in_flight: false,
        })
    }

    /// Answer the current question and advance. Interactive mode: a
    /// no-candidate advance (duplicate or oracle stop) is retried once
    /// before the session is considered complete.
    pub async fn submit_answer(&mut self, answer: impl Into<String>) -> AppResult<Option<String>> {
        self.answer_and_advance(answer, true).await
    }

    /// Automation-mode variant: no retry, a no-candidate advance terminates.
    pub(crate) async fn apply_suggestion(
        &mut self,
        answer: impl Into<String>,
    ) -> AppResult<Option<String>> {
        self.answer_and_advance(answer, false).await
    }

    async fn answer_and_advance(
        &mut self,
        answer: impl Into<String>,
        retry_once: bool,
    ) -> AppResult<Option<String>> {
        let current = self.current.clone().ok_or_else(|| AppError::Internal {
            message: "no active question to answer".to_string(),
        })?;

        self.tree.answer(&current, answer)?;

        let mut next = self
            .engine
            .advance(&mut self.tree, &mut self.ctx, Some(&current))
            .await?;
        if next.is_none() && retry_once && !self.ctx.at_question_cap() {
            debug!("Advance produced no candidate, retrying once");
            next = self
                .engine
                .advance(&mut self.tree, &mut self.ctx, Some(&current))
                .await?;
        }

        self.current = next.clone();
        self.save().await?;
        Ok(next)
    }

    /// Overwrite the answer on a previously answered node. Descendants are
    /// kept; only the answer value changes.
    pub async fn re_answer(
        &mut self,
        node_id: &str,
        answer: impl Into<String>,
    ) -> AppResult<()> {
        self.tree.answer(node_id, answer)?;
        self.ctx.rebuild_from_tree(&self.tree);
        self.save().await
    }

    /// Compile the answered history into a requirements document.
    pub async fn compile_requirements(&mut self) -> AppResult<String> {
        let document = self
            .oracle
            .compile_requirements(self.synthesis_request())
            .await?;
        self.requirements = Some(document.clone());
        self.save().await?;
        Ok(document)
    }

    /// Describe a UI mockup from the answered history. Rendering is a
    /// presentation concern; the description is returned, not stored.
    pub async fn generate_mockup(&self) -> AppResult<String> {
        self.oracle.generate_mockup(self.synthesis_request()).await
    }

    /// Replace the tree wholesale and start over with a new prompt. Bumps
    /// the epoch so in-flight oracle results against the old tree are
    /// discarded on arrival.
    pub async fn restart(&mut self, design_prompt: impl Into<String>) -> AppResult<()> {
        let design_prompt = design_prompt.into();
        self.epoch += 1;
        self.design_prompt = design_prompt.clone();
        self.tree = QuestionTree::new(&design_prompt);
        self.ctx = build_context(&self.settings);
        self.engine = TraversalEngine::new(Arc::clone(&self.oracle), &design_prompt)
            .with_knowledge(self.knowledge.clone());
        self.requirements = None;
        self.current = self
            .engine
            .advance(&mut self.tree, &mut self.ctx, None)
            .await?;
        self.save().await
    }

    /// Persist the current snapshot.
    pub async fn save(&self) -> AppResult<()> {
        let snapshot = serde_json::to_value(self.snapshot()).map_err(|e| AppError::Internal {
            message: format!("Failed to serialize snapshot: {}", e),
        })?;
        let record = SessionRecord::new(&self.id, &self.design_prompt, snapshot);
        self.storage.save_snapshot(&record).await?;
        Ok(())
    }

    /// Build the current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tree: self.tree.clone(),
            current_node_id: self.current.clone(),
            question_count: self.ctx.question_count,
            design_prompt: self.design_prompt.clone(),
            settings: self.settings.clone(),
            requirements_document: self.requirements.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Build the suggest-answer request for the current question, if any.
    /// `None` once the interview is complete.
    pub fn suggestion_request(&self) -> Option<OracleRequest> {
        let current = self.current.as_deref()?;
        let node = self.tree.find(current)?;
        let depth = self.tree.depth_of(current)?;
        Some(
            OracleRequest::suggest_answer(
                &self.design_prompt,
                self.tree.answered_history(),
                self.settings.mode,
                depth,
                &node.question,
            )
            .with_knowledge(self.knowledge.clone()),
        )
    }

    fn synthesis_request(&self) -> SynthesisRequest {
        SynthesisRequest {
            design_prompt: self.design_prompt.clone(),
            answered_history: self.tree.answered_history(),
            knowledge_base: self.knowledge.clone(),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The design prompt this session interviews about.
    pub fn design_prompt(&self) -> &str {
        &self.design_prompt
    }

    /// The question currently awaiting an answer.
    pub fn current_question(&self) -> Option<&QuestionNode> {
        self.current.as_deref().and_then(|id| self.tree.find(id))
    }

    /// Whether the interview has no question left to surface.
    pub fn is_complete(&self) -> bool {
        self.current.is_none()
    }

    /// The interview tree, read-only.
    pub fn tree(&self) -> &QuestionTree {
        &self.tree
    }

    /// Number of questions issued so far.
    pub fn question_count(&self) -> usize {
        self.ctx.question_count
    }

    /// Whether the configured question budget has been spent.
    pub fn at_question_cap(&self) -> bool {
        self.ctx.at_question_cap()
    }

    /// The compiled requirements document, if one has been produced.
    pub fn requirements_document(&self) -> Option<&str> {
        self.requirements.as_deref()
    }

    /// Session settings.
    pub fn settings(&self) -> &InterviewSettings {
        &self.settings
    }

    /// Current restart epoch.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn oracle(&self) -> &Arc<dyn Oracle> {
        &self.oracle
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub(crate) fn set_in_flight(&mut self, value: bool) {
        self.in_flight = value;
    }
}

fn build_context(settings: &InterviewSettings) -> TraversalContext {
    let mut ctx = TraversalContext::new(settings.mode).with_max_depth(settings.max_depth);
    if let Some(max) = settings.max_questions {
        ctx = ctx.with_max_questions(max);
    }
    ctx
}
