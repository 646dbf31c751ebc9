//! The traversal engine: decides which node to surface after every answer.
//!
//! Each policy is an explicit module — [`dfs`] explores deep with
//! backtracking, [`bfs`] keeps levels covered before descending — sharing the
//! candidate-attachment and fallback machinery here. Between calls the only
//! state is the tree itself plus the [`TraversalContext`] the session
//! controller owns and passes in; the engine holds no node references across
//! calls.

mod bfs;
mod dfs;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::oracle::{KnowledgeDoc, Oracle, OracleReply, OracleRequest, ParentContext};
use crate::topics::{extract_aspects, extract_topics};
use crate::tree::{normalize_question, AnsweredEntry, QuestionNode, QuestionTree};

/// Policy governing whether exploration goes broad or deep first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    /// Breadth-first: cover every level before descending.
    Bfs,
    /// Depth-first: follow one branch down, backtracking at the depth bound.
    Dfs,
}

impl std::fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalMode::Bfs => write!(f, "bfs"),
            TraversalMode::Dfs => write!(f, "dfs"),
        }
    }
}

impl std::str::FromStr for TraversalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bfs" => Ok(TraversalMode::Bfs),
            "dfs" => Ok(TraversalMode::Dfs),
            _ => Err(format!("Unknown traversal mode: {}", s)),
        }
    }
}

/// Per-level sibling cap at the top level (children of the root).
pub const TOP_LEVEL_SIBLING_CAP: usize = 4;
/// Per-level sibling cap below the top level.
pub const INNER_SIBLING_CAP: usize = 3;

/// Ephemeral traversal state, owned by the session controller and passed
/// `&mut` into every engine call. Never persisted: rebuilt from the tree on
/// restore.
#[derive(Debug, Clone)]
pub struct TraversalContext {
    pub mode: TraversalMode,
    /// Maximum depth reachable by child creation.
    pub max_depth: usize,
    /// Optional cap on total questions; reaching it short-circuits every
    /// policy path.
    pub max_questions: Option<usize>,
    /// Normalized question texts already surfaced anywhere in the session.
    pub asked_questions: HashSet<String>,
    /// Topic labels already touched by surfaced questions.
    pub asked_topics: HashSet<String>,
    /// Running count of questions issued.
    pub question_count: usize,
    next_sequence: u64,
}

impl TraversalContext {
    /// Fresh context with the default depth bound.
    pub fn new(mode: TraversalMode) -> Self {
        Self {
            mode,
            max_depth: 5,
            max_questions: None,
            asked_questions: HashSet::new(),
            asked_topics: HashSet::new(),
            question_count: 0,
            next_sequence: 1,
        }
    }

    /// Set the total-question cap (builder style).
    pub fn with_max_questions(mut self, max: usize) -> Self {
        self.max_questions = Some(max);
        self
    }

    /// Override the depth bound (builder style).
    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Recompute asked sets and counters by walking a restored tree.
    pub fn rebuild_from_tree(&mut self, tree: &QuestionTree) {
        self.asked_questions.clear();
        self.asked_topics.clear();
        for node in tree.nodes() {
            self.asked_questions.insert(normalize_question(&node.question));
            self.asked_topics.extend(extract_topics(&node.question));
            if let Some(answer) = &node.answer {
                self.asked_topics.extend(extract_topics(answer));
            }
        }
        self.question_count = tree.question_count();
        self.next_sequence = tree.max_sequence().map(|s| s + 1).unwrap_or(1);
    }

    /// Whether the total-question cap has been reached.
    pub fn at_question_cap(&self) -> bool {
        self.max_questions
            .map(|max| self.question_count >= max)
            .unwrap_or(false)
    }

    /// Whether this question text has already been surfaced.
    pub fn is_asked(&self, question: &str) -> bool {
        self.asked_questions.contains(&normalize_question(question))
    }

    /// Consume the next sequence number. Burned numbers are never reissued,
    /// so assignment order stays strictly increasing.
    fn reserve_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    /// Record a successfully created question.
    fn note_asked(&mut self, question: &str, topics: impl IntoIterator<Item = String>) {
        self.asked_questions.insert(normalize_question(question));
        self.asked_topics.extend(extract_topics(question));
        self.asked_topics.extend(topics);
        self.question_count += 1;
    }
}

/// The core state machine: pure against the tree, context and oracle.
pub struct TraversalEngine {
    oracle: Arc<dyn Oracle>,
    design_prompt: String,
    knowledge: Vec<KnowledgeDoc>,
}

impl TraversalEngine {
    /// Create an engine over the given oracle.
    pub fn new(oracle: Arc<dyn Oracle>, design_prompt: impl Into<String>) -> Self {
        Self {
            oracle,
            design_prompt: design_prompt.into(),
            knowledge: Vec::new(),
        }
    }

    /// Attach knowledge-base excerpts forwarded on every oracle call.
    pub fn with_knowledge(mut self, docs: Vec<KnowledgeDoc>) -> Self {
        self.knowledge = docs;
        self
    }

    /// Decide the next node to surface after `answered` was answered.
    ///
    /// Returns the id of the next question node, or `None` once every policy
    /// path is exhausted ("Q&A complete"). An `answered` id that is not in
    /// the tree is an invariant violation; an unanswered one behaves as "no
    /// current branch" and falls back to a fresh top-level request.
    pub async fn advance(
        &self,
        tree: &mut QuestionTree,
        ctx: &mut TraversalContext,
        answered: Option<&str>,
    ) -> AppResult<Option<String>> {
        if ctx.at_question_cap() {
            info!(count = ctx.question_count, "Question cap reached, stopping traversal");
            return Ok(None);
        }

        let answered_id = match answered {
            None => None,
            Some(id) => {
                let node = tree
                    .find(id)
                    .ok_or_else(|| AppError::invariant(format!("unknown answered node: {}", id)))?;
                node.is_answered().then(|| id.to_string())
            }
        };

        match answered_id {
            None => self.request_top_level(tree, ctx).await,
            Some(id) => match ctx.mode {
                TraversalMode::Dfs => dfs::advance(self, tree, ctx, &id).await,
                TraversalMode::Bfs => bfs::advance(self, tree, ctx, &id).await,
            },
        }
    }

    /// Request fresh top-level questions seeded with the full answered
    /// history, attach them under the root, and return the first new one.
    pub(crate) async fn request_top_level(
        &self,
        tree: &mut QuestionTree,
        ctx: &mut TraversalContext,
    ) -> AppResult<Option<String>> {
        debug!("Requesting fresh top-level questions");
        let request = OracleRequest::next_question(
            &self.design_prompt,
            tree.answered_history(),
            ctx.mode,
            1,
        )
        .with_knowledge(self.knowledge.clone());

        let reply = self.oracle.request_next(request).await;
        let root_id = tree.root_id().to_string();
        self.attach(tree, ctx, &root_id, &reply)
    }

    /// Request children for `parent_id`, seeded with the branch history and
    /// the given uncovered aspects, attach them, and return the first new
    /// child's id.
    pub(crate) async fn request_children(
        &self,
        tree: &mut QuestionTree,
        ctx: &mut TraversalContext,
        parent_id: &str,
        uncovered: Option<Vec<String>>,
    ) -> AppResult<Option<String>> {
        let parent_depth = tree
            .depth_of(parent_id)
            .ok_or_else(|| AppError::invariant(format!("unknown parent node: {}", parent_id)))?;

        let (history, parent_context) = if parent_id == tree.root_id() {
            let context = ParentContext {
                parent_question: tree.root().question.clone(),
                parent_answer: None,
                parent_topics: extract_topics(&tree.root().question).into_iter().collect(),
                sibling_questions: tree
                    .root()
                    .children
                    .iter()
                    .map(|c| c.question.clone())
                    .collect(),
                uncovered_aspects: uncovered,
            };
            (tree.answered_history(), context)
        } else {
            let parent = tree
                .find(parent_id)
                .ok_or_else(|| AppError::invariant(format!("unknown parent node: {}", parent_id)))?;
            let mut topics = extract_topics(&parent.question);
            if let Some(answer) = &parent.answer {
                topics.extend(extract_topics(answer));
            }
            let context = ParentContext {
                parent_question: parent.question.clone(),
                parent_answer: parent.answer.clone(),
                parent_topics: topics.into_iter().collect(),
                sibling_questions: parent.children.iter().map(|c| c.question.clone()).collect(),
                uncovered_aspects: uncovered,
            };
            (level_history(tree, parent_id), context)
        };

        debug!(
            parent = %parent_id,
            depth = parent_depth + 1,
            "Requesting children from oracle"
        );
        let request =
            OracleRequest::next_question(&self.design_prompt, history, ctx.mode, parent_depth + 1)
                .with_parent_context(parent_context)
                .with_knowledge(self.knowledge.clone());

        let reply = self.oracle.request_next(request).await;
        self.attach(tree, ctx, parent_id, &reply)
    }

    /// Attach the reply's candidate questions under `parent_id`, skipping
    /// duplicates and honoring the question cap. Returns the first newly
    /// created node's id.
    pub(crate) fn attach(
        &self,
        tree: &mut QuestionTree,
        ctx: &mut TraversalContext,
        parent_id: &str,
        reply: &OracleReply,
    ) -> AppResult<Option<String>> {
        let mut first_new = None;

        for question in &reply.questions {
            if ctx.at_question_cap() {
                break;
            }
            if ctx.is_asked(question) {
                debug!(question = %question, "Discarding duplicate oracle question");
                continue;
            }

            let node = QuestionNode::new(question.clone()).with_sequence(ctx.reserve_sequence());
            let node_id = node.id.clone();
            let appended = tree.append_children(parent_id, vec![node])?;
            if appended.is_empty() {
                continue;
            }

            let mut topics: Vec<String> = reply.topics_covered.clone();
            if !reply.parent_topic.is_empty() {
                topics.push(reply.parent_topic.clone());
            }
            ctx.note_asked(question, topics);

            if first_new.is_none() {
                first_new = Some(node_id);
            }
        }

        Ok(first_new)
    }

    pub(crate) fn design_prompt(&self) -> &str {
        &self.design_prompt
    }
}

/// The next sibling of `id` (in insertion order) that is still unanswered.
pub(crate) fn next_unanswered_sibling(tree: &QuestionTree, id: &str) -> Option<String> {
    let parent = tree.parent_of(id)?;
    let idx = parent.children.iter().position(|c| c.id == id)?;
    parent.children[idx + 1..]
        .iter()
        .find(|c| !c.is_answered())
        .map(|c| c.id.clone())
}

/// Answered history along the branch from the root down to `node_id`,
/// extended with `node_id`'s answered children (the current level).
pub(crate) fn level_history(tree: &QuestionTree, node_id: &str) -> Vec<AnsweredEntry> {
    let mut history = Vec::new();
    if let Some(path) = tree.path_to(node_id) {
        for node in path.iter().skip(1) {
            if let Some(entry) = entry_for(node) {
                history.push(entry);
            }
        }
        if let Some(node) = path.last() {
            for child in &node.children {
                if let Some(entry) = entry_for(child) {
                    history.push(entry);
                }
            }
        }
    }
    history
}

fn entry_for(node: &QuestionNode) -> Option<AnsweredEntry> {
    let answer = node.answer.as_ref()?;
    let topics = extract_topics(&node.question)
        .union(&extract_topics(answer))
        .cloned()
        .collect();
    Some(AnsweredEntry {
        question: node.question.clone(),
        answer: Some(answer.clone()),
        topics,
    })
}

/// Aspects of `node`'s answer, used to size its child fan-out.
pub(crate) fn answer_aspects(node: &QuestionNode) -> Vec<String> {
    node.answer
        .as_deref()
        .map(extract_aspects)
        .unwrap_or_default()
}
