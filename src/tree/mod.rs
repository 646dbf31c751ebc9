//! The in-memory question/answer tree (node store).
//!
//! Nodes own their children by value; there are no parent back-pointers.
//! Parent and depth are computed views obtained by scanning from the root,
//! which keeps ownership acyclic at the cost of O(n) lookups — trees here
//! are dozens of nodes, not thousands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::topics::extract_topics;

/// One question (and optional answer) in the interview tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionNode {
    /// Unique node identifier, assigned at creation.
    pub id: String,
    /// The question shown to the user. Immutable after creation.
    pub question: String,
    /// The user's (or automation's) answer. Unset until supplied; may be
    /// overwritten by re-answering. Descendants are never pruned on
    /// re-answer.
    pub answer: Option<String>,
    /// Global display ordering, assigned once by the engine.
    pub sequence: Option<u64>,
    /// Owned children, in insertion order (sibling order for BFS scans).
    pub children: Vec<QuestionNode>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
}

impl QuestionNode {
    /// Create an unanswered node for the given question text.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            answer: None,
            sequence: None,
            children: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the sequence number (builder style).
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Whether this node has an answer.
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// One answered question in pre-order history, with its extracted topics.
///
/// Also the wire shape sent to the oracle inside `answeredHistory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredEntry {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub topics: Vec<String>,
}

/// The interview tree. Exactly one root per session; the root's `question`
/// carries the original design prompt and is never answerable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionTree {
    root: QuestionNode,
}

impl QuestionTree {
    /// Create a fresh tree whose root carries the design prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            root: QuestionNode::new(prompt),
        }
    }

    /// Rebuild a tree around a deserialized root (snapshot restore).
    pub fn from_root(root: QuestionNode) -> Self {
        Self { root }
    }

    /// The root node (the design prompt).
    pub fn root(&self) -> &QuestionNode {
        &self.root
    }

    /// Id of the root node.
    pub fn root_id(&self) -> &str {
        &self.root.id
    }

    /// Depth-first lookup by id.
    pub fn find(&self, id: &str) -> Option<&QuestionNode> {
        find_in(&self.root, id)
    }

    /// Mutable depth-first lookup by id.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut QuestionNode> {
        find_in_mut(&mut self.root, id)
    }

    /// The unique parent of `id`, or `None` if `id` is the root or absent.
    pub fn parent_of(&self, id: &str) -> Option<&QuestionNode> {
        parent_in(&self.root, id)
    }

    /// Depth of `id` counted from the root (root = 0, top-level question = 1).
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        depth_in(&self.root, id, 0)
    }

    /// Path of nodes from the root down to `id`, both inclusive.
    pub fn path_to(&self, id: &str) -> Option<Vec<&QuestionNode>> {
        let mut path = Vec::new();
        if path_in(&self.root, id, &mut path) {
            path.reverse();
            Some(path)
        } else {
            None
        }
    }

    /// Append children to `parent_id` in order.
    ///
    /// A node whose question already exists anywhere in the tree is skipped
    /// with a warning rather than inserted; the engine filters against the
    /// asked set first, so hitting this path means an upstream check was
    /// bypassed. Returns the ids of the nodes actually appended.
    pub fn append_children(
        &mut self,
        parent_id: &str,
        nodes: Vec<QuestionNode>,
    ) -> AppResult<Vec<String>> {
        let mut appended = Vec::new();
        let mut accepted = Vec::new();

        for node in nodes {
            if self.contains_question(&node.question) {
                tracing::warn!(
                    question = %node.question,
                    "Rejected duplicate question at node store"
                );
                continue;
            }
            accepted.push(node);
        }

        let parent = self
            .find_mut(parent_id)
            .ok_or_else(|| AppError::invariant(format!("unknown parent node: {}", parent_id)))?;

        for node in accepted {
            appended.push(node.id.clone());
            parent.children.push(node);
        }

        Ok(appended)
    }

    /// Record an answer on `id`. Re-answering overwrites the previous value.
    pub fn answer(&mut self, id: &str, text: impl Into<String>) -> AppResult<()> {
        if id == self.root.id {
            return Err(AppError::invariant("the root node is not answerable"));
        }
        let node = self
            .find_mut(id)
            .ok_or_else(|| AppError::invariant(format!("unknown node: {}", id)))?;
        node.answer = Some(text.into());
        Ok(())
    }

    /// Pre-order collection of all nodes at exactly `depth`.
    pub fn nodes_at_depth(&self, depth: usize) -> Vec<&QuestionNode> {
        let mut out = Vec::new();
        collect_at_depth(&self.root, 0, depth, &mut out);
        out
    }

    /// Pre-order walk of every non-root node.
    pub fn nodes(&self) -> Vec<&QuestionNode> {
        let mut out = Vec::new();
        for child in &self.root.children {
            collect_preorder(child, &mut out);
        }
        out
    }

    /// Pre-order answered history, skipping the root and unanswered nodes.
    pub fn answered_history(&self) -> Vec<AnsweredEntry> {
        self.nodes()
            .into_iter()
            .filter(|n| n.is_answered())
            .map(|n| AnsweredEntry {
                question: n.question.clone(),
                answer: n.answer.clone(),
                topics: extract_topics(&n.question)
                    .union(&extract_topics(n.answer.as_deref().unwrap_or("")))
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Whether any node (root included) carries this question text, compared
    /// after normalization.
    pub fn contains_question(&self, text: &str) -> bool {
        let needle = normalize_question(text);
        normalize_question(&self.root.question) == needle
            || self
                .nodes()
                .iter()
                .any(|n| normalize_question(&n.question) == needle)
    }

    /// Number of non-root nodes.
    pub fn question_count(&self) -> usize {
        self.nodes().len()
    }

    /// Highest sequence number assigned so far, if any.
    pub fn max_sequence(&self) -> Option<u64> {
        self.nodes().iter().filter_map(|n| n.sequence).max()
    }
}

/// Normalization applied before asked-set membership and duplicate checks:
/// trim plus Unicode lowercase. Exact-byte comparison is too brittle against
/// an oracle that re-words whitespace and casing.
pub fn normalize_question(text: &str) -> String {
    text.trim().to_lowercase()
}

fn find_in<'a>(node: &'a QuestionNode, id: &str) -> Option<&'a QuestionNode> {
    if node.id == id {
        return Some(node);
    }
    node.children.iter().find_map(|c| find_in(c, id))
}

fn find_in_mut<'a>(node: &'a mut QuestionNode, id: &str) -> Option<&'a mut QuestionNode> {
    if node.id == id {
        return Some(node);
    }
    node.children.iter_mut().find_map(|c| find_in_mut(c, id))
}

fn parent_in<'a>(node: &'a QuestionNode, id: &str) -> Option<&'a QuestionNode> {
    if node.children.iter().any(|c| c.id == id) {
        return Some(node);
    }
    node.children.iter().find_map(|c| parent_in(c, id))
}

fn depth_in(node: &QuestionNode, id: &str, depth: usize) -> Option<usize> {
    if node.id == id {
        return Some(depth);
    }
    node.children
        .iter()
        .find_map(|c| depth_in(c, id, depth + 1))
}

fn path_in<'a>(node: &'a QuestionNode, id: &str, path: &mut Vec<&'a QuestionNode>) -> bool {
    if node.id == id {
        path.push(node);
        return true;
    }
    for child in &node.children {
        if path_in(child, id, path) {
            path.push(node);
            return true;
        }
    }
    false
}

fn collect_at_depth<'a>(
    node: &'a QuestionNode,
    depth: usize,
    target: usize,
    out: &mut Vec<&'a QuestionNode>,
) {
    if depth == target {
        out.push(node);
        return;
    }
    for child in &node.children {
        collect_at_depth(child, depth + 1, target, out);
    }
}

fn collect_preorder<'a>(node: &'a QuestionNode, out: &mut Vec<&'a QuestionNode>) {
    out.push(node);
    for child in &node.children {
        collect_preorder(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (QuestionTree, String, String, String) {
        let mut tree = QuestionTree::new("Design a parking app");
        let root_id = tree.root_id().to_string();

        let a = QuestionNode::new("Who is the primary user?").with_sequence(1);
        let b = QuestionNode::new("What payment methods are required?").with_sequence(2);
        let a_id = a.id.clone();
        let b_id = b.id.clone();
        tree.append_children(&root_id, vec![a, b]).unwrap();

        let c = QuestionNode::new("Do commuters book in advance?").with_sequence(3);
        let c_id = c.id.clone();
        tree.append_children(&a_id, vec![c]).unwrap();

        (tree, a_id, b_id, c_id)
    }

    #[test]
    fn test_root_carries_prompt() {
        let tree = QuestionTree::new("Design a parking app");
        assert_eq!(tree.root().question, "Design a parking app");
        assert!(tree.root().children.is_empty());
    }

    #[test]
    fn test_find_and_parent() {
        let (tree, a_id, _b_id, c_id) = sample_tree();
        assert_eq!(tree.find(&c_id).unwrap().question, "Do commuters book in advance?");
        assert_eq!(tree.parent_of(&c_id).unwrap().id, a_id);
        assert_eq!(tree.parent_of(&a_id).unwrap().id, tree.root_id());
        assert!(tree.parent_of(tree.root_id()).is_none());
        assert!(tree.find("missing").is_none());
    }

    #[test]
    fn test_depth_is_computed_not_stored() {
        let (tree, a_id, _b_id, c_id) = sample_tree();
        assert_eq!(tree.depth_of(tree.root_id()), Some(0));
        assert_eq!(tree.depth_of(&a_id), Some(1));
        assert_eq!(tree.depth_of(&c_id), Some(2));
        assert_eq!(tree.depth_of("missing"), None);
    }

    #[test]
    fn test_nodes_at_depth_preorder() {
        let (tree, a_id, b_id, _c_id) = sample_tree();
        let level1: Vec<&str> = tree.nodes_at_depth(1).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(level1, vec![a_id.as_str(), b_id.as_str()]);
        assert_eq!(tree.nodes_at_depth(2).len(), 1);
        assert!(tree.nodes_at_depth(3).is_empty());
    }

    #[test]
    fn test_append_rejects_duplicate_question() {
        let (mut tree, _a_id, _b_id, _c_id) = sample_tree();
        let before = tree.question_count();
        let dup = QuestionNode::new("  who IS the primary user?  ");
        let appended = tree
            .append_children(&tree.root_id().to_string(), vec![dup])
            .unwrap();
        assert!(appended.is_empty());
        assert_eq!(tree.question_count(), before);
    }

    #[test]
    fn test_append_unknown_parent_is_invariant_error() {
        let mut tree = QuestionTree::new("prompt");
        let result = tree.append_children("missing", vec![QuestionNode::new("q")]);
        assert!(matches!(result, Err(AppError::Invariant { .. })));
    }

    #[test]
    fn test_answer_and_reanswer_keeps_children() {
        let (mut tree, a_id, _b_id, c_id) = sample_tree();
        tree.answer(&a_id, "Commuters").unwrap();
        tree.answer(&a_id, "Commuters and tourists").unwrap();
        let a = tree.find(&a_id).unwrap();
        assert_eq!(a.answer.as_deref(), Some("Commuters and tourists"));
        assert!(tree.find(&c_id).is_some());
    }

    #[test]
    fn test_root_is_not_answerable() {
        let mut tree = QuestionTree::new("prompt");
        let root_id = tree.root_id().to_string();
        assert!(matches!(
            tree.answer(&root_id, "answer"),
            Err(AppError::Invariant { .. })
        ));
    }

    #[test]
    fn test_answered_history_skips_root_and_unanswered() {
        let (mut tree, a_id, _b_id, c_id) = sample_tree();
        tree.answer(&c_id, "Yes, commuters prebook daily").unwrap();
        tree.answer(&a_id, "Mostly commuters").unwrap();

        let history = tree.answered_history();
        // Pre-order: a before c, b skipped (unanswered).
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "Who is the primary user?");
        assert_eq!(history[1].question, "Do commuters book in advance?");
        assert!(history[0].topics.contains(&"audience".to_string()));
    }

    #[test]
    fn test_max_sequence() {
        let (tree, _a, _b, _c) = sample_tree();
        assert_eq!(tree.max_sequence(), Some(3));
        assert_eq!(QuestionTree::new("p").max_sequence(), None);
    }

    #[test]
    fn test_path_to_runs_root_to_node() {
        let (tree, a_id, _b_id, c_id) = sample_tree();
        let path = tree.path_to(&c_id).unwrap();
        let ids: Vec<&str> = path.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec![tree.root_id(), a_id.as_str(), c_id.as_str()]);
    }

    #[test]
    fn test_snapshot_round_trip_preserves_shape() {
        let (mut tree, a_id, _b_id, _c_id) = sample_tree();
        tree.answer(&a_id, "Commuters").unwrap();

        let json = serde_json::to_string(&tree).unwrap();
        let restored: QuestionTree = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.question_count(), tree.question_count());
        assert_eq!(restored.find(&a_id).unwrap().answer.as_deref(), Some("Commuters"));
        assert_eq!(restored.max_sequence(), tree.max_sequence());
    }
}
